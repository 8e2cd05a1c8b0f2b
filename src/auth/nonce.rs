// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet sign-in challenge.
//!
//! The wallet signs the issued nonce verbatim with `personal_sign` (EIP-191).
//! A nonce is replaced on every request and consumed by a successful
//! verification, so a signature cannot be replayed.

use alloy::primitives::{Address, Signature};
use chrono::Utc;
use ring::rand::{SecureRandom, SystemRandom};

use super::AuthError;
use crate::metadata::{AuthNonce, MetadataStore};
use crate::models::format_address;

/// How long an issued nonce stays valid.
pub const NONCE_TTL_SECS: i64 = 600;

const NONCE_BYTES: usize = 16;

/// Issue (or replace) the sign-in nonce for `wallet`.
pub fn issue_nonce(store: &MetadataStore, wallet: Address) -> Result<String, AuthError> {
    let mut bytes = [0u8; NONCE_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AuthError::InternalError("random source unavailable".to_string()))?;
    let nonce = alloy::hex::encode(bytes);

    store
        .put_nonce(
            &format_address(wallet),
            &AuthNonce {
                nonce: nonce.clone(),
                issued_at: Utc::now(),
            },
        )
        .map_err(|e| AuthError::InternalError(e.to_string()))?;

    Ok(nonce)
}

/// Recover the address that produced an EIP-191 signature over `message`.
pub fn recover_signer(message: &str, signature_hex: &str) -> Result<Address, AuthError> {
    let bytes = alloy::hex::decode(signature_hex.trim()).map_err(|_| AuthError::SignatureMismatch)?;
    let signature =
        Signature::try_from(bytes.as_slice()).map_err(|_| AuthError::SignatureMismatch)?;
    signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|_| AuthError::SignatureMismatch)
}

/// Check `signature_hex` against the outstanding nonce and consume it.
pub fn verify_signature(
    store: &MetadataStore,
    wallet: Address,
    signature_hex: &str,
) -> Result<(), AuthError> {
    let key = format_address(wallet);
    let issued = store
        .get_nonce(&key)
        .map_err(|e| AuthError::InternalError(e.to_string()))?
        .ok_or(AuthError::NonceNotFound)?;

    if (Utc::now() - issued.issued_at).num_seconds() > NONCE_TTL_SECS {
        return Err(AuthError::NonceExpired);
    }

    let recovered = recover_signer(&issued.nonce, signature_hex)?;
    if recovered != wallet {
        tracing::warn!(
            wallet = %key,
            recovered = %format_address(recovered),
            "Sign-in signature recovered to another address"
        );
        return Err(AuthError::SignatureMismatch);
    }

    // Another request may have spent this nonce since it was read.
    let consumed = store
        .consume_nonce(&key, &issued.nonce)
        .map_err(|e| AuthError::InternalError(e.to_string()))?;
    if !consumed {
        return Err(AuthError::NonceNotFound);
    }
    Ok(())
}
