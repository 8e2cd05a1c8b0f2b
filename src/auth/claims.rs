// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims and the authenticated wallet.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use super::AuthError;
use crate::models::format_address;

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Lowercase `0x` wallet address
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Wallet proven by a valid session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedWallet {
    pub address: Address,
    /// Token expiration (Unix timestamp)
    pub expires_at: i64,
}

impl AuthenticatedWallet {
    /// Require that a wallet named in a request payload is this one.
    pub fn ensure_is(&self, claimed: Address) -> Result<(), AuthError> {
        if claimed == self.address {
            Ok(())
        } else {
            tracing::warn!(
                authenticated = %format_address(self.address),
                claimed = %format_address(claimed),
                "Payload wallet does not match session"
            );
            Err(AuthError::WalletMismatch)
        }
    }
}
