// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 session tokens issued after a successful wallet sign-in.

use alloy::primitives::Address;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{AuthError, AuthenticatedWallet, SessionClaims};
use crate::models::format_address;

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// `iss` claim of every token this server issues.
pub const SESSION_ISSUER: &str = "etherstore";

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Issue a token whose subject is `wallet`.
    pub fn issue(&self, wallet: Address) -> Result<String, AuthError> {
        self.issue_at(wallet, chrono::Utc::now().timestamp())
    }

    fn issue_at(&self, wallet: Address, now: i64) -> Result<String, AuthError> {
        let claims = SessionClaims {
            sub: format_address(wallet),
            iat: now,
            exp: now + self.ttl_secs as i64,
            iss: SESSION_ISSUER.to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::InternalError(e.to_string()))
    }

    /// Verify a token and return the wallet it was issued to.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedWallet, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.set_issuer(&[SESSION_ISSUER]);
        validation.validate_aud = false;

        let token_data = decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            })?;

        let address = token_data
            .claims
            .sub
            .parse::<Address>()
            .map_err(|_| AuthError::MalformedToken)?;

        Ok(AuthenticatedWallet {
            address,
            expires_at: token_data.claims.exp,
        })
    }
}
