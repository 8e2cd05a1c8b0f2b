// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated wallets.
//!
//! Use the `Auth` extractor in handlers to require a session:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(wallet): Auth) -> impl IntoResponse {
//!     // wallet is AuthenticatedWallet
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthError, AuthenticatedWallet};
use crate::state::AppState;

/// Extractor for authenticated wallets.
///
/// Validates the `Authorization: Bearer <jwt>` header against the server's
/// session keys.
pub struct Auth(pub AuthenticatedWallet);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if an earlier layer already set the wallet
        if let Some(wallet) = parts.extensions.get::<AuthenticatedWallet>().copied() {
            return Ok(Auth(wallet));
        }

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let wallet = state.sessions.verify(token)?;
        parts.extensions.insert(wallet);

        Ok(Auth(wallet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use alloy::primitives::Address;
    use axum::http::Request;

    fn parts_with(header: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = header {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let (state, _dir) = test_state();
        let mut parts = parts_with(None);
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_requires_bearer_scheme() {
        let (state, _dir) = test_state();
        let mut parts = parts_with(Some("Basic abc".to_string()));
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_succeeds_with_session_token() {
        let (state, _dir) = test_state();
        let wallet = Address::repeat_byte(0x42);
        let token = state.sessions.issue(wallet).unwrap();
        let mut parts = parts_with(Some(format!("Bearer {token}")));

        let Auth(authenticated) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(authenticated.address, wallet);
        assert!(parts.extensions.get::<AuthenticatedWallet>().is_some());
    }

    #[tokio::test]
    async fn auth_extractor_prefers_extensions() {
        let (state, _dir) = test_state();
        let mut parts = parts_with(None);
        let wallet = AuthenticatedWallet {
            address: Address::repeat_byte(0x07),
            expires_at: 0,
        };
        parts.extensions.insert(wallet);

        let Auth(found) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(found, wallet);
    }
}
