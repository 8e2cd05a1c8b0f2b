// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-in and session errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingAuthHeader,

    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,

    #[error("Session token is malformed")]
    MalformedToken,

    #[error("Session token signature is invalid")]
    InvalidSignature,

    #[error("Session token has expired")]
    TokenExpired,

    /// No sign-in challenge outstanding for the wallet.
    #[error("No sign-in nonce issued for this wallet; request one first")]
    NonceNotFound,

    #[error("Sign-in nonce has expired")]
    NonceExpired,

    /// Wallet signature is malformed or recovers to another address.
    #[error("Signature verification failed")]
    SignatureMismatch,

    /// Payload names a wallet other than the session wallet.
    #[error("Request names a wallet other than the authenticated one")]
    WalletMismatch,

    #[error("Internal authentication error: {0}")]
    InternalError(String),
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::NonceNotFound => "nonce_not_found",
            AuthError::NonceExpired => "nonce_expired",
            AuthError::SignatureMismatch => "signature_mismatch",
            AuthError::WalletMismatch => "wallet_mismatch",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NonceNotFound => StatusCode::BAD_REQUEST,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Rendered through [`ApiError`] so every endpoint shares one error body.
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
