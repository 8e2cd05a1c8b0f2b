// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Wallet sign-in for the EtherStore API.
//!
//! ## Auth Flow
//!
//! 1. Client requests a nonce: `GET /auth/nonce/{wallet}`
//! 2. Wallet signs the nonce with `personal_sign` (EIP-191)
//! 3. Client posts `{wallet, signature}` to `/auth/verify`
//! 4. Server recovers the signer, consumes the nonce and returns an HS256 JWT
//!    whose `sub` is the lowercase wallet address
//! 5. Client sends `Authorization: Bearer <jwt>` on every `/files`,
//!    `/users` and `/uploads` request
//!
//! ## Security
//!
//! - Nonces are single-use and expire after ten minutes
//! - Handlers compare any wallet named in a payload against the session
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod nonce;
pub mod session;

pub use claims::{AuthenticatedWallet, SessionClaims};
pub use error::AuthError;
pub use extractor::Auth;
pub use session::SessionKeys;
