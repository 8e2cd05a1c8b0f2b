// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Symmetric cipher for file payloads.
//!
//! Browsers encrypt files before they ever reach the relay; this module is the
//! server-side counterpart used to validate submitted key material and to
//! encrypt/decrypt in tooling and tests. It is pure and performs no I/O.

pub mod cipher;
pub mod sealed;

pub use cipher::{decrypt, encrypt, CipherError, Encrypted, EncryptionMaterial, IV_LEN, KEY_LEN};
pub use sealed::SealedMaterial;
