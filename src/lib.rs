// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EtherStore - Encrypted File Relay
//!
//! Wallet-authenticated relay that pins client-encrypted files to IPFS,
//! anchors their CIDs and access grants on an EVM ledger, and keeps a local
//! metadata index for listing and shared links.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Wallet sign-in and session tokens
//! - `content` - Content-addressed storage (Pinata / in-memory)
//! - `crypto` - AES-256-CBC payload cipher and sealed key material
//! - `ledger` - FileManager / UserManager contracts (EVM / in-memory)
//! - `metadata` - File records, upload intents and nonces (redb)
//! - `service` - Upload and access orchestration

pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod metadata;
pub mod models;
pub mod service;
pub mod state;
