// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger integration: user registration and per-file ownership/access grants
//! held by the `FileManager` and `UserManager` contracts.
//!
//! This module provides:
//! - The [`Ledger`] trait the orchestrators depend on
//! - [`EvmLedger`], an alloy-backed client for a live EVM chain
//! - [`InMemoryLedger`], which mirrors the contract rules in process
//!
//! All mutating calls follow submit-then-wait: they return only after the
//! transaction is confirmed, and a confirmed-but-reverted transaction is an
//! error.

pub mod client;
pub mod contracts;
pub mod memory;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Serialize;

pub use client::{EvmLedger, EvmLedgerConfig};
pub use memory::InMemoryLedger;

/// Sequential per-contract file identifier.
pub type FileId = u64;

/// A file entry as recorded on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerFileEntry {
    pub file_id: FileId,
    pub cid: String,
    pub owner: Address,
    pub granted: Vec<Address>,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Address {0} is already registered")]
    AlreadyRegistered(Address),

    #[error("Caller is not the owner of file {0}")]
    NotFileOwner(FileId),

    #[error("Access denied to file {0}")]
    AccessDenied(FileId),

    #[error("File {0} does not exist")]
    FileNotFound(FileId),

    #[error("No relay signer registered for {0}")]
    NoSigner(Address),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Transaction {tx_hash} not confirmed within {waited_secs}s")]
    TransactionTimeout { tx_hash: String, waited_secs: u64 },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger operations used by the orchestrators.
///
/// `caller` is the account on whose behalf a transaction is submitted; the
/// contracts derive ownership from it.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Short backend description for health output.
    fn mode(&self) -> &str;

    /// Latest block height (or a write counter for in-process ledgers).
    async fn head(&self) -> LedgerResult<u64>;

    async fn register_user(&self, caller: Address) -> LedgerResult<()>;

    async fn is_registered(&self, address: Address) -> LedgerResult<bool>;

    /// Anchor a new file entry owned by `owner` and return its id.
    async fn record_file(&self, owner: Address, cid: &str) -> LedgerResult<FileId>;

    async fn grant_access(&self, caller: Address, file_id: FileId, grantee: Address)
        -> LedgerResult<()>;

    async fn revoke_access(
        &self,
        caller: Address,
        file_id: FileId,
        grantee: Address,
    ) -> LedgerResult<()>;

    /// True for the owner and any granted address.
    async fn can_access(&self, file_id: FileId, address: Address) -> LedgerResult<bool>;

    async fn access_list(&self, file_id: FileId) -> LedgerResult<Vec<Address>>;

    /// Resolve a file's CID; fails with `AccessDenied` for unauthorized requesters.
    async fn file_cid(&self, file_id: FileId, requester: Address) -> LedgerResult<String>;

    async fn file(&self, file_id: FileId) -> LedgerResult<LedgerFileEntry>;

    async fn files_owned_by(&self, owner: Address) -> LedgerResult<Vec<FileId>>;
}
