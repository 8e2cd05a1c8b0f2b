// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local metadata index.
//!
//! Maps content identifiers to the file details the ledger does not hold:
//! display name, declared size and type, and the sealed key material. Also
//! persists upload intents and pending authentication nonces.
//!
//! This store performs no authorization. Key material leaves it only through
//! the access orchestrator.

pub mod records;
pub mod store;

pub use records::{AuthNonce, FileRecord, NewFileRecord, UploadIntent, UploadStage};
pub use store::MetadataStore;

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type MetadataResult<T> = Result<T, MetadataError>;
