// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Orchestrator error taxonomy.

use crate::content::ContentError;
use crate::crypto::CipherError;
use crate::ledger::LedgerError;
use crate::metadata::MetadataError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("Access denied to file {0}")]
    AccessDenied(u64),

    #[error("Caller is not the owner of file {0}")]
    NotFileOwner(u64),

    #[error("Address {0} is already registered")]
    AlreadyRegistered(String),

    #[error("Content store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Failed to fetch content: {0}")]
    StorageFetchFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("{0}")]
    TransactionTimeout(String),

    #[error("Claimed CID {claimed} does not match the CID recorded for file {file_id}")]
    IntegrityMismatch { file_id: u64, claimed: String },

    #[error("{0}")]
    NotFound(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation_error",
            ServiceError::Authentication(_) => "authentication_error",
            ServiceError::AccessDenied(_) => "access_denied",
            ServiceError::NotFileOwner(_) => "not_file_owner",
            ServiceError::AlreadyRegistered(_) => "already_registered",
            ServiceError::StorageUnavailable(_) => "storage_unavailable",
            ServiceError::StorageFetchFailed(_) => "storage_fetch_failed",
            ServiceError::TransactionFailed(_) => "transaction_failed",
            ServiceError::TransactionTimeout(_) => "transaction_timeout",
            ServiceError::IntegrityMismatch { .. } => "integrity_mismatch",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Decryption(_) => "decryption_error",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}

impl From<LedgerError> for ServiceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AlreadyRegistered(addr) => {
                ServiceError::AlreadyRegistered(format!("{addr:#x}"))
            }
            LedgerError::NotFileOwner(id) => ServiceError::NotFileOwner(id),
            LedgerError::AccessDenied(id) => ServiceError::AccessDenied(id),
            LedgerError::FileNotFound(id) => ServiceError::NotFound(format!("File {id} not found")),
            LedgerError::InvalidAddress(msg) => ServiceError::Validation(msg),
            LedgerError::NoSigner(addr) => {
                ServiceError::TransactionFailed(format!("no signer registered for {addr:#x}"))
            }
            LedgerError::TransactionFailed(msg) => ServiceError::TransactionFailed(msg),
            err @ LedgerError::TransactionTimeout { .. } => {
                ServiceError::TransactionTimeout(err.to_string())
            }
            err @ (LedgerError::InvalidRpcUrl(_)
            | LedgerError::InvalidPrivateKey(_)
            | LedgerError::RpcError(_)) => ServiceError::Internal(err.to_string()),
        }
    }
}

impl From<ContentError> for ServiceError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Unavailable(msg) => ServiceError::StorageUnavailable(msg),
            ContentError::InvalidCid(msg) => ServiceError::Validation(format!("Invalid CID: {msg}")),
            err @ (ContentError::FetchFailed { .. } | ContentError::NotFound(_)) => {
                ServiceError::StorageFetchFailed(err.to_string())
            }
        }
    }
}

impl From<MetadataError> for ServiceError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::NotFound(msg) => ServiceError::NotFound(msg),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<CipherError> for ServiceError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::InvalidKey(_) | CipherError::InvalidIv(_) => {
                ServiceError::Validation(err.to_string())
            }
            CipherError::Decryption(msg) => ServiceError::Decryption(msg),
            CipherError::Random => ServiceError::Internal(err.to_string()),
        }
    }
}
