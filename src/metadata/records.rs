// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::crypto::SealedMaterial;
use crate::ledger::FileId;

/// A file's local metadata, keyed by CID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: u64,
    pub filename: String,
    pub cid: String,
    pub material: SealedMaterial,
    /// Size declared by the uploader (plaintext bytes)
    pub size: u64,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when saving a record; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub filename: String,
    pub cid: String,
    pub material: SealedMaterial,
    pub size: u64,
    pub content_type: String,
}

/// Progress of an upload across the content store, ledger and metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum UploadStage {
    /// Intent recorded, nothing published yet
    Pending,
    /// Ciphertext pinned
    ContentStored { cid: String },
    /// CID anchored on the ledger
    LedgerAnchored { cid: String, file_id: FileId },
    /// Metadata record written; upload complete
    MetadataCommitted {
        cid: String,
        file_id: FileId,
        record_id: u64,
    },
    /// Given up; nothing further will happen
    Abandoned,
}

impl UploadStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::MetadataCommitted { .. } | Self::Abandoned)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ContentStored { .. } => "content_stored",
            Self::LedgerAnchored { .. } => "ledger_anchored",
            Self::MetadataCommitted { .. } => "metadata_committed",
            Self::Abandoned => "abandoned",
        }
    }
}

/// A persisted upload, written before the first external call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadIntent {
    pub id: Uuid,
    /// Lowercase `0x` owner address
    pub owner: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    /// Key material, held until the intent reaches a terminal stage
    pub material: Option<SealedMaterial>,
    pub stage: UploadStage,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadIntent {
    pub fn new(
        owner: &str,
        filename: &str,
        content_type: &str,
        size: u64,
        material: SealedMaterial,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner: owner.to_lowercase(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size,
            material: Some(material),
            stage: UploadStage::Pending,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Sign-in challenge issued to a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthNonce {
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
}
