// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded metadata database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `files`: record id → serialized FileRecord
//! - `cid_index`: CID → record id (latest record for that CID)
//! - `upload_intents`: intent id → serialized UploadIntent
//! - `auth_nonces`: lowercase wallet address → serialized AuthNonce
//! - `counters`: name → last assigned value

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use uuid::Uuid;

use super::records::{AuthNonce, FileRecord, NewFileRecord, UploadIntent, UploadStage};
use super::{MetadataError, MetadataResult};

// =============================================================================
// Table Definitions
// =============================================================================

const FILES: TableDefinition<u64, &[u8]> = TableDefinition::new("files");

const CID_INDEX: TableDefinition<&str, u64> = TableDefinition::new("cid_index");

const UPLOAD_INTENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("upload_intents");

const AUTH_NONCES: TableDefinition<&str, &[u8]> = TableDefinition::new("auth_nonces");

const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

const FILE_RECORD_COUNTER: &str = "file_record";

/// File name of the database inside the data directory.
pub const DB_FILE_NAME: &str = "metadata.redb";

// =============================================================================
// MetadataStore
// =============================================================================

pub struct MetadataStore {
    db: Database,
}

impl MetadataStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> MetadataResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(FILES)?;
            let _ = write_txn.open_table(CID_INDEX)?;
            let _ = write_txn.open_table(UPLOAD_INTENTS)?;
            let _ = write_txn.open_table(AUTH_NONCES)?;
            let _ = write_txn.open_table(COUNTERS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Open `metadata.redb` inside `data_dir`.
    pub fn open_in_dir(data_dir: &Path) -> MetadataResult<Self> {
        Self::open(&data_dir.join(DB_FILE_NAME))
    }

    /// Cheap read used by readiness probes.
    pub fn ping(&self) -> MetadataResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COUNTERS)?;
        Ok(table.get(FILE_RECORD_COUNTER)?.map(|v| v.value()).unwrap_or(0))
    }

    // =========================================================================
    // File records
    // =========================================================================

    /// Persist a new record, assigning its id and creation time.
    pub fn save(&self, new: NewFileRecord) -> MetadataResult<FileRecord> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut counters = write_txn.open_table(COUNTERS)?;
            let id = counters
                .get(FILE_RECORD_COUNTER)?
                .map(|v| v.value())
                .unwrap_or(0)
                + 1;
            counters.insert(FILE_RECORD_COUNTER, id)?;

            let record = FileRecord {
                id,
                filename: new.filename,
                cid: new.cid,
                material: new.material,
                size: new.size,
                content_type: new.content_type,
                created_at: Utc::now(),
            };
            let json = serde_json::to_vec(&record)?;

            let mut files = write_txn.open_table(FILES)?;
            files.insert(id, json.as_slice())?;

            let mut cid_index = write_txn.open_table(CID_INDEX)?;
            cid_index.insert(record.cid.as_str(), id)?;

            record
        };
        write_txn.commit()?;

        tracing::debug!(record_id = record.id, cid = %record.cid, "File record saved");
        Ok(record)
    }

    pub fn find_by_id(&self, id: u64) -> MetadataResult<Option<FileRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FILES)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn find_by_cid(&self, cid: &str) -> MetadataResult<Option<FileRecord>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(CID_INDEX)?;
        let Some(id) = index.get(cid)?.map(|v| v.value()) else {
            return Ok(None);
        };

        let files = read_txn.open_table(FILES)?;
        match files.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Upload intents
    // =========================================================================

    /// Insert or replace an intent.
    pub fn put_intent(&self, intent: &UploadIntent) -> MetadataResult<()> {
        let key = intent.id.to_string();
        let json = serde_json::to_vec(intent)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(UPLOAD_INTENTS)?;
            table.insert(key.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_intent(&self, id: Uuid) -> MetadataResult<Option<UploadIntent>> {
        let key = id.to_string();
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(UPLOAD_INTENTS)?;
        match table.get(key.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Move an intent to `stage`, recording `error` (or clearing it on `None`).
    /// Terminal stages drop the intent's key material; the file record keeps
    /// the only copy.
    pub fn advance_intent(
        &self,
        id: Uuid,
        stage: UploadStage,
        error: Option<String>,
    ) -> MetadataResult<UploadIntent> {
        let key = id.to_string();
        let write_txn = self.db.begin_write()?;
        let intent = {
            let mut table = write_txn.open_table(UPLOAD_INTENTS)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = table
                    .get(key.as_str())?
                    .ok_or_else(|| MetadataError::NotFound(format!("Upload intent {id}")))?;
                existing.value().to_vec()
            };

            let mut intent: UploadIntent = serde_json::from_slice(&existing_bytes)?;
            if stage.is_terminal() {
                intent.material = None;
            }
            intent.stage = stage;
            intent.last_error = error;
            intent.updated_at = Utc::now();

            let json = serde_json::to_vec(&intent)?;
            table.insert(key.as_str(), json.as_slice())?;
            intent
        };
        write_txn.commit()?;
        Ok(intent)
    }

    /// Record a failure without changing the stage.
    pub fn fail_intent(&self, id: Uuid, error: &str) -> MetadataResult<UploadIntent> {
        let current = self
            .get_intent(id)?
            .ok_or_else(|| MetadataError::NotFound(format!("Upload intent {id}")))?;
        self.advance_intent(id, current.stage, Some(error.to_string()))
    }

    /// All non-terminal intents, oldest first.
    pub fn incomplete_intents(&self) -> MetadataResult<Vec<UploadIntent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(UPLOAD_INTENTS)?;

        let mut intents = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let intent: UploadIntent = serde_json::from_slice(value.value())?;
            if !intent.stage.is_terminal() {
                intents.push(intent);
            }
        }
        intents.sort_by_key(|i| i.created_at);
        Ok(intents)
    }

    /// Non-terminal intents belonging to `owner`.
    pub fn incomplete_intents_for(&self, owner: &str) -> MetadataResult<Vec<UploadIntent>> {
        let owner = owner.to_lowercase();
        Ok(self
            .incomplete_intents()?
            .into_iter()
            .filter(|i| i.owner == owner)
            .collect())
    }

    // =========================================================================
    // Auth nonces
    // =========================================================================

    /// Store the current sign-in nonce for a wallet, replacing any previous one.
    pub fn put_nonce(&self, wallet: &str, nonce: &AuthNonce) -> MetadataResult<()> {
        let key = wallet.to_lowercase();
        let json = serde_json::to_vec(nonce)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AUTH_NONCES)?;
            table.insert(key.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_nonce(&self, wallet: &str) -> MetadataResult<Option<AuthNonce>> {
        let key = wallet.to_lowercase();
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUTH_NONCES)?;
        match table.get(key.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Remove a wallet's nonce only if it still equals `expected`.
    ///
    /// Check and removal share one write transaction, so of several
    /// concurrent callers holding the same nonce exactly one gets `true`.
    pub fn consume_nonce(&self, wallet: &str, expected: &str) -> MetadataResult<bool> {
        let key = wallet.to_lowercase();
        let write_txn = self.db.begin_write()?;
        let consumed = {
            let mut table = write_txn.open_table(AUTH_NONCES)?;
            let current = table
                .get(key.as_str())?
                .map(|v| serde_json::from_slice::<AuthNonce>(v.value()))
                .transpose()?;
            match current {
                Some(nonce) if nonce.nonce == expected => {
                    table.remove(key.as_str())?;
                    true
                }
                _ => false,
            }
        };
        write_txn.commit()?;
        Ok(consumed)
    }
}
