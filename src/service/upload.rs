// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Upload orchestrator.
//!
//! An upload touches three systems that share no transaction. Each upload is
//! tracked by an [`UploadIntent`] persisted before the first external call
//! and advanced after each step:
//!
//! ```text
//! Pending -> ContentStored{cid} -> LedgerAnchored{cid, file_id} -> MetadataCommitted{..}
//!    \
//!     `-> Abandoned   (resume without ciphertext)
//! ```
//!
//! A failed step leaves the intent at its last reached stage with the error
//! recorded, so the upload can be resumed without losing key material.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use alloy::primitives::Address;
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use crate::content::ContentStore;
use crate::crypto::{EncryptionMaterial, SealedMaterial};
use crate::ledger::{FileId, Ledger};
use crate::metadata::{MetadataStore, NewFileRecord, UploadIntent, UploadStage};
use crate::models::{format_address, parse_wallet_address};

/// A validated-on-entry upload request. The payload is already encrypted.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub owner: Address,
    pub ciphertext: Vec<u8>,
    pub filename: String,
    pub content_type: String,
    pub declared_size: u64,
    pub key_hex: String,
    pub iv_hex: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub intent_id: Uuid,
    pub cid: String,
    pub file_id: FileId,
    pub record_id: u64,
}

pub struct UploadOrchestrator {
    ledger: Arc<dyn Ledger>,
    content: Arc<dyn ContentStore>,
    metadata: Arc<MetadataStore>,
    /// Intents currently being resumed.
    in_flight: Mutex<HashSet<Uuid>>,
}

/// Exclusive hold on an intent while it is driven; released on drop.
struct IntentClaim<'a> {
    in_flight: &'a Mutex<HashSet<Uuid>>,
    id: Uuid,
}

impl Drop for IntentClaim<'_> {
    fn drop(&mut self) {
        let mut in_flight = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        in_flight.remove(&self.id);
    }
}

impl UploadOrchestrator {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        content: Arc<dyn ContentStore>,
        metadata: Arc<MetadataStore>,
    ) -> Self {
        Self {
            ledger,
            content,
            metadata,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn claim(&self, id: Uuid) -> ServiceResult<IntentClaim<'_>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| ServiceError::Internal("upload claim lock poisoned".to_string()))?;
        if !in_flight.insert(id) {
            return Err(ServiceError::validation(format!(
                "Upload {id} is already being resumed"
            )));
        }
        Ok(IntentClaim {
            in_flight: &self.in_flight,
            id,
        })
    }

    /// Store ciphertext, anchor its CID, and record its metadata.
    pub async fn upload(&self, request: UploadRequest) -> ServiceResult<UploadReceipt> {
        if request.ciphertext.is_empty() {
            return Err(ServiceError::validation("File is required"));
        }
        if request.filename.trim().is_empty() {
            return Err(ServiceError::validation("Filename is required"));
        }
        if request.key_hex.trim().is_empty() || request.iv_hex.trim().is_empty() {
            return Err(ServiceError::validation("AES key and IV are required"));
        }
        let material = EncryptionMaterial::from_hex(&request.key_hex, &request.iv_hex)?;

        let intent = UploadIntent::new(
            &format_address(request.owner),
            &request.filename,
            &request.content_type,
            request.declared_size,
            SealedMaterial::seal(material),
        );
        self.metadata.put_intent(&intent)?;

        tracing::info!(
            intent_id = %intent.id,
            owner = %intent.owner,
            filename = %intent.filename,
            bytes = request.ciphertext.len(),
            "Upload started"
        );

        self.drive(intent, Some(&request.ciphertext)).await
    }

    /// Continue an interrupted upload from its last recorded stage.
    pub async fn resume(&self, intent_id: Uuid, caller: Address) -> ServiceResult<UploadReceipt> {
        let intent = self
            .metadata
            .get_intent(intent_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Upload intent {intent_id} not found")))?;

        if intent.owner != format_address(caller) {
            return Err(ServiceError::Authentication(
                "Upload intent belongs to another wallet".to_string(),
            ));
        }

        let _claim = self.claim(intent_id)?;
        // Re-read under the claim; a concurrent resume may have advanced it.
        let intent = self
            .metadata
            .get_intent(intent_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Upload intent {intent_id} not found")))?;

        tracing::info!(intent_id = %intent.id, stage = intent.stage.name(), "Resuming upload");
        self.drive(intent, None).await
    }

    /// Incomplete uploads for an owner.
    pub fn pending_for(&self, owner: Address) -> ServiceResult<Vec<UploadIntent>> {
        Ok(self.metadata.incomplete_intents_for(&format_address(owner))?)
    }

    pub fn incomplete_count(&self) -> ServiceResult<usize> {
        Ok(self.metadata.incomplete_intents()?.len())
    }

    async fn drive(
        &self,
        mut intent: UploadIntent,
        ciphertext: Option<&[u8]>,
    ) -> ServiceResult<UploadReceipt> {
        let owner = parse_wallet_address(&intent.owner)?;

        loop {
            let next = match &intent.stage {
                UploadStage::Pending => {
                    let Some(bytes) = ciphertext else {
                        self.metadata
                            .advance_intent(intent.id, UploadStage::Abandoned, intent.last_error.clone())?;
                        tracing::warn!(intent_id = %intent.id, "Pending upload abandoned, ciphertext not retained");
                        return Err(ServiceError::validation(
                            "Upload never reached content storage; upload the file again",
                        ));
                    };
                    let cid = self
                        .step(&intent, self.content.put(bytes, &intent.filename))
                        .await?;
                    tracing::info!(intent_id = %intent.id, cid = %cid, "Ciphertext stored");
                    UploadStage::ContentStored { cid }
                }
                UploadStage::ContentStored { cid } => {
                    let file_id = match self.find_anchored(owner, cid, ciphertext.is_none()).await? {
                        Some(id) => id,
                        None => {
                            self.step(&intent, self.ledger.record_file(owner, cid))
                                .await?
                        }
                    };
                    tracing::info!(intent_id = %intent.id, cid = %cid, file_id, "CID anchored");
                    UploadStage::LedgerAnchored {
                        cid: cid.clone(),
                        file_id,
                    }
                }
                UploadStage::LedgerAnchored { cid, file_id } => {
                    let record = self.save_record(&intent, cid)?;
                    UploadStage::MetadataCommitted {
                        cid: cid.clone(),
                        file_id: *file_id,
                        record_id: record,
                    }
                }
                UploadStage::MetadataCommitted {
                    cid,
                    file_id,
                    record_id,
                } => {
                    tracing::info!(intent_id = %intent.id, cid = %cid, file_id, record_id, "Upload complete");
                    return Ok(UploadReceipt {
                        intent_id: intent.id,
                        cid: cid.clone(),
                        file_id: *file_id,
                        record_id: *record_id,
                    });
                }
                UploadStage::Abandoned => {
                    return Err(ServiceError::validation("Upload intent was abandoned"));
                }
            };

            intent = self.metadata.advance_intent(intent.id, next, None)?;
        }
    }

    /// Run one external step, recording its failure on the intent.
    async fn step<T, E>(
        &self,
        intent: &UploadIntent,
        fut: impl std::future::Future<Output = Result<T, E>>,
    ) -> ServiceResult<T>
    where
        E: Into<ServiceError>,
    {
        match fut.await {
            Ok(value) => Ok(value),
            Err(err) => {
                let err: ServiceError = err.into();
                tracing::error!(
                    intent_id = %intent.id,
                    stage = intent.stage.name(),
                    error = %err,
                    "Upload step failed"
                );
                if let Err(e) = self.metadata.fail_intent(intent.id, &err.to_string()) {
                    tracing::error!(intent_id = %intent.id, error = %e, "Failed to record upload failure");
                }
                Err(err)
            }
        }
    }

    fn save_record(&self, intent: &UploadIntent, cid: &str) -> ServiceResult<u64> {
        let Some(material) = intent.material.clone() else {
            return Err(ServiceError::Internal(format!(
                "upload intent {} has no key material",
                intent.id
            )));
        };
        let saved = self.metadata.save(NewFileRecord {
            filename: intent.filename.clone(),
            cid: cid.to_string(),
            material,
            size: intent.size,
            content_type: intent.content_type.clone(),
        });
        match saved {
            Ok(record) => Ok(record.id),
            Err(err) => {
                let err = ServiceError::from(err);
                tracing::error!(intent_id = %intent.id, error = %err, "Metadata write failed");
                if let Err(e) = self.metadata.fail_intent(intent.id, &err.to_string()) {
                    tracing::error!(intent_id = %intent.id, error = %e, "Failed to record upload failure");
                }
                Err(err)
            }
        }
    }

    /// On resume, a previous attempt may have anchored the CID even though its
    /// confirmation wait failed.
    async fn find_anchored(
        &self,
        owner: Address,
        cid: &str,
        resuming: bool,
    ) -> ServiceResult<Option<FileId>> {
        if !resuming {
            return Ok(None);
        }
        for file_id in self.ledger.files_owned_by(owner).await?.into_iter().rev() {
            if self.ledger.file(file_id).await?.cid == cid {
                return Ok(Some(file_id));
            }
        }
        Ok(None)
    }
}
