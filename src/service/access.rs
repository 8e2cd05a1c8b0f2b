// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access & retrieval orchestrator.
//!
//! Every path that hands out ciphertext or key material re-checks the ledger
//! at request time. Key material is only readable through an [`AccessProof`],
//! which only this module can mint.

use std::sync::Arc;

use alloy::primitives::Address;

use super::error::{ServiceError, ServiceResult};
use crate::content::{validate_cid, ContentStore};
use crate::ledger::{FileId, Ledger};
use crate::metadata::MetadataStore;
use crate::models::{
    format_address, parse_wallet_address, AccessRevokedView, FileAccessList, OwnedFileView,
    SharedFileResolution, SharedFileView, WalletAddress,
};

/// Evidence that the ledger authorized `requester` for `file_id` (whose CID is
/// `cid`) during the current request.
#[derive(Debug)]
pub struct AccessProof {
    file_id: FileId,
    requester: Address,
    cid: String,
}

impl AccessProof {
    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn requester(&self) -> Address {
        self.requester
    }

    pub fn cid(&self) -> &str {
        &self.cid
    }
}

pub struct AccessOrchestrator {
    ledger: Arc<dyn Ledger>,
    content: Arc<dyn ContentStore>,
    metadata: Arc<MetadataStore>,
}

impl AccessOrchestrator {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        content: Arc<dyn ContentStore>,
        metadata: Arc<MetadataStore>,
    ) -> Self {
        Self {
            ledger,
            content,
            metadata,
        }
    }

    /// Check the ledger now; `None` when the requester has no access.
    async fn authorize(
        &self,
        file_id: FileId,
        requester: Address,
    ) -> ServiceResult<Option<AccessProof>> {
        if !self.ledger.can_access(file_id, requester).await? {
            return Ok(None);
        }
        let entry = self.ledger.file(file_id).await?;
        Ok(Some(AccessProof {
            file_id,
            requester,
            cid: entry.cid,
        }))
    }

    /// Fetch ciphertext for an authorized requester.
    ///
    /// The ledger resolves the CID (and rejects unauthorized requesters)
    /// before any content fetch; the caller's claimed CID must match it.
    pub async fn download_file(
        &self,
        requester: Address,
        file_id: FileId,
        claimed_cid: &str,
    ) -> ServiceResult<Vec<u8>> {
        if claimed_cid.trim().is_empty() {
            return Err(ServiceError::validation("CID is required"));
        }

        let resolved = self.ledger.file_cid(file_id, requester).await.map_err(|e| {
            tracing::warn!(
                file_id,
                requester = %format_address(requester),
                error = %e,
                "Download refused by ledger"
            );
            ServiceError::from(e)
        })?;

        if resolved != claimed_cid {
            tracing::warn!(
                file_id,
                claimed = %claimed_cid,
                resolved = %resolved,
                "Claimed CID does not match ledger"
            );
            return Err(ServiceError::IntegrityMismatch {
                file_id,
                claimed: claimed_cid.to_string(),
            });
        }

        let bytes = self.content.get(&resolved).await?;
        tracing::info!(file_id, cid = %resolved, bytes = bytes.len(), "File downloaded");
        Ok(bytes)
    }

    /// Grant `recipient` access after validating both address strings.
    pub async fn share_file(
        &self,
        owner: &str,
        file_id: FileId,
        recipient: &str,
    ) -> ServiceResult<()> {
        let owner = parse_wallet_address(owner)?;
        let recipient = parse_wallet_address(recipient)?;
        self.grant(owner, file_id, recipient).await
    }

    pub async fn grant(&self, owner: Address, file_id: FileId, grantee: Address) -> ServiceResult<()> {
        self.ledger.grant_access(owner, file_id, grantee).await?;
        tracing::info!(file_id, grantee = %format_address(grantee), "Access granted");
        Ok(())
    }

    pub async fn revoke(&self, owner: Address, file_id: FileId, grantee: Address) -> ServiceResult<()> {
        self.ledger.revoke_access(owner, file_id, grantee).await?;
        tracing::info!(file_id, grantee = %format_address(grantee), "Access revoked");
        Ok(())
    }

    /// Bring `address`'s access to the requested state.
    pub async fn set_permission(
        &self,
        owner: Address,
        file_id: FileId,
        address: Address,
        grant: bool,
    ) -> ServiceResult<()> {
        if grant {
            self.grant(owner, file_id, address).await
        } else {
            self.revoke(owner, file_id, address).await
        }
    }

    /// Resolve a shared link. Key material is returned only to a requester the
    /// ledger authorizes for `file_id`, and only for the record whose CID the
    /// ledger holds for that file.
    pub async fn resolve_shared_file_view(
        &self,
        record_id: u64,
        file_id: FileId,
        requester: Address,
    ) -> ServiceResult<SharedFileResolution> {
        let record = self
            .metadata
            .find_by_id(record_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("File record {record_id} not found")))?;

        let Some(proof) = self.authorize(file_id, requester).await? else {
            tracing::info!(
                file_id,
                record_id,
                requester = %format_address(requester),
                "Shared view blocked"
            );
            return Ok(SharedFileResolution::AccessRevoked(AccessRevokedView::default()));
        };

        if proof.cid() != record.cid {
            return Err(ServiceError::IntegrityMismatch {
                file_id,
                claimed: record.cid,
            });
        }

        tracing::info!(
            file_id,
            record_id,
            requester = %format_address(proof.requester()),
            "Shared view granted"
        );
        let material = record.material.reveal(&proof);
        Ok(SharedFileResolution::Granted(SharedFileView {
            record_id: record.id,
            file_id: proof.file_id(),
            cid: record.cid.clone(),
            filename: record.filename,
            size: record.size,
            content_type: record.content_type,
            key_hex: material.key_hex().to_string(),
            iv_hex: material.iv_hex().to_string(),
        }))
    }

    /// The owner's files, merged with local metadata. Files whose CID has no
    /// metadata record are skipped.
    pub async fn list_owner_files(&self, owner: Address) -> ServiceResult<Vec<OwnedFileView>> {
        if !self.ledger.is_registered(owner).await? {
            return Err(ServiceError::Authentication(
                "Wallet is not registered".to_string(),
            ));
        }

        let mut files = Vec::new();
        for file_id in self.ledger.files_owned_by(owner).await? {
            let cid = self.ledger.file_cid(file_id, owner).await?;
            if validate_cid(&cid).is_err() {
                tracing::warn!(file_id, cid = %cid, "Ledger entry has malformed CID, skipping");
                continue;
            }
            match self.metadata.find_by_cid(&cid)? {
                Some(record) => files.push(OwnedFileView {
                    record_id: record.id,
                    file_id,
                    cid,
                    filename: record.filename,
                    size: record.size,
                    content_type: record.content_type,
                    created_at: record.created_at,
                }),
                None => {
                    tracing::warn!(file_id, cid = %cid, "No metadata record for ledger file, skipping");
                }
            }
        }
        Ok(files)
    }

    /// Grantee lists for every file `owner` holds.
    pub async fn access_lists(&self, owner: Address) -> ServiceResult<Vec<FileAccessList>> {
        let mut lists = Vec::new();
        for file_id in self.ledger.files_owned_by(owner).await? {
            let entry = self.ledger.file(file_id).await?;
            let granted = self.ledger.access_list(file_id).await?;
            let filename = self.metadata.find_by_cid(&entry.cid)?.map(|r| r.filename);
            lists.push(FileAccessList {
                file_id,
                cid: entry.cid,
                filename,
                granted: granted.into_iter().map(WalletAddress::from).collect(),
            });
        }
        Ok(lists)
    }
}
