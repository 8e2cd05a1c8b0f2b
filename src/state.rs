// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::SessionKeys;
use crate::content::ContentStore;
use crate::ledger::Ledger;
use crate::metadata::MetadataStore;
use crate::service::{AccessOrchestrator, UploadOrchestrator};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn Ledger>,
    pub content: Arc<dyn ContentStore>,
    pub metadata: Arc<MetadataStore>,
    pub uploads: Arc<UploadOrchestrator>,
    pub access: Arc<AccessOrchestrator>,
    pub sessions: Arc<SessionKeys>,
    pub chain_id: u64,
}

impl AppState {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        content: Arc<dyn ContentStore>,
        metadata: Arc<MetadataStore>,
        sessions: SessionKeys,
        chain_id: u64,
    ) -> Self {
        let uploads = UploadOrchestrator::new(ledger.clone(), content.clone(), metadata.clone());
        let access = AccessOrchestrator::new(ledger.clone(), content.clone(), metadata.clone());
        Self {
            ledger,
            content,
            metadata,
            uploads: Arc::new(uploads),
            access: Arc::new(access),
            sessions: Arc::new(sessions),
            chain_id,
        }
    }
}
