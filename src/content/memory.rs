// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process content store.
//!
//! Addresses are derived from a SHA-256 digest of the payload, so identical
//! bytes map to the same address like on IPFS. Used when no pinning
//! credentials are configured and by orchestrator tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use ring::digest::{digest, SHA256};

use super::{ContentError, ContentResult, ContentStore};

#[derive(Default)]
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    unavailable: AtomicBool,
    fetches: AtomicUsize,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: subsequent `put` calls fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `get` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn address_of(bytes: &[u8]) -> String {
        let hash = digest(&SHA256, bytes);
        format!("bafkrei{}", &alloy::hex::encode(hash.as_ref())[..52])
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, bytes: &[u8], display_name: &str) -> ContentResult<String> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ContentError::Unavailable("memory store offline".to_string()));
        }

        let cid = Self::address_of(bytes);
        self.blobs
            .write()
            .map_err(|_| ContentError::Unavailable("memory store poisoned".to_string()))?
            .insert(cid.clone(), bytes.to_vec());

        tracing::debug!(cid = %cid, name = %display_name, size = bytes.len(), "Stored blob in memory");
        Ok(cid)
    }

    async fn get(&self, cid: &str) -> ContentResult<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.blobs
            .read()
            .map_err(|_| ContentError::FetchFailed {
                cid: cid.to_string(),
                reason: "memory store poisoned".to_string(),
            })?
            .get(cid)
            .cloned()
            .ok_or_else(|| ContentError::NotFound(cid.to_string()))
    }
}
