// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Content-addressed storage for encrypted file payloads.
//!
//! Payloads are already encrypted when they reach this layer; backends never
//! see plaintext. Every `put` is a publication to a shared network and cannot
//! be undone.
//!
//! - [`PinataClient`] pins through the Pinata API and fetches through a public
//!   IPFS gateway, retrying rate-limited fetches.
//! - [`MemoryContentStore`] keeps blobs in process (development mode, tests).

pub mod memory;
pub mod pinata;
pub mod retry;

use async_trait::async_trait;

pub use memory::MemoryContentStore;
pub use pinata::{PinataClient, PinataConfig};
pub use retry::RetryPolicy;

/// Errors from the content-addressed store.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// Upload could not be completed (network or service error).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Fetch failed, either after exhausting retries or on a non-transient error.
    #[error("Fetch of {cid} failed: {reason}")]
    FetchFailed { cid: String, reason: String },

    /// The gateway reported the address as unknown.
    #[error("Content not found: {0}")]
    NotFound(String),

    #[error("Invalid content address: {0}")]
    InvalidCid(String),
}

pub type ContentResult<T> = Result<T, ContentError>;

/// Trait for content-addressed storage backends.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Human-readable backend name (e.g. "pinata", "memory").
    fn name(&self) -> &str;

    /// Upload bytes and return their content address (CID).
    async fn put(&self, bytes: &[u8], display_name: &str) -> ContentResult<String>;

    /// Fetch bytes by content address.
    async fn get(&self, cid: &str) -> ContentResult<Vec<u8>>;
}

/// Check that a CID is a plain base-encoded token safe to splice into a URL.
pub fn validate_cid(cid: &str) -> ContentResult<()> {
    if cid.is_empty() || cid.len() > 128 || !cid.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ContentError::InvalidCid(cid.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_cid_accepts_v0_and_v1() {
        assert!(validate_cid("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG").is_ok());
        assert!(validate_cid("bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi").is_ok());
    }

    #[test]
    fn validate_cid_accepts_short_tokens() {
        assert!(validate_cid("bafy123").is_ok());
    }

    #[test]
    fn validate_cid_rejects_path_tricks() {
        assert!(validate_cid("../../etc/passwd").is_err());
        assert!(validate_cid("bafy123/../x").is_err());
        assert!(validate_cid("").is_err());
        assert!(validate_cid(&"a".repeat(129)).is_err());
    }
}
