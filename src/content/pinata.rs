// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pinata pinning client.
//!
//! Uploads go through the pinning API (`pinFileToIPFS`, CID version 1);
//! downloads go through a public IPFS gateway over plain HTTP GET.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{multipart, Client, StatusCode};
use serde::Deserialize;

use super::retry::{fetch_with_retry, AttemptError, RetryPolicy};
use super::{validate_cid, ContentError, ContentResult, ContentStore};

/// Project tag attached to every pin.
pub const PIN_PROJECT: &str = "etherStore";

/// Default pinning API base URL.
pub const DEFAULT_API_URL: &str = "https://api.pinata.cloud";

/// Default public gateway base URL.
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.pinata.cloud";

/// Configuration for the Pinata client.
#[derive(Clone)]
pub struct PinataConfig {
    /// Pinning API base URL.
    pub api_url: String,
    /// IPFS gateway base URL used for downloads.
    pub gateway_url: String,
    pub api_key: String,
    pub secret_key: String,
    /// Retry policy for gateway fetches.
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for PinataConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinataConfig")
            .field("api_url", &self.api_url)
            .field("gateway_url", &self.gateway_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Pinata pinning service client.
pub struct PinataClient {
    client: Client,
    config: PinataConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinResponse {
    ipfs_hash: String,
    #[serde(default)]
    pin_size: u64,
}

impl PinataClient {
    pub fn new(config: PinataConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn gateway_url(&self, cid: &str) -> String {
        format!("{}/ipfs/{}", self.config.gateway_url.trim_end_matches('/'), cid)
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, AttemptError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AttemptError::Failed(e.to_string()))?;

        match resp.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(AttemptError::RateLimited),
            StatusCode::NOT_FOUND => Err(AttemptError::NotFound),
            status if !status.is_success() => {
                Err(AttemptError::Failed(format!("gateway returned HTTP {status}")))
            }
            _ => resp
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| AttemptError::Failed(e.to_string())),
        }
    }
}

/// Build the `pinataMetadata` form field.
fn pin_metadata(display_name: &str) -> serde_json::Value {
    let name = if display_name.trim().is_empty() {
        "encrypted-file"
    } else {
        display_name
    };

    serde_json::json!({
        "name": name,
        "keyvalues": {
            "project": PIN_PROJECT,
            "uploadedAt": Utc::now().to_rfc3339(),
        }
    })
}

#[async_trait]
impl ContentStore for PinataClient {
    fn name(&self) -> &str {
        "pinata"
    }

    async fn put(&self, bytes: &[u8], display_name: &str) -> ContentResult<String> {
        let file_part = multipart::Part::bytes(bytes.to_vec())
            .file_name(display_name.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| ContentError::Unavailable(e.to_string()))?;

        let form = multipart::Form::new()
            .part("file", file_part)
            .text("pinataMetadata", pin_metadata(display_name).to_string())
            .text("pinataOptions", r#"{"cidVersion":1}"#);

        let resp = self
            .client
            .post(format!(
                "{}/pinning/pinFileToIPFS",
                self.config.api_url.trim_end_matches('/')
            ))
            .header("pinata_api_key", &self.config.api_key)
            .header("pinata_secret_api_key", &self.config.secret_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ContentError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ContentError::Unavailable(format!(
                "pin failed with HTTP {status}: {body}"
            )));
        }

        let pinned: PinResponse = resp
            .json()
            .await
            .map_err(|e| ContentError::Unavailable(format!("pin response parse error: {e}")))?;

        tracing::info!(
            cid = %pinned.ipfs_hash,
            pin_size = pinned.pin_size,
            "Pinned encrypted payload"
        );

        Ok(pinned.ipfs_hash)
    }

    async fn get(&self, cid: &str) -> ContentResult<Vec<u8>> {
        validate_cid(cid)?;
        let url = self.gateway_url(cid);
        let url = url.as_str();
        fetch_with_retry(self.config.retry, cid, move |_| self.fetch_once(url)).await
    }
}
