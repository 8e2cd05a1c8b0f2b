// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures for the REST API. Payloads are validated at
//! the boundary before they reach the orchestrators.
//!
//! ## Wallet Address Type
//!
//! The [`WalletAddress`] newtype wraps Ethereum-style addresses (0x-prefixed,
//! 40 hex characters). [`WalletAddress::parse`] is the single place where the
//! format is checked.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::ledger::FileId;
use crate::metadata::{UploadIntent, UploadStage};
use crate::service::error::ServiceError;

// =============================================================================
// Wallet Address Type
// =============================================================================

/// Ethereum-compatible wallet address wrapper.
///
/// Format: `0x` followed by 40 hexadecimal characters (20 bytes). Any case is
/// accepted; no checksum is enforced.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[schema(value_type = String, example = "0x742d35cc6634c0532925a3b844bc9e7595f4ab12")]
pub struct WalletAddress(pub String);

impl WalletAddress {
    /// Validate the format and convert to an [`Address`].
    pub fn parse(&self) -> Result<Address, ServiceError> {
        parse_wallet_address(&self.0)
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WalletAddress {
    fn from(value: &str) -> Self {
        WalletAddress(value.to_string())
    }
}

impl From<Address> for WalletAddress {
    fn from(value: Address) -> Self {
        WalletAddress(format_address(value))
    }
}

/// Strict `0x` + 40 hex parse.
pub fn parse_wallet_address(raw: &str) -> Result<Address, ServiceError> {
    let hex = raw
        .strip_prefix("0x")
        .ok_or_else(|| ServiceError::validation(format!("Invalid address format: {raw}")))?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ServiceError::validation(format!(
            "Invalid address format: {raw}"
        )));
    }
    raw.parse::<Address>()
        .map_err(|_| ServiceError::validation(format!("Invalid address format: {raw}")))
}

/// Lowercase `0x` rendering used in responses and storage keys.
pub fn format_address(address: Address) -> String {
    format!("{address:#x}")
}

// =============================================================================
// Auth Models
// =============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NonceResponse {
    /// Message to sign with `personal_sign`
    pub nonce: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyRequest {
    pub wallet: WalletAddress,
    /// 65-byte hex signature over the nonce
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub message: String,
    pub token: String,
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: u64,
    pub wallet: WalletAddress,
}

// =============================================================================
// File Models
// =============================================================================

/// Multipart form accepted by `POST /files/upload`.
///
/// Only used for the OpenAPI document; the handler reads the fields directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFileForm {
    /// Client-encrypted file bytes
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Owner wallet, must match the session
    pub address: String,
    /// Hex-encoded AES-256 key
    pub key: String,
    /// Hex-encoded CBC IV
    pub iv: String,
    /// Plaintext size in bytes
    pub size: Option<u64>,
    /// Plaintext MIME type
    #[schema(rename = "type")]
    pub content_type: Option<String>,
    /// Overrides the file part's name
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub cid: String,
    pub file_id: FileId,
    pub record_id: u64,
    pub intent_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub cid: String,
    pub requester_address: WalletAddress,
    pub file_id: FileId,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub file_id: FileId,
    pub owner_address: WalletAddress,
    pub recipient_address: WalletAddress,
}

/// Grant or revoke a single address. The owner is the authenticated wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    pub file_id: FileId,
    pub address: WalletAddress,
}

/// Set an address's access to an explicit target state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePermissionRequest {
    pub file_id: FileId,
    pub address: WalletAddress,
    pub grant: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResponse {
    pub message: String,
    pub file_id: FileId,
    pub address: WalletAddress,
    pub granted: bool,
}

/// An owner's file: ledger id merged with its metadata record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OwnedFileView {
    pub record_id: u64,
    pub file_id: FileId,
    pub cid: String,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileAccessList {
    pub file_id: FileId,
    pub cid: String,
    pub filename: Option<String>,
    pub granted: Vec<WalletAddress>,
}

/// Shared-link view returned to an authorized requester, including key material.
#[derive(Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SharedFileView {
    pub record_id: u64,
    pub file_id: FileId,
    pub cid: String,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
    pub key_hex: String,
    pub iv_hex: String,
}

impl std::fmt::Debug for SharedFileView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedFileView")
            .field("record_id", &self.record_id)
            .field("file_id", &self.file_id)
            .field("cid", &self.cid)
            .finish_non_exhaustive()
    }
}

/// Returned when the requester is not (or no longer) authorized.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AccessRevokedView {
    pub message: String,
}

impl Default for AccessRevokedView {
    fn default() -> Self {
        Self {
            message: "Your access to this file has been removed".to_string(),
        }
    }
}

/// Outcome of resolving a shared link.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SharedFileResolution {
    Granted(SharedFileView),
    AccessRevoked(AccessRevokedView),
}

// =============================================================================
// User Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub address: WalletAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct RegistrationResponse {
    pub address: WalletAddress,
    pub registered: bool,
}

// =============================================================================
// Upload Intent Models
// =============================================================================

/// An incomplete upload as shown to its owner. Key material is omitted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PendingUploadView {
    pub intent_id: Uuid,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
    pub stage: UploadStage,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UploadIntent> for PendingUploadView {
    fn from(intent: UploadIntent) -> Self {
        Self {
            intent_id: intent.id,
            filename: intent.filename,
            size: intent.size,
            content_type: intent.content_type,
            stage: intent.stage,
            last_error: intent.last_error,
            created_at: intent.created_at,
            updated_at: intent.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_either_case() {
        let lower = parse_wallet_address("0x742d35cc6634c0532925a3b844bc9e7595f4ab12").unwrap();
        let mixed = parse_wallet_address("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12").unwrap();
        assert_eq!(lower, mixed);
        assert_eq!(
            format_address(lower),
            "0x742d35cc6634c0532925a3b844bc9e7595f4ab12"
        );
    }

    #[test]
    fn parse_rejects_malformed() {
        for raw in [
            "",
            "742d35cc6634c0532925a3b844bc9e7595f4ab12",
            "0x742d35cc",
            "0x742d35cc6634c0532925a3b844bc9e7595f4ab1g",
            "0x742d35cc6634c0532925a3b844bc9e7595f4ab1200",
        ] {
            assert!(
                matches!(parse_wallet_address(raw), Err(ServiceError::Validation(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn resolution_serializes_with_status_tag() {
        let revoked = SharedFileResolution::AccessRevoked(AccessRevokedView::default());
        let json = serde_json::to_value(&revoked).unwrap();
        assert_eq!(json["status"], "access_revoked");
        assert!(json.get("keyHex").is_none());

        let granted = SharedFileResolution::Granted(SharedFileView {
            record_id: 1,
            file_id: 7,
            cid: "bafy123".into(),
            filename: "report.pdf".into(),
            size: 1024,
            content_type: "application/pdf".into(),
            key_hex: "00".repeat(32),
            iv_hex: "11".repeat(16),
        });
        let json = serde_json::to_value(&granted).unwrap();
        assert_eq!(json["status"], "granted");
        assert_eq!(json["fileId"], 7);
        assert_eq!(json["ivHex"], "11".repeat(16));
    }

    #[test]
    fn shared_view_debug_omits_keys() {
        let view = SharedFileView {
            record_id: 1,
            file_id: 7,
            cid: "bafy123".into(),
            filename: "report.pdf".into(),
            size: 1024,
            content_type: "application/pdf".into(),
            key_hex: "ab".repeat(32),
            iv_hex: "cd".repeat(16),
        };
        let rendered = format!("{view:?}");
        assert!(!rendered.contains(&"ab".repeat(32)));
    }
}
