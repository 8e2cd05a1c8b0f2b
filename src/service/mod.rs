// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Orchestrators sitting between the HTTP layer and the three backing
//! systems (content store, ledger, metadata store).

pub mod access;
pub mod error;
pub mod upload;

pub use access::{AccessOrchestrator, AccessProof};
pub use error::{ServiceError, ServiceResult};
pub use upload::{UploadOrchestrator, UploadReceipt, UploadRequest};
