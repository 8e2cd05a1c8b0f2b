// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Incomplete upload endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use super::acting_wallet;
use crate::{
    auth::Auth,
    error::ApiError,
    models::{PendingUploadView, UploadResponse, WalletAddress},
    state::AppState,
};

/// Uploads owned by `address` that have not reached a terminal stage.
#[utoipa::path(
    get,
    path = "/uploads/pending/{address}",
    params(("address" = String, Path, description = "Owner wallet")),
    tag = "Uploads",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = [PendingUploadView]),
        (status = 401, body = crate::error::ErrorBody)
    )
)]
pub async fn list_pending(
    State(state): State<AppState>,
    Auth(session): Auth,
    Path(address): Path<String>,
) -> Result<Json<Vec<PendingUploadView>>, ApiError> {
    let owner = acting_wallet(&session, &WalletAddress(address))?;
    let pending = state.uploads.pending_for(owner)?;
    Ok(Json(pending.into_iter().map(PendingUploadView::from).collect()))
}

/// Continue an upload from its last recorded stage.
#[utoipa::path(
    post,
    path = "/uploads/{intent_id}/resume",
    params(("intent_id" = Uuid, Path, description = "Upload intent id")),
    tag = "Uploads",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = UploadResponse),
        (status = 400, description = "Intent cannot be resumed", body = crate::error::ErrorBody),
        (status = 404, body = crate::error::ErrorBody)
    )
)]
pub async fn resume_upload(
    State(state): State<AppState>,
    Auth(session): Auth,
    Path(intent_id): Path<Uuid>,
) -> Result<Json<UploadResponse>, ApiError> {
    let receipt = state.uploads.resume(intent_id, session.address).await?;
    Ok(Json(UploadResponse {
        message: "Upload resumed".to_string(),
        cid: receipt.cid,
        file_id: receipt.file_id,
        record_id: receipt.record_id,
        intent_id: receipt.intent_id,
    }))
}
