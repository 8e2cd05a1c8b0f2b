// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::acting_wallet;
use crate::{
    auth::Auth,
    error::ApiError,
    ledger::FileId,
    models::{
        format_address, ChangePermissionRequest, DownloadRequest, FileAccessList, OwnedFileView,
        PermissionRequest, PermissionResponse, ShareRequest, SharedFileResolution,
        UploadResponse, WalletAddress,
    },
    service::UploadRequest,
    state::AppState,
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Fields collected from the upload form.
#[derive(Default)]
struct UploadFields {
    file: Option<Vec<u8>>,
    file_name: Option<String>,
    file_content_type: Option<String>,
    address: Option<String>,
    key: Option<String>,
    iv: Option<String>,
    size: Option<String>,
    content_type: Option<String>,
    filename: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadFields, ApiError> {
    let mut fields = UploadFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            fields.file_name = field.file_name().map(str::to_string);
            fields.file_content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;
            fields.file = Some(bytes.to_vec());
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read field {name}: {e}")))?;
        match name.as_str() {
            "address" => fields.address = Some(value),
            "key" => fields.key = Some(value),
            "iv" => fields.iv = Some(value),
            "size" => fields.size = Some(value),
            "type" => fields.content_type = Some(value),
            "filename" => fields.filename = Some(value),
            other => tracing::debug!(field = %other, "Ignoring unknown upload field"),
        }
    }

    Ok(fields)
}

#[utoipa::path(
    post,
    path = "/files/upload",
    request_body(content = crate::models::UploadFileForm, content_type = "multipart/form-data"),
    tag = "Files",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, body = UploadResponse),
        (status = 400, body = crate::error::ErrorBody),
        (status = 401, body = crate::error::ErrorBody),
        (status = 502, body = crate::error::ErrorBody),
        (status = 504, body = crate::error::ErrorBody)
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    Auth(session): Auth,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let fields = read_upload_form(multipart).await?;

    let (Some(file), Some(address), Some(key), Some(iv)) =
        (fields.file, fields.address, fields.key, fields.iv)
    else {
        return Err(ApiError::bad_request(
            "File, address, key, and iv are required.",
        ));
    };
    let owner = acting_wallet(&session, &WalletAddress(address))?;

    let declared_size = match fields.size {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ApiError::bad_request(format!("Invalid size: {raw}")))?,
        None => file.len() as u64,
    };
    let filename = fields
        .filename
        .or(fields.file_name)
        .unwrap_or_else(|| "unnamed".to_string());
    let content_type = fields
        .content_type
        .or(fields.file_content_type)
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let receipt = state
        .uploads
        .upload(UploadRequest {
            owner,
            ciphertext: file,
            filename,
            content_type,
            declared_size,
            key_hex: key,
            iv_hex: iv,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "File uploaded".to_string(),
            cid: receipt.cid,
            file_id: receipt.file_id,
            record_id: receipt.record_id,
            intent_id: receipt.intent_id,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/files/download",
    request_body = DownloadRequest,
    tag = "Files",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Ciphertext bytes", content_type = "application/octet-stream"),
        (status = 403, body = crate::error::ErrorBody),
        (status = 409, body = crate::error::ErrorBody),
        (status = 502, body = crate::error::ErrorBody)
    )
)]
pub async fn download_file(
    State(state): State<AppState>,
    Auth(session): Auth,
    Json(request): Json<DownloadRequest>,
) -> Result<Response, ApiError> {
    let requester = acting_wallet(&session, &request.requester_address)?;
    let bytes = state
        .access
        .download_file(requester, request.file_id, &request.cid)
        .await?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/files/share",
    request_body = ShareRequest,
    tag = "Files",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = PermissionResponse),
        (status = 400, body = crate::error::ErrorBody),
        (status = 403, body = crate::error::ErrorBody)
    )
)]
pub async fn share_file(
    State(state): State<AppState>,
    Auth(session): Auth,
    Json(request): Json<ShareRequest>,
) -> Result<Json<PermissionResponse>, ApiError> {
    acting_wallet(&session, &request.owner_address)?;
    state
        .access
        .share_file(
            &request.owner_address.0,
            request.file_id,
            &request.recipient_address.0,
        )
        .await?;

    Ok(Json(PermissionResponse {
        message: "File shared".to_string(),
        file_id: request.file_id,
        address: request.recipient_address,
        granted: true,
    }))
}

async fn apply_permission(
    state: &AppState,
    session: &crate::auth::AuthenticatedWallet,
    file_id: FileId,
    address: &WalletAddress,
    grant: bool,
) -> Result<Json<PermissionResponse>, ApiError> {
    let grantee = address.parse()?;
    state
        .access
        .set_permission(session.address, file_id, grantee, grant)
        .await?;

    Ok(Json(PermissionResponse {
        message: if grant { "Access granted" } else { "Access revoked" }.to_string(),
        file_id,
        address: WalletAddress(format_address(grantee)),
        granted: grant,
    }))
}

#[utoipa::path(
    post,
    path = "/files/grant",
    request_body = PermissionRequest,
    tag = "Files",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = PermissionResponse),
        (status = 403, body = crate::error::ErrorBody)
    )
)]
pub async fn grant_access(
    State(state): State<AppState>,
    Auth(session): Auth,
    Json(request): Json<PermissionRequest>,
) -> Result<Json<PermissionResponse>, ApiError> {
    apply_permission(&state, &session, request.file_id, &request.address, true).await
}

#[utoipa::path(
    post,
    path = "/files/revoke",
    request_body = PermissionRequest,
    tag = "Files",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = PermissionResponse),
        (status = 403, body = crate::error::ErrorBody)
    )
)]
pub async fn revoke_access(
    State(state): State<AppState>,
    Auth(session): Auth,
    Json(request): Json<PermissionRequest>,
) -> Result<Json<PermissionResponse>, ApiError> {
    apply_permission(&state, &session, request.file_id, &request.address, false).await
}

#[utoipa::path(
    post,
    path = "/files/change-permission",
    request_body = ChangePermissionRequest,
    tag = "Files",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = PermissionResponse),
        (status = 403, body = crate::error::ErrorBody)
    )
)]
pub async fn change_permission(
    State(state): State<AppState>,
    Auth(session): Auth,
    Json(request): Json<ChangePermissionRequest>,
) -> Result<Json<PermissionResponse>, ApiError> {
    apply_permission(
        &state,
        &session,
        request.file_id,
        &request.address,
        request.grant,
    )
    .await
}

#[utoipa::path(
    get,
    path = "/files/{address}",
    params(("address" = String, Path, description = "Owner wallet")),
    tag = "Files",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = [OwnedFileView]),
        (status = 401, body = crate::error::ErrorBody)
    )
)]
pub async fn list_files(
    State(state): State<AppState>,
    Auth(session): Auth,
    Path(address): Path<String>,
) -> Result<Json<Vec<OwnedFileView>>, ApiError> {
    let owner = acting_wallet(&session, &WalletAddress(address))?;
    Ok(Json(state.access.list_owner_files(owner).await?))
}

#[utoipa::path(
    get,
    path = "/files/access-list/{address}",
    params(("address" = String, Path, description = "Owner wallet")),
    tag = "Files",
    security(("bearer_auth" = [])),
    responses((status = 200, body = [FileAccessList]))
)]
pub async fn access_lists(
    State(state): State<AppState>,
    Auth(session): Auth,
    Path(address): Path<String>,
) -> Result<Json<Vec<FileAccessList>>, ApiError> {
    let owner = acting_wallet(&session, &WalletAddress(address))?;
    Ok(Json(state.access.access_lists(owner).await?))
}

#[utoipa::path(
    get,
    path = "/files/{record_id}/{file_id}/{requester_address}",
    params(
        ("record_id" = u64, Path, description = "Metadata record id"),
        ("file_id" = u64, Path, description = "Ledger file id"),
        ("requester_address" = String, Path, description = "Wallet opening the link")
    ),
    tag = "Files",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = SharedFileResolution),
        (status = 404, body = crate::error::ErrorBody)
    )
)]
pub async fn shared_file_view(
    State(state): State<AppState>,
    Auth(session): Auth,
    Path((record_id, file_id, requester_address)): Path<(u64, FileId, String)>,
) -> Result<Json<SharedFileResolution>, ApiError> {
    let requester = acting_wallet(&session, &WalletAddress(requester_address))?;
    Ok(Json(
        state
            .access
            .resolve_shared_file_view(record_id, file_id, requester)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::api::test_util::*;
    use crate::crypto::{decrypt, encrypt};
    use crate::ledger::{InMemoryLedger, Ledger};
    use crate::state::test_support::test_state_with_handles;
    use alloy::primitives::Address;
    use axum::{body::Body, http::Request, Router};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::TempDir;

    const OWNER: Address = Address::repeat_byte(0xaa);
    const FRIEND: Address = Address::repeat_byte(0xbb);
    const BOUNDARY: &str = "etherstore-test-boundary";

    struct Harness {
        _dir: TempDir,
        app: Router,
        ledger: Arc<InMemoryLedger>,
        owner_token: String,
        friend_token: String,
    }

    fn harness() -> Harness {
        let (state, ledger, _content, dir) = test_state_with_handles();
        let owner_token = state.sessions.issue(OWNER).unwrap();
        let friend_token = state.sessions.issue(FRIEND).unwrap();
        Harness {
            _dir: dir,
            app: router(state),
            ledger,
            owner_token,
            friend_token,
        }
    }

    fn addr(a: Address) -> String {
        format_address(a)
    }

    fn multipart_upload(
        token: &str,
        file: &[u8],
        text_fields: &[(&str, String)],
    ) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in text_fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"report.pdf\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/files/upload")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    struct Uploaded {
        body: Value,
        plaintext: Vec<u8>,
    }

    async fn upload(h: &Harness) -> Uploaded {
        let plaintext: Vec<u8> = (0..1024u32).map(|i| (i * 7 % 256) as u8).collect();
        let encrypted = encrypt(&plaintext).unwrap();
        let request = multipart_upload(
            &h.owner_token,
            &encrypted.ciphertext,
            &[
                ("address", addr(OWNER)),
                ("key", encrypted.material.key_hex().to_string()),
                ("iv", encrypted.material.iv_hex().to_string()),
                ("size", "1024".to_string()),
                ("type", "application/pdf".to_string()),
            ],
        );
        let (status, body) = send_json(&h.app, request).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        Uploaded { body, plaintext }
    }

    #[tokio::test]
    async fn upload_share_download_revoke() {
        let h = harness();
        let uploaded = upload(&h).await;
        let cid = uploaded.body["cid"].as_str().unwrap().to_string();
        let file_id = uploaded.body["fileId"].as_u64().unwrap();
        let record_id = uploaded.body["recordId"].as_u64().unwrap();

        // Friend has no access yet.
        let (status, body) = send_json(
            &h.app,
            post_json(
                "/files/download",
                Some(&h.friend_token),
                json!({"cid": cid, "requesterAddress": addr(FRIEND), "fileId": file_id}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "access_denied");

        let (status, _) = send_json(
            &h.app,
            post_json(
                "/files/share",
                Some(&h.owner_token),
                json!({"fileId": file_id, "ownerAddress": addr(OWNER), "recipientAddress": addr(FRIEND)}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let view_uri = format!("/files/{record_id}/{file_id}/{}", addr(FRIEND));
        let (status, view) = send_json(&h.app, get_request(&view_uri, Some(&h.friend_token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["status"], "granted");
        assert_eq!(view["filename"], "report.pdf");

        let (status, ciphertext) = send(
            &h.app,
            post_json(
                "/files/download",
                Some(&h.friend_token),
                json!({"cid": cid, "requesterAddress": addr(FRIEND), "fileId": file_id}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let plaintext = decrypt(
            &ciphertext,
            view["keyHex"].as_str().unwrap(),
            view["ivHex"].as_str().unwrap(),
        )
        .unwrap();
        assert_eq!(plaintext, uploaded.plaintext);

        let (status, body) = send_json(
            &h.app,
            post_json(
                "/files/change-permission",
                Some(&h.owner_token),
                json!({"fileId": file_id, "address": addr(FRIEND), "grant": false}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["granted"], false);

        let (status, view) = send_json(&h.app, get_request(&view_uri, Some(&h.friend_token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["status"], "access_revoked");
        assert!(view.get("keyHex").is_none());
    }

    #[tokio::test]
    async fn upload_above_default_body_limit_is_accepted() {
        let h = harness();
        let plaintext = vec![0x5a_u8; 3 * 1024 * 1024];
        let encrypted = encrypt(&plaintext).unwrap();
        let request = multipart_upload(
            &h.owner_token,
            &encrypted.ciphertext,
            &[
                ("address", addr(OWNER)),
                ("key", encrypted.material.key_hex().to_string()),
                ("iv", encrypted.material.iv_hex().to_string()),
                ("size", plaintext.len().to_string()),
                ("type", "application/octet-stream".to_string()),
            ],
        );
        let (status, body) = send_json(&h.app, request).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert!(body["cid"].as_str().is_some_and(|cid| !cid.is_empty()));
    }

    #[tokio::test]
    async fn upload_requires_all_fields() {
        let h = harness();
        let request = multipart_upload(&h.owner_token, b"0123456789abcdef", &[("address", addr(OWNER))]);
        let (status, body) = send_json(&h.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "File, address, key, and iv are required.");
    }

    #[tokio::test]
    async fn upload_for_another_wallet_is_unauthorized() {
        let h = harness();
        let encrypted = encrypt(b"hello").unwrap();
        let request = multipart_upload(
            &h.friend_token,
            &encrypted.ciphertext,
            &[
                ("address", addr(OWNER)),
                ("key", encrypted.material.key_hex().to_string()),
                ("iv", encrypted.material.iv_hex().to_string()),
            ],
        );
        let (status, body) = send_json(&h.app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "wallet_mismatch");
    }

    #[tokio::test]
    async fn download_with_wrong_cid_conflicts() {
        let h = harness();
        let uploaded = upload(&h).await;
        let file_id = uploaded.body["fileId"].as_u64().unwrap();

        let (status, body) = send_json(
            &h.app,
            post_json(
                "/files/download",
                Some(&h.owner_token),
                json!({"cid": "bafkreisomethingelse", "requesterAddress": addr(OWNER), "fileId": file_id}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error_code"], "integrity_mismatch");
    }

    #[tokio::test]
    async fn non_owner_cannot_grant() {
        let h = harness();
        let uploaded = upload(&h).await;
        let file_id = uploaded.body["fileId"].as_u64().unwrap();

        let (status, body) = send_json(
            &h.app,
            post_json(
                "/files/grant",
                Some(&h.friend_token),
                json!({"fileId": file_id, "address": addr(FRIEND)}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "not_file_owner");
    }

    #[tokio::test]
    async fn share_rejects_malformed_recipient() {
        let h = harness();
        let uploaded = upload(&h).await;
        let file_id = uploaded.body["fileId"].as_u64().unwrap();

        let (status, _) = send_json(
            &h.app,
            post_json(
                "/files/share",
                Some(&h.owner_token),
                json!({"fileId": file_id, "ownerAddress": addr(OWNER), "recipientAddress": "0xnope"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn owner_listing_and_access_lists() {
        let h = harness();
        let uploaded = upload(&h).await;
        let file_id = uploaded.body["fileId"].as_u64().unwrap();

        let list_uri = format!("/files/{}", addr(OWNER));
        let (status, _) = send_json(&h.app, get_request(&list_uri, Some(&h.owner_token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "unregistered wallets are rejected");

        h.ledger.register_user(OWNER).await.unwrap();
        let (status, files) = send_json(&h.app, get_request(&list_uri, Some(&h.owner_token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(files[0]["fileId"], file_id);
        assert!(files[0].get("keyHex").is_none());

        h.ledger.grant_access(OWNER, file_id, FRIEND).await.unwrap();
        let (status, lists) = send_json(
            &h.app,
            get_request(&format!("/files/access-list/{}", addr(OWNER)), Some(&h.owner_token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(lists[0]["granted"][0], addr(FRIEND));

        // Another wallet cannot list the owner's files.
        let (status, _) = send_json(&h.app, get_request(&list_uri, Some(&h.friend_token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
