// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::convert::Infallible;

use alloy::primitives::Address;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::AuthenticatedWallet,
    error::{ApiError, ErrorBody},
    metadata::UploadStage,
    models::{
        AccessRevokedView, ChangePermissionRequest, DownloadRequest, FileAccessList,
        NonceResponse, OwnedFileView, PendingUploadView, PermissionRequest, PermissionResponse,
        RegisterRequest, RegistrationResponse, SharedFileResolution, SharedFileView,
        ShareRequest, TokenResponse, UploadFileForm, UploadResponse, VerifyRequest,
        WalletAddress,
    },
    state::AppState,
};

pub mod auth;
pub mod files;
pub mod health;
pub mod uploads;
pub mod users;

/// Upper bound on an upload request body (ciphertext plus form fields).
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Parse a wallet named by the caller and require it to be the session wallet.
pub(crate) fn acting_wallet(
    session: &AuthenticatedWallet,
    claimed: &WalletAddress,
) -> Result<Address, ApiError> {
    let address = claimed.parse()?;
    session.ensure_is(address)?;
    Ok(address)
}

pub fn router(state: AppState) -> Router {
    let file_routes = Router::new()
        .route(
            "/files/upload",
            post(files::upload_file)
                .layer::<_, Infallible>(DefaultBodyLimit::disable())
                .layer::<_, Infallible>(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES)),
        )
        .route("/files/download", post(files::download_file))
        .route("/files/share", post(files::share_file))
        .route("/files/grant", post(files::grant_access))
        .route("/files/revoke", post(files::revoke_access))
        .route("/files/change-permission", post(files::change_permission))
        .route("/files/access-list/{address}", get(files::access_lists))
        .route("/files/{address}", get(files::list_files))
        .route(
            "/files/{record_id}/{file_id}/{requester_address}",
            get(files::shared_file_view),
        );

    let api_routes = Router::new()
        .merge(file_routes)
        .route("/auth/nonce/{wallet}", get(auth::get_nonce))
        .route("/auth/verify", post(auth::verify_signature))
        .route("/users/register", post(users::register_user))
        .route("/users/{address}/registered", get(users::is_registered))
        .route("/uploads/pending/{address}", get(uploads::list_pending))
        .route("/uploads/{intent_id}/resume", post(uploads::resume_upload))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EtherStore API",
        description = "Relay for wallet-authenticated, client-encrypted file storage"
    ),
    paths(
        auth::get_nonce,
        auth::verify_signature,
        files::upload_file,
        files::download_file,
        files::share_file,
        files::grant_access,
        files::revoke_access,
        files::change_permission,
        files::list_files,
        files::access_lists,
        files::shared_file_view,
        users::register_user,
        users::is_registered,
        uploads::list_pending,
        uploads::resume_upload,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            WalletAddress,
            ErrorBody,
            NonceResponse,
            VerifyRequest,
            TokenResponse,
            UploadFileForm,
            UploadResponse,
            DownloadRequest,
            ShareRequest,
            PermissionRequest,
            ChangePermissionRequest,
            PermissionResponse,
            OwnedFileView,
            FileAccessList,
            SharedFileView,
            AccessRevokedView,
            SharedFileResolution,
            RegisterRequest,
            RegistrationResponse,
            PendingUploadView,
            UploadStage,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Wallet sign-in"),
        (name = "Files", description = "Upload, download and access control"),
        (name = "Users", description = "On-chain user registration"),
        (name = "Uploads", description = "Incomplete upload recovery"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    pub async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, request).await;
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    pub fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;
    use crate::state::test_support::test_state;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (state, _dir) = test_state();
        let app = router(state);
        let (status, doc) = send_json(&app, get_request("/api-doc/openapi.json", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"]["/files/upload"].is_object());
        assert!(doc["paths"]["/files/{record_id}/{file_id}/{requester_address}"].is_object());
    }

    #[tokio::test]
    async fn file_routes_require_a_session() {
        let (state, _dir) = test_state();
        let app = router(state);
        let (status, body) = send_json(
            &app,
            get_request("/files/0x742d35cc6634c0532925a3b844bc9e7595f4ab12", None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "missing_auth_header");
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let (state, _dir) = test_state();
        let app = router(state);
        let response = tower::ServiceExt::oneshot(app, get_request("/health/live", None))
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}
