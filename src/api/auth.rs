// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    auth::nonce,
    error::ApiError,
    models::{format_address, parse_wallet_address, NonceResponse, TokenResponse, VerifyRequest},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/auth/nonce/{wallet}",
    params(("wallet" = String, Path, description = "Wallet address requesting sign-in")),
    tag = "Auth",
    responses(
        (status = 200, body = NonceResponse),
        (status = 400, body = crate::error::ErrorBody)
    )
)]
pub async fn get_nonce(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<Json<NonceResponse>, ApiError> {
    let wallet = parse_wallet_address(&wallet)?;
    let nonce = nonce::issue_nonce(&state.metadata, wallet)?;
    tracing::debug!(wallet = %format_address(wallet), "Sign-in nonce issued");
    Ok(Json(NonceResponse { nonce }))
}

#[utoipa::path(
    post,
    path = "/auth/verify",
    request_body = VerifyRequest,
    tag = "Auth",
    responses(
        (status = 200, body = TokenResponse),
        (status = 400, body = crate::error::ErrorBody),
        (status = 401, body = crate::error::ErrorBody)
    )
)]
pub async fn verify_signature(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let wallet = request.wallet.parse()?;
    nonce::verify_signature(&state.metadata, wallet, &request.signature)?;
    let token = state.sessions.issue(wallet)?;

    tracing::info!(wallet = %format_address(wallet), "Wallet signed in");
    Ok(Json(TokenResponse {
        message: "Authentication successful".to_string(),
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.sessions.ttl_secs(),
        wallet: wallet.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::api::test_util::*;
    use crate::state::test_support::test_state;
    use alloy::signers::{local::PrivateKeySigner, SignerSync};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn sign_in_issues_usable_token() {
        let (state, _dir) = test_state();
        let app = router(state.clone());
        let signer = PrivateKeySigner::random();
        let wallet = format_address(signer.address());

        let (status, body) =
            send_json(&app, get_request(&format!("/auth/nonce/{wallet}"), None)).await;
        assert_eq!(status, StatusCode::OK);
        let nonce = body["nonce"].as_str().unwrap().to_string();

        let signature = signer.sign_message_sync(nonce.as_bytes()).unwrap();
        let (status, body) = send_json(
            &app,
            post_json(
                "/auth/verify",
                None,
                json!({
                    "wallet": wallet,
                    "signature": alloy::hex::encode_prefixed(signature.as_bytes()),
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["wallet"], wallet);
        assert_eq!(body["expires_in"], 3600);

        let token = body["token"].as_str().unwrap();
        let authenticated = state.sessions.verify(token).unwrap();
        assert_eq!(authenticated.address, signer.address());
    }

    #[tokio::test]
    async fn wrong_signer_is_unauthorized() {
        let (state, _dir) = test_state();
        let app = router(state);
        let wallet = PrivateKeySigner::random();
        let attacker = PrivateKeySigner::random();
        let address = format_address(wallet.address());

        let (_, body) = send_json(&app, get_request(&format!("/auth/nonce/{address}"), None)).await;
        let nonce = body["nonce"].as_str().unwrap().to_string();
        let signature = attacker.sign_message_sync(nonce.as_bytes()).unwrap();

        let (status, body) = send_json(
            &app,
            post_json(
                "/auth/verify",
                None,
                json!({
                    "wallet": address,
                    "signature": alloy::hex::encode_prefixed(signature.as_bytes()),
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "signature_mismatch");
    }

    #[tokio::test]
    async fn malformed_wallet_is_bad_request() {
        let (state, _dir) = test_state();
        let app = router(state);
        let (status, body) = send_json(&app, get_request("/auth/nonce/not-a-wallet", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "validation_error");
    }
}
