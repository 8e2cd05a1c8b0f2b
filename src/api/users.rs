// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::acting_wallet;
use crate::{
    auth::Auth,
    error::ApiError,
    models::{format_address, RegisterRequest, RegistrationResponse, WalletAddress},
    service::ServiceError,
    state::AppState,
};

/// Register the session wallet with the user registry contract.
#[utoipa::path(
    post,
    path = "/users/register",
    request_body = RegisterRequest,
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, body = RegistrationResponse),
        (status = 401, body = crate::error::ErrorBody),
        (status = 409, description = "Already registered", body = crate::error::ErrorBody)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Auth(session): Auth,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    let address = acting_wallet(&session, &request.address)?;
    state
        .ledger
        .register_user(address)
        .await
        .map_err(ServiceError::from)?;

    tracing::info!(address = %format_address(address), "User registered");
    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse {
            address: address.into(),
            registered: true,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/users/{address}/registered",
    params(("address" = String, Path, description = "Wallet address")),
    tag = "Users",
    responses(
        (status = 200, body = RegistrationResponse),
        (status = 400, body = crate::error::ErrorBody)
    )
)]
pub async fn is_registered(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    let address = WalletAddress(address).parse()?;
    let registered = state
        .ledger
        .is_registered(address)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(RegistrationResponse {
        address: address.into(),
        registered,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::router;
    use crate::api::test_util::{get_request, post_json, send_json};
    use crate::models::format_address;
    use crate::state::test_support::test_state;
    use alloy::primitives::Address;
    use axum::http::StatusCode;
    use serde_json::json;

    const WALLET: Address = Address::repeat_byte(0x42);

    #[tokio::test]
    async fn register_then_lookup() {
        let (state, _dir) = test_state();
        let token = state.sessions.issue(WALLET).unwrap();
        let app = router(state);
        let lookup = format!("/users/{}/registered", format_address(WALLET));

        let (status, body) = send_json(&app, get_request(&lookup, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["registered"], false);

        let (status, body) = send_json(
            &app,
            post_json(
                "/users/register",
                Some(&token),
                json!({"address": format_address(WALLET)}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["registered"], true);

        let (_, body) = send_json(&app, get_request(&lookup, None)).await;
        assert_eq!(body["registered"], true);
    }

    #[tokio::test]
    async fn second_registration_conflicts() {
        let (state, _dir) = test_state();
        let token = state.sessions.issue(WALLET).unwrap();
        let app = router(state);
        let body = json!({"address": format_address(WALLET)});

        let (status, _) =
            send_json(&app, post_json("/users/register", Some(&token), body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) =
            send_json(&app, post_json("/users/register", Some(&token), body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error_code"], "already_registered");
    }

    #[tokio::test]
    async fn cannot_register_another_wallet() {
        let (state, _dir) = test_state();
        let token = state.sessions.issue(WALLET).unwrap();
        let app = router(state);

        let (status, _) = send_json(
            &app,
            post_json(
                "/users/register",
                Some(&token),
                json!({"address": format_address(Address::repeat_byte(0x43))}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_address_is_rejected() {
        let (state, _dir) = test_state();
        let app = router(state);
        let (status, _) = send_json(&app, get_request("/users/0x1234/registered", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
