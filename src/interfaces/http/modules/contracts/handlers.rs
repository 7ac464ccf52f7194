//! Contract API handlers
//!
//! The view/sign pair is anonymous: possession of the single-use token
//! IS the authorization. Everything else requires a staff JWT.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use uuid::Uuid;

use super::dto::{ContractDto, ContractViewResponse};
use crate::application::services::{BookingLifecycleService, ContractGateService};
use crate::interfaces::http::common::{failure, ApiResponse};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::interfaces::http::modules::bookings::SignedContractResponse;

/// Contract handler state
#[derive(Clone)]
pub struct ContractHandlerState {
    pub lifecycle: Arc<BookingLifecycleService>,
    pub contracts: Arc<ContractGateService>,
}

fn operator_only<T>(user: &AuthenticatedUser) -> Result<(), (StatusCode, Json<ApiResponse<T>>)> {
    if user.is_operator() {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Staff access required")),
        ))
    }
}

/// Signer address for the signature record: the first hop of
/// `X-Forwarded-For` when a proxy fills it, the socket peer otherwise.
fn client_ip(headers: &HeaderMap, addr: &SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| addr.ip().to_string())
}

// ── Anonymous signing gate ──────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/contracts/view/{token}",
    tag = "Contracts",
    params(("token" = String, Path, description = "Signing token from the contract link")),
    responses(
        (status = 200, description = "Contract text for review", body = ApiResponse<ContractViewResponse>),
        (status = 404, description = "Token invalid or already used"),
        (status = 410, description = "Link expired")
    )
)]
pub async fn view_contract(
    State(state): State<ContractHandlerState>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<ContractViewResponse>>, (StatusCode, Json<ApiResponse<ContractViewResponse>>)>
{
    let contract = state.contracts.view_by_token(&token).await.map_err(failure)?;
    Ok(Json(ApiResponse::success(ContractViewResponse::from(
        contract,
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/contracts/sign/{token}",
    tag = "Contracts",
    params(("token" = String, Path, description = "Signing token from the contract link")),
    responses(
        (status = 200, description = "Contract signed, deposit checkout opened", body = ApiResponse<SignedContractResponse>),
        (status = 404, description = "Token invalid or already used"),
        (status = 410, description = "Link expired"),
        (status = 409, description = "Booking can no longer be signed")
    )
)]
pub async fn sign_contract(
    State(state): State<ContractHandlerState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<SignedContractResponse>>, (StatusCode, Json<ApiResponse<SignedContractResponse>>)>
{
    let ip = client_ip(&headers, &addr);
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let outcome = state
        .lifecycle
        .sign_contract(&token, Some(ip), user_agent)
        .await
        .map_err(failure)?;

    Ok(Json(ApiResponse::success(SignedContractResponse::from(
        outcome,
    ))))
}

// ── Staff views ─────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/contracts/{id}",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract ID")),
    responses(
        (status = 200, description = "Contract record", body = ApiResponse<ContractDto>),
        (status = 404, description = "Not found"),
        (status = 403, description = "Not staff")
    )
)]
pub async fn get_contract(
    State(state): State<ContractHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ContractDto>>, (StatusCode, Json<ApiResponse<ContractDto>>)> {
    operator_only(&user)?;

    let contract = state.contracts.get(id).await.map_err(failure)?;
    match contract {
        Some(c) => Ok(Json(ApiResponse::success(ContractDto::from(c)))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Contract '{}' not found", id))),
        )),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/contracts/by-booking/{booking_id}",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    params(("booking_id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Latest contract for the booking", body = ApiResponse<ContractDto>),
        (status = 404, description = "No contract issued")
    )
)]
pub async fn get_contract_by_booking(
    State(state): State<ContractHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ContractDto>>, (StatusCode, Json<ApiResponse<ContractDto>>)> {
    // Renters may read the contract of their own booking
    let requested_by = if user.is_operator() {
        None
    } else {
        Some(user.user_id.as_str())
    };
    state
        .lifecycle
        .get_booking(booking_id, requested_by)
        .await
        .map_err(failure)?;

    let contract = state
        .contracts
        .get_by_booking(booking_id)
        .await
        .map_err(failure)?;

    match contract {
        Some(c) => Ok(Json(ApiResponse::success(ContractDto::from(c)))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!(
                "No contract for booking '{}'",
                booking_id
            ))),
        )),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/contracts/{id}/revoke",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract ID")),
    responses(
        (status = 200, description = "Contract revoked"),
        (status = 409, description = "Already signed"),
        (status = 403, description = "Not staff")
    )
)]
pub async fn revoke_contract(
    State(state): State<ContractHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    operator_only(&user)?;

    state.contracts.revoke(id).await.map_err(failure)?;
    Ok(Json(ApiResponse::success(())))
}
