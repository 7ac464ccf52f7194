//! Booking API handlers
//!
//! Every endpoint is a thin wrapper over `BookingLifecycleService`.
//! Renters act on their own bookings; staff and admins act on any.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use super::dto::{
    BookingCreatedResponse, BookingDto, CancelBookingRequest, CancelIncidentRequest,
    CheckInRequest, CheckOutRequest, ContractSummaryDto, CreateBookingRequest,
    ListBookingsParams, OpenPaymentRequest, PaymentDto, ReissuedContractResponse,
};
use crate::application::services::BookingLifecycleService;
use crate::domain::{BookingStatus, PaymentType};
use crate::interfaces::http::common::{failure, ApiResponse, PageQuery, PaginatedResponse, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

/// Booking handler state
#[derive(Clone)]
pub struct BookingHandlerState {
    pub lifecycle: Arc<BookingLifecycleService>,
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

/// Renter-scoping argument for the lifecycle service: operators see
/// every booking, renters only their own.
fn scope(user: &AuthenticatedUser) -> Option<&str> {
    if user.is_operator() {
        None
    } else {
        Some(user.user_id.as_str())
    }
}

fn parse_booking_status<T>(
    s: &str,
) -> Result<BookingStatus, (StatusCode, Json<ApiResponse<T>>)> {
    let status = match s {
        "Pending" => BookingStatus::Pending,
        "ContractPending" => BookingStatus::ContractPending,
        "ContractSigned" => BookingStatus::ContractSigned,
        "DepositPaid" => BookingStatus::DepositPaid,
        "CheckedIn" => BookingStatus::CheckedIn,
        "CheckedOut" => BookingStatus::CheckedOut,
        "ExtraPaymentPending" => BookingStatus::ExtraPaymentPending,
        "RefundPending" => BookingStatus::RefundPending,
        "Completed" => BookingStatus::Completed,
        "Cancelled" => BookingStatus::Cancelled,
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(format!(
                    "Unknown booking status '{}'",
                    other
                ))),
            ))
        }
    };
    Ok(status)
}

fn parse_payment_type<T>(s: &str) -> Result<PaymentType, (StatusCode, Json<ApiResponse<T>>)> {
    let payment_type = match s {
        "Deposit" => PaymentType::Deposit,
        "Rental" => PaymentType::Rental,
        "Extra" => PaymentType::Extra,
        "Refund" => PaymentType::Refund,
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(format!(
                    "Unknown payment type '{}'",
                    other
                ))),
            ))
        }
    };
    Ok(payment_type)
}

// ── Creation and listing ────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created, contract issued", body = ApiResponse<BookingCreatedResponse>),
        (status = 400, description = "Invalid rental window"),
        (status = 409, description = "Vehicle unavailable or window taken")
    )
)]
pub async fn create_booking(
    State(state): State<BookingHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateBookingRequest>,
) -> Result<
    (StatusCode, Json<ApiResponse<BookingCreatedResponse>>),
    (StatusCode, Json<ApiResponse<BookingCreatedResponse>>),
> {
    let created = state
        .lifecycle
        .create_booking(
            &user.user_id,
            request.vehicle_id,
            request.pickup_station_id,
            request.start_time,
            request.end_time,
        )
        .await
        .map_err(failure)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(BookingCreatedResponse::from(created))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(ListBookingsParams),
    responses(
        (status = 200, description = "Booking list", body = PaginatedResponse<BookingDto>)
    )
)]
pub async fn list_bookings(
    State(state): State<BookingHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<ListBookingsParams>,
) -> Result<Json<PaginatedResponse<BookingDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    let pagination = PageQuery {
        page: params.page,
        limit: params.limit,
    }
    .into_params();

    let result = if user.is_operator() {
        let status = match params.status.as_deref() {
            Some(s) => Some(parse_booking_status(s)?),
            None => None,
        };
        state
            .lifecycle
            .list_bookings(status, pagination)
            .await
            .map_err(failure)?
    } else {
        state
            .lifecycle
            .bookings_for(&user.user_id, pagination)
            .await
            .map_err(failure)?
    };

    Ok(Json(PaginatedResponse::from_result(result, BookingDto::from)))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking details", body = ApiResponse<BookingDto>),
        (status = 403, description = "Someone else's booking"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_booking(
    State(state): State<BookingHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingDto>>, (StatusCode, Json<ApiResponse<BookingDto>>)> {
    let booking = state
        .lifecycle
        .get_booking(id, scope(&user))
        .await
        .map_err(failure)?;

    Ok(Json(ApiResponse::success(BookingDto::from(booking))))
}

// ── Payments ────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}/payments",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Payment ledger for the booking", body = ApiResponse<Vec<PaymentDto>>),
        (status = 404, description = "Not found")
    )
)]
pub async fn list_payments(
    State(state): State<BookingHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<PaymentDto>>>, (StatusCode, Json<ApiResponse<Vec<PaymentDto>>>)>
{
    let payments = state
        .lifecycle
        .payments_for(id, scope(&user))
        .await
        .map_err(failure)?;

    let dtos: Vec<PaymentDto> = payments.into_iter().map(PaymentDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/payments",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = OpenPaymentRequest,
    responses(
        (status = 200, description = "Payment with a live checkout link", body = ApiResponse<PaymentDto>),
        (status = 400, description = "Refunds cannot be collected"),
        (status = 409, description = "Booking takes no further payments")
    )
)]
pub async fn open_payment(
    State(state): State<BookingHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<OpenPaymentRequest>,
) -> Result<Json<ApiResponse<PaymentDto>>, (StatusCode, Json<ApiResponse<PaymentDto>>)> {
    let payment_type = parse_payment_type(&request.payment_type)?;

    let payment = state
        .lifecycle
        .open_payment(id, payment_type, scope(&user))
        .await
        .map_err(failure)?;

    Ok(Json(ApiResponse::success(PaymentDto::from(payment))))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/payments/sync",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Payments confirmed by the gateway on this pass", body = ApiResponse<Vec<PaymentDto>>),
        (status = 502, description = "Gateway unreachable")
    )
)]
pub async fn sync_payments(
    State(state): State<BookingHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<PaymentDto>>>, (StatusCode, Json<ApiResponse<Vec<PaymentDto>>>)>
{
    // Ownership gate before touching the gateway
    state
        .lifecycle
        .get_booking(id, scope(&user))
        .await
        .map_err(failure)?;

    let confirmed = state.lifecycle.sync_payments(id).await.map_err(failure)?;

    let dtos: Vec<PaymentDto> = confirmed.into_iter().map(PaymentDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

// ── Contract link ───────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/contract/reissue",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Fresh signing link issued", body = ApiResponse<ReissuedContractResponse>),
        (status = 409, description = "Booking already past signature")
    )
)]
pub async fn reissue_contract(
    State(state): State<BookingHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<
    Json<ApiResponse<ReissuedContractResponse>>,
    (StatusCode, Json<ApiResponse<ReissuedContractResponse>>),
> {
    state
        .lifecycle
        .get_booking(id, scope(&user))
        .await
        .map_err(failure)?;

    let (contract, token) = state.lifecycle.reissue_contract(id).await.map_err(failure)?;

    Ok(Json(ApiResponse::success(ReissuedContractResponse {
        contract: ContractSummaryDto::from(&contract),
        signing_token: token,
    })))
}

// ── Counter operations ──────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/check-in",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = CheckInRequest,
    responses(
        (status = 200, description = "Vehicle handed over", body = ApiResponse<BookingDto>),
        (status = 400, description = "Outside the check-in window"),
        (status = 409, description = "Deposit not paid"),
        (status = 403, description = "Not staff")
    )
)]
pub async fn check_in(
    State(state): State<BookingHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CheckInRequest>,
) -> Result<Json<ApiResponse<BookingDto>>, (StatusCode, Json<ApiResponse<BookingDto>>)> {
    operator_only(&user)?;

    let booking = state
        .lifecycle
        .check_in(id, &user.user_id, request.note, request.photo_url)
        .await
        .map_err(failure)?;

    Ok(Json(ApiResponse::success(BookingDto::from(booking))))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/check-out",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = CheckOutRequest,
    responses(
        (status = 200, description = "Vehicle returned and settlement recorded", body = ApiResponse<BookingDto>),
        (status = 409, description = "Not checked in"),
        (status = 403, description = "Not staff")
    )
)]
pub async fn check_out(
    State(state): State<BookingHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CheckOutRequest>,
) -> Result<Json<ApiResponse<BookingDto>>, (StatusCode, Json<ApiResponse<BookingDto>>)> {
    operator_only(&user)?;

    let booking = state
        .lifecycle
        .check_out(
            id,
            &user.user_id,
            request.note,
            request.photo_url,
            request.return_station_id,
            request.damage_fee,
        )
        .await
        .map_err(failure)?;

    Ok(Json(ApiResponse::success(BookingDto::from(booking))))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/cancel",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = CancelBookingRequest,
    responses(
        (status = 200, description = "Booking cancelled", body = ApiResponse<BookingDto>),
        (status = 409, description = "Too late to cancel")
    )
)]
pub async fn cancel_booking(
    State(state): State<BookingHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CancelBookingRequest>,
) -> Result<Json<ApiResponse<BookingDto>>, (StatusCode, Json<ApiResponse<BookingDto>>)> {
    let booking = state
        .lifecycle
        .cancel(id, scope(&user), &request.reason)
        .await
        .map_err(failure)?;

    Ok(Json(ApiResponse::success(BookingDto::from(booking))))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/cancel-incident",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = CancelIncidentRequest,
    responses(
        (status = 200, description = "Booking cancelled, deposit refund pending", body = ApiResponse<BookingDto>),
        (status = 409, description = "Booking already closed out"),
        (status = 403, description = "Not staff")
    )
)]
pub async fn cancel_incident(
    State(state): State<BookingHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CancelIncidentRequest>,
) -> Result<Json<ApiResponse<BookingDto>>, (StatusCode, Json<ApiResponse<BookingDto>>)> {
    operator_only(&user)?;

    let reason = request
        .reason
        .as_deref()
        .unwrap_or("Cancelled due to incident");
    let booking = state
        .lifecycle
        .cancel_incident(id, &user.user_id, reason)
        .await
        .map_err(failure)?;

    Ok(Json(ApiResponse::success(BookingDto::from(booking))))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/confirm-refund",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Refund payout confirmed, booking closed", body = ApiResponse<BookingDto>),
        (status = 409, description = "No refund pending"),
        (status = 403, description = "Not staff")
    )
)]
pub async fn confirm_refund(
    State(state): State<BookingHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingDto>>, (StatusCode, Json<ApiResponse<BookingDto>>)> {
    operator_only(&user)?;

    let booking = state
        .lifecycle
        .confirm_refund(id, &user.user_id)
        .await
        .map_err(failure)?;

    Ok(Json(ApiResponse::success(BookingDto::from(booking))))
}
