//! Vehicle API handlers
//!
//! Fleet CRUD backed directly by the vehicle repository. Browsing is
//! open to any authenticated user; mutations are operator-only.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use super::dto::{
    ChangeVehicleStatusRequest, CreateVehicleRequest, ListVehiclesParams, UpdateVehicleRequest,
    VehicleDto,
};
use crate::domain::{RepositoryProvider, Vehicle, VehicleStatus};
use crate::interfaces::http::common::{failure, ApiResponse, PageQuery, PaginatedResponse, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

/// Vehicle handler state
#[derive(Clone)]
pub struct VehicleHandlerState {
    pub repos: Arc<dyn RepositoryProvider>,
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

/// Strict status parse; unknown strings are a client error, not a guess.
fn parse_status<T>(s: &str) -> Result<VehicleStatus, (StatusCode, Json<ApiResponse<T>>)> {
    match s {
        "Available" => Ok(VehicleStatus::Available),
        "Rented" => Ok(VehicleStatus::Rented),
        "Maintenance" => Ok(VehicleStatus::Maintenance),
        "Retired" => Ok(VehicleStatus::Retired),
        other => Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!(
                "Unknown vehicle status '{}'",
                other
            ))),
        )),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles",
    tag = "Vehicles",
    security(("bearer_auth" = [])),
    params(ListVehiclesParams),
    responses(
        (status = 200, description = "Vehicle list", body = PaginatedResponse<VehicleDto>)
    )
)]
pub async fn list_vehicles(
    State(state): State<VehicleHandlerState>,
    Query(params): Query<ListVehiclesParams>,
) -> Result<Json<PaginatedResponse<VehicleDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    let status = match params.status.as_deref() {
        Some(s) => Some(parse_status(s)?),
        None => None,
    };
    let pagination = PageQuery {
        page: params.page,
        limit: params.limit,
    }
    .into_params();

    let result = state
        .repos
        .vehicles()
        .list(status, pagination)
        .await
        .map_err(failure)?;

    Ok(Json(PaginatedResponse::from_result(result, VehicleDto::from)))
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles/{id}",
    tag = "Vehicles",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Vehicle details", body = ApiResponse<VehicleDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_vehicle(
    State(state): State<VehicleHandlerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VehicleDto>>, (StatusCode, Json<ApiResponse<VehicleDto>>)> {
    let vehicle = state
        .repos
        .vehicles()
        .find_by_id(id)
        .await
        .map_err(failure)?;

    match vehicle {
        Some(v) => Ok(Json(ApiResponse::success(VehicleDto::from(v)))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Vehicle '{}' not found", id))),
        )),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/vehicles",
    tag = "Vehicles",
    security(("bearer_auth" = [])),
    request_body = CreateVehicleRequest,
    responses(
        (status = 201, description = "Vehicle registered", body = ApiResponse<VehicleDto>),
        (status = 409, description = "License plate already registered"),
        (status = 403, description = "Not staff")
    )
)]
pub async fn create_vehicle(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<VehicleDto>>), (StatusCode, Json<ApiResponse<VehicleDto>>)>
{
    operator_only(&user)?;

    let mut vehicle = Vehicle::new(
        request.license_plate,
        request.brand,
        request.model,
        request.year,
        request.color,
        request.hourly_rate,
        request.daily_rate,
    );
    vehicle.image_url = request.image_url;

    state
        .repos
        .vehicles()
        .save(vehicle.clone())
        .await
        .map_err(failure)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(VehicleDto::from(vehicle))),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/vehicles/{id}",
    tag = "Vehicles",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    request_body = UpdateVehicleRequest,
    responses(
        (status = 200, description = "Vehicle updated", body = ApiResponse<VehicleDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_vehicle(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateVehicleRequest>,
) -> Result<Json<ApiResponse<VehicleDto>>, (StatusCode, Json<ApiResponse<VehicleDto>>)> {
    operator_only(&user)?;

    let Some(mut vehicle) = state
        .repos
        .vehicles()
        .find_by_id(id)
        .await
        .map_err(failure)?
    else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Vehicle '{}' not found", id))),
        ));
    };

    if let Some(brand) = request.brand {
        vehicle.brand = brand;
    }
    if let Some(model) = request.model {
        vehicle.model = model;
    }
    if let Some(year) = request.year {
        vehicle.year = year;
    }
    if let Some(color) = request.color {
        vehicle.color = color;
    }
    if let Some(hourly_rate) = request.hourly_rate {
        vehicle.hourly_rate = hourly_rate;
    }
    if let Some(daily_rate) = request.daily_rate {
        vehicle.daily_rate = daily_rate;
    }
    if request.image_url.is_some() {
        vehicle.image_url = request.image_url;
    }

    state
        .repos
        .vehicles()
        .update(vehicle.clone())
        .await
        .map_err(failure)?;

    Ok(Json(ApiResponse::success(VehicleDto::from(vehicle))))
}

#[utoipa::path(
    put,
    path = "/api/v1/vehicles/{id}/status",
    tag = "Vehicles",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    request_body = ChangeVehicleStatusRequest,
    responses(
        (status = 200, description = "Status changed"),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Not found")
    )
)]
pub async fn change_vehicle_status(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeVehicleStatusRequest>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    operator_only(&user)?;
    let status = parse_status(&request.status)?;

    state
        .repos
        .vehicles()
        .update_status(id, status)
        .await
        .map_err(failure)?;

    Ok(Json(ApiResponse::success(())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/vehicles/{id}",
    tag = "Vehicles",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Vehicle removed"),
        (status = 409, description = "Vehicle is currently rented"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn delete_vehicle(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    if !user.is_admin() {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Admin access required")),
        ));
    }

    let vehicle = state
        .repos
        .vehicles()
        .find_by_id(id)
        .await
        .map_err(failure)?;
    if let Some(v) = vehicle {
        if v.status == VehicleStatus::Rented {
            return Err((
                StatusCode::CONFLICT,
                Json(ApiResponse::error("Vehicle is currently rented")),
            ));
        }
    }

    state.repos.vehicles().delete(id).await.map_err(failure)?;
    Ok(Json(ApiResponse::success(())))
}
