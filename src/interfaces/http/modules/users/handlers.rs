//! User management API handlers
//!
//! Admin-only CRUD endpoints for managing users.
//! Delegates to `UserService` from the application/identity layer.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{CreateUserRequest, ListUsersParams, UpdateUserRequest, UserDto};
use crate::application::identity::UserService;
use crate::domain::{CreateUserDto, GetUserDto, UpdateUserDto, UserRole};
use crate::infrastructure::database::SeaOrmUserRepository;
use crate::interfaces::http::common::{failure, ApiResponse, PaginatedResponse};
use crate::interfaces::http::middleware::AuthenticatedUser;

/// User handler state — concrete over `SeaOrmUserRepository` for Axum
/// compatibility.
#[derive(Clone)]
pub struct UserHandlerState {
    pub user_service: Arc<UserService<SeaOrmUserRepository>>,
}

fn admin_only<T>(user: &AuthenticatedUser) -> Result<(), (StatusCode, Json<ApiResponse<T>>)> {
    if user.is_admin() {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Admin access required")),
        ))
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(ListUsersParams),
    responses(
        (status = 200, description = "User list", body = PaginatedResponse<UserDto>),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_users(
    State(state): State<UserHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<PaginatedResponse<UserDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    admin_only(&user)?;

    let dto = GetUserDto {
        search: params.search,
        role: params.role.as_deref().map(UserRole::from_str),
        page: Some(params.page),
        page_size: Some(params.page_size),
        sort_by: params.sort_by,
    };

    let result = state.user_service.list_users(dto).await.map_err(failure)?;
    Ok(Json(PaginatedResponse::from_result(result, UserDto::from)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = ApiResponse<UserDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_user(
    State(state): State<UserHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserDto>>, (StatusCode, Json<ApiResponse<UserDto>>)> {
    admin_only(&user)?;

    match state.user_service.get_user_by_id(&id).await {
        Ok(Some(found)) => Ok(Json(ApiResponse::success(UserDto::from(found)))),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("User '{}' not found", id))),
        )),
        Err(e) => Err(failure(e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserDto>),
        (status = 409, description = "Already exists"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn create_user(
    State(state): State<UserHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), (StatusCode, Json<ApiResponse<UserDto>>)> {
    admin_only(&user)?;

    let dto = CreateUserDto {
        username: request.username,
        email: request.email,
        role: Some(UserRole::from_str(&request.role)),
        password: request.password,
        full_name: request.full_name,
        phone: request.phone,
        driver_license_no: request.driver_license_no,
    };

    let created = state.user_service.create_user(dto).await.map_err(failure)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserDto::from(created))),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_user(
    State(state): State<UserHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, (StatusCode, Json<ApiResponse<UserDto>>)> {
    admin_only(&user)?;

    let dto = UpdateUserDto {
        username: request.username,
        email: request.email,
        role: request.role.as_deref().map(UserRole::from_str),
        full_name: request.full_name,
        phone: request.phone,
        driver_license_no: request.driver_license_no,
        is_active: request.is_active,
    };

    match state.user_service.update_user(&id, dto).await {
        Ok(Some(updated)) => Ok(Json(ApiResponse::success(UserDto::from(updated)))),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("User '{}' not found", id))),
        )),
        Err(e) => Err(failure(e)),
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_user(
    State(state): State<UserHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    admin_only(&user)?;

    if user.user_id == id {
        return Err((
            StatusCode::CONFLICT,
            Json(ApiResponse::error("Cannot delete your own account")),
        ));
    }

    state.user_service.delete_user(&id).await.map_err(failure)?;
    Ok(Json(ApiResponse::success(())))
}
