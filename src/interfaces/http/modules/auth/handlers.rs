//! Authentication API handlers
//!
//! Thin wrappers over `UserService`; no business logic lives here.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use super::dto::{ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, UserInfo};
use crate::application::identity::UserService;
use crate::infrastructure::database::SeaOrmUserRepository;
use crate::interfaces::http::common::{failure, ApiResponse, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

/// Auth state
#[derive(Clone)]
pub struct AuthHandlerState {
    pub user_service: Arc<UserService<SeaOrmUserRepository>>,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, (StatusCode, Json<ApiResponse<LoginResponse>>)> {
    let auth = state
        .user_service
        .login(&request.username, &request.password)
        .await
        .map_err(failure)?;

    let response = LoginResponse {
        token: auth.token,
        token_type: auth.token_type,
        expires_in: auth.expires_in,
        user: UserInfo::from(auth.user),
    };

    Ok(Json(ApiResponse::success(response)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserInfo>),
        (status = 422, description = "Validation error"),
        (status = 409, description = "User already exists")
    )
)]
pub async fn register(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserInfo>>), (StatusCode, Json<ApiResponse<UserInfo>>)> {
    let user = state
        .user_service
        .register(
            &request.username,
            &request.email,
            &request.password,
            request.full_name,
            request.phone,
        )
        .await
        .map_err(failure)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserInfo::from(user))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user info", body = ApiResponse<UserInfo>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_current_user(
    State(state): State<AuthHandlerState>,
    user: Option<axum::Extension<AuthenticatedUser>>,
) -> Result<Json<ApiResponse<UserInfo>>, (StatusCode, Json<ApiResponse<UserInfo>>)> {
    let Some(user) = user else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Not authenticated")),
        ));
    };

    let db_user = state
        .user_service
        .get_user_by_id(&user.user_id)
        .await
        .map_err(failure)?;

    let Some(db_user) = db_user else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("User not found")),
        ));
    };

    Ok(Json(ApiResponse::success(UserInfo::from(db_user))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 422, description = "New password too short"),
        (status = 401, description = "Invalid current password")
    )
)]
pub async fn change_password(
    State(state): State<AuthHandlerState>,
    user: Option<axum::Extension<AuthenticatedUser>>,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    let Some(user) = user else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Not authenticated")),
        ));
    };

    state
        .user_service
        .change_password(
            &user.user_id,
            &request.current_password,
            &request.new_password,
        )
        .await
        .map_err(failure)?;

    Ok(Json(ApiResponse::success(())))
}
