//! Authentication middleware for Axum

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::infrastructure::crypto::jwt::{verify_token, JwtConfig, TokenClaims};

/// Authentication error types
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    ExpiredToken,
    InsufficientPermissions,
}

/// Authentication state carried by protected routers
#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
}

/// Authenticated user extracted from a verified JWT
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub username: String,
    pub role: String,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    /// Staff and admins run the counter operations (check-in, check-out,
    /// refund confirmation, fleet management).
    pub fn is_operator(&self) -> bool {
        self.role == "admin" || self.role == "staff"
    }
}

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// JWT authentication middleware
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(String::from);
    let Some(auth_header) = auth_header else {
        return auth_error_response(AuthError::MissingToken);
    };

    let Some(token) = extract_token(&auth_header) else {
        return auth_error_response(AuthError::InvalidToken);
    };

    match verify_token(token, &auth_state.jwt_config) {
        Ok(claims) => {
            if claims.is_expired() {
                return auth_error_response(AuthError::ExpiredToken);
            }
            let user = AuthenticatedUser::from_claims(claims);
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(_) => auth_error_response(AuthError::InvalidToken),
    }
}

pub fn auth_error_response(error: AuthError) -> Response {
    let (status, message) = match error {
        AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing authentication token"),
        AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid authentication token"),
        AuthError::ExpiredToken => (StatusCode::UNAUTHORIZED, "Token has expired"),
        AuthError::InsufficientPermissions => (StatusCode::FORBIDDEN, "Insufficient permissions"),
    };

    let body = Json(json!({
        "success": false,
        "error": message
    }));

    (status, body).into_response()
}
