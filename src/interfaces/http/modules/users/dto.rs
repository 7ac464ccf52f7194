//! User DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::User;

/// User API representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_license_no: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role.as_str().to_string(),
            full_name: u.full_name,
            phone: u.phone,
            driver_license_no: u.driver_license_no,
            is_active: u.is_active,
            created_at: u.created_at,
            updated_at: u.updated_at,
            last_login_at: u.last_login_at,
        }
    }
}

/// Create user request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// admin, staff or renter
    #[serde(default = "default_role")]
    pub role: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub driver_license_no: Option<String>,
}

fn default_role() -> String {
    "renter".to_string()
}

/// Update user request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub driver_license_no: Option<String>,
    pub is_active: Option<bool>,
}

/// List users query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersParams {
    /// Search by username or email
    pub search: Option<String>,
    /// Filter by role (admin, staff, renter)
    pub role: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Sort field (username, email, role, created_at)
    pub sort_by: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_page_size() -> u64 {
    20
}
