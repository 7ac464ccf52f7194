use super::UserRole;

/// Input for account creation, from self-registration or the admin console.
#[derive(Debug, Clone)]
pub struct CreateUserDto {
    pub username: String,
    pub email: String,
    /// None means the default role (renter)
    pub role: Option<UserRole>,
    pub password: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub driver_license_no: Option<String>,
}
