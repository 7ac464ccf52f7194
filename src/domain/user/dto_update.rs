use super::UserRole;

/// Partial update; absent fields stay as they are.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserDto {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub driver_license_no: Option<String>,
}
