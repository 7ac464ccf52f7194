use super::UserRole;

#[derive(Debug, Clone)]
pub struct GetUserDto {
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub sort_by: Option<String>,
}
