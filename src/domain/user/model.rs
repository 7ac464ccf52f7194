//! User domain entity

use chrono::{DateTime, Utc};

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    /// Full administration, including user management
    Admin,
    /// Counter staff: check-in/out, refunds, fleet upkeep
    Staff,
    /// Customer renting vehicles
    Renter,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Renter
    }
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Renter => "renter",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => Self::Admin,
            "staff" => Self::Staff,
            _ => Self::Renter,
        }
    }

    /// Staff and admins act on any booking; renters only on their own.
    pub fn is_operator(&self) -> bool {
        matches!(self, Self::Admin | Self::Staff)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User model
#[derive(Clone, Debug)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    /// Legal name as it appears on rental contracts
    pub full_name: Option<String>,
    pub phone: Option<String>,
    /// Presented at pickup; staff verify it against the physical license
    pub driver_license_no: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Name used on contracts and in notifications: the legal name when
    /// the profile has one, the username otherwise.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_roundtrip() {
        for r in [UserRole::Admin, UserRole::Staff, UserRole::Renter] {
            assert_eq!(UserRole::from_str(r.as_str()), r);
        }
    }

    #[test]
    fn unknown_role_defaults_to_renter() {
        assert_eq!(UserRole::from_str("superuser"), UserRole::Renter);
        assert_eq!(UserRole::default(), UserRole::Renter);
    }

    #[test]
    fn operators_are_staff_and_admin() {
        assert!(UserRole::Admin.is_operator());
        assert!(UserRole::Staff.is_operator());
        assert!(!UserRole::Renter.is_operator());
    }

    #[test]
    fn display_name_prefers_legal_name() {
        let mut user = User {
            id: "u-1".into(),
            username: "ngthanh".into(),
            email: "thanh@example.com".into(),
            password_hash: String::new(),
            role: UserRole::Renter,
            full_name: Some("Nguyen Van Thanh".into()),
            phone: None,
            driver_license_no: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        };
        assert_eq!(user.display_name(), "Nguyen Van Thanh");

        user.full_name = Some("   ".into());
        assert_eq!(user.display_name(), "ngthanh");

        user.full_name = None;
        assert_eq!(user.display_name(), "ngthanh");
    }
}
