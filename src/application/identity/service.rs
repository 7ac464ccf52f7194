//! User management service — application-layer orchestration
//!
//! All user-related business logic lives here.
//! HTTP handlers should be thin wrappers that delegate to this service.

use std::sync::Arc;

use tracing::info;

use crate::domain::{
    CreateUserDto, DomainError, DomainResult, GetUserDto, UpdateUserDto, User,
    UserRepositoryInterface,
};
use crate::infrastructure::crypto::jwt::{create_token, JwtConfig};
use crate::infrastructure::crypto::password::{hash_password, verify_password};
use crate::shared::PaginatedResult;

/// Authentication result returned after a successful login
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

/// User service — orchestrates all identity / user-management use-cases.
///
/// Generic over `R: UserRepositoryInterface` so it stays decoupled from
/// the concrete persistence layer.
pub struct UserService<R: UserRepositoryInterface> {
    repo: Arc<R>,
    jwt_config: JwtConfig,
}

impl<R: UserRepositoryInterface> UserService<R> {
    pub fn new(repo: Arc<R>, jwt_config: JwtConfig) -> Self {
        Self { repo, jwt_config }
    }

    // ── Authentication ──────────────────────────────────────────

    /// Authenticate user by username/email + password and return a JWT.
    pub async fn login(&self, username_or_email: &str, password: &str) -> DomainResult<AuthResult> {
        // Try username first, then email
        let user = self
            .repo
            .get_user_by_username(username_or_email)
            .await?
            .or(self.repo.get_user_by_email(username_or_email).await?);

        let Some(user) = user else {
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        };

        if !user.is_active {
            return Err(DomainError::Unauthorized("Account is disabled".into()));
        }

        let valid = verify_password(password, &user.password_hash).unwrap_or(false);
        if !valid {
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        }

        let token = create_token(&user.id, &user.username, user.role.as_str(), &self.jwt_config)
            .map_err(|e| DomainError::Validation(format!("Failed to create token: {}", e)))?;

        self.repo.touch_last_login(&user.id).await?;

        Ok(AuthResult {
            token,
            token_type: "Bearer".into(),
            expires_in: self.jwt_config.expiration_hours * 3600,
            user,
        })
    }

    // ── Registration ────────────────────────────────────────────

    /// Register a new renter account.
    ///
    /// The driver license is collected later, at the counter, so it is
    /// not part of registration.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        full_name: Option<String>,
        phone: Option<String>,
    ) -> DomainResult<User> {
        // Validation
        if username.len() < 3 || username.len() > 50 {
            return Err(DomainError::Validation(
                "Username must be 3-50 characters".into(),
            ));
        }
        if password.len() < 8 {
            return Err(DomainError::Validation(
                "Password must be at least 8 characters".into(),
            ));
        }
        if !email.contains('@') {
            return Err(DomainError::Validation("Invalid email address".into()));
        }

        // Check uniqueness
        if self.repo.get_user_by_username(username).await?.is_some() {
            return Err(DomainError::Conflict("Username already exists".into()));
        }
        if self.repo.get_user_by_email(email).await?.is_some() {
            return Err(DomainError::Conflict("Email already exists".into()));
        }

        let dto = CreateUserDto {
            username: username.to_string(),
            email: email.to_string(),
            role: None, // default Renter
            password: password.to_string(),
            full_name,
            phone,
            driver_license_no: None,
        };

        self.repo.create_user(dto).await?;

        // Fetch the newly created user
        let user = self
            .repo
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| {
                DomainError::Validation("User created but could not be retrieved".into())
            })?;

        info!(user_id = %user.id, username = %user.username, "New user registered");
        Ok(user)
    }

    /// Create a user with an explicit role (admin console operation).
    pub async fn create_user(&self, dto: CreateUserDto) -> DomainResult<User> {
        if self.repo.get_user_by_username(&dto.username).await?.is_some() {
            return Err(DomainError::Conflict("Username already exists".into()));
        }
        if self.repo.get_user_by_email(&dto.email).await?.is_some() {
            return Err(DomainError::Conflict("Email already exists".into()));
        }

        let username = dto.username.clone();
        self.repo.create_user(dto).await?;

        self.repo
            .get_user_by_username(&username)
            .await?
            .ok_or_else(|| {
                DomainError::Validation("User created but could not be retrieved".into())
            })
    }

    // ── Queries ─────────────────────────────────────────────────

    /// List users with search, filtering, sorting and pagination.
    pub async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        self.repo.list_users(dto).await
    }

    /// Get a single user by ID.
    pub async fn get_user_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        self.repo.get_user_by_id(id).await
    }

    /// Get user by username.
    pub async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        self.repo.get_user_by_username(username).await
    }

    /// Get user by email.
    pub async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        self.repo.get_user_by_email(email).await
    }

    // ── Commands (mutations) ────────────────────────────────────

    /// Update user profile fields (username, email, role, active flag).
    pub async fn update_user(&self, id: &str, dto: UpdateUserDto) -> DomainResult<Option<User>> {
        self.repo.update_user(id, dto).await
    }

    /// Change a user's password. Verifies the current password first.
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> DomainResult<()> {
        if new_password.len() < 8 {
            return Err(DomainError::Validation(
                "New password must be at least 8 characters".into(),
            ));
        }

        let user = self
            .repo
            .get_user_by_id(user_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "User",
                field: "id",
                value: user_id.to_string(),
            })?;

        let valid = verify_password(current_password, &user.password_hash).unwrap_or(false);
        if !valid {
            return Err(DomainError::Unauthorized("Invalid current password".into()));
        }

        let new_hash = hash_password(new_password)
            .map_err(|e| DomainError::Validation(format!("Failed to hash password: {}", e)))?;

        self.repo.update_user_password(user_id, &new_hash).await?;

        info!(user_id, "Password changed");
        Ok(())
    }

    /// Delete a user by ID.
    pub async fn delete_user(&self, id: &str) -> DomainResult<()> {
        self.repo.delete_user(id).await
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryUserRepository;

    fn service() -> (Arc<InMemoryUserRepository>, UserService<InMemoryUserRepository>) {
        let repo = Arc::new(InMemoryUserRepository::default());
        let service = UserService::new(repo.clone(), JwtConfig::new("test-secret", 1));
        (repo, service)
    }

    #[tokio::test]
    async fn register_then_login() {
        let (_, service) = service();
        let user = service
            .register(
                "ngthanh",
                "thanh@example.com",
                "rent-a-car-2026",
                Some("Nguyen Van Thanh".into()),
                Some("+84 90 123 4567".into()),
            )
            .await
            .unwrap();
        assert_eq!(user.role, crate::domain::UserRole::Renter);
        assert_eq!(user.full_name.as_deref(), Some("Nguyen Van Thanh"));
        assert!(user.driver_license_no.is_none());

        let auth = service.login("ngthanh", "rent-a-car-2026").await.unwrap();
        assert_eq!(auth.token_type, "Bearer");
        assert!(!auth.token.is_empty());
        assert!(auth.user.last_login_at.is_none()); // snapshot taken before the touch

        // Email works as the login identifier too
        let by_email = service
            .login("thanh@example.com", "rent-a-car-2026")
            .await
            .unwrap();
        assert_eq!(by_email.user.id, user.id);
        assert!(by_email.user.last_login_at.is_some());
    }

    #[tokio::test]
    async fn register_validates_inputs() {
        let (_, service) = service();

        let short_name = service.register("ab", "a@b.c", "long-enough-pw", None, None).await;
        assert!(matches!(short_name, Err(DomainError::Validation(_))));

        let short_pw = service.register("alice", "a@b.c", "short", None, None).await;
        assert!(matches!(short_pw, Err(DomainError::Validation(_))));

        let bad_email = service
            .register("alice", "not-an-email", "long-enough-pw", None, None)
            .await;
        assert!(matches!(bad_email, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let (_, service) = service();
        service
            .register("ngthanh", "thanh@example.com", "rent-a-car-2026", None, None)
            .await
            .unwrap();

        let again = service
            .register("ngthanh", "other@example.com", "rent-a-car-2026", None, None)
            .await;
        assert!(matches!(again, Err(DomainError::Conflict(_))));

        let same_email = service
            .register("other", "thanh@example.com", "rent-a-car-2026", None, None)
            .await;
        assert!(matches!(same_email, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let (_, service) = service();
        service
            .register("ngthanh", "thanh@example.com", "rent-a-car-2026", None, None)
            .await
            .unwrap();

        let result = service.login("ngthanh", "wrong-password").await;
        assert!(matches!(result, Err(DomainError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn disabled_account_cannot_login() {
        let (repo, service) = service();
        let user = service
            .register("ngthanh", "thanh@example.com", "rent-a-car-2026", None, None)
            .await
            .unwrap();

        repo.update_user(
            &user.id,
            UpdateUserDto {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let result = service.login("ngthanh", "rent-a-car-2026").await;
        assert!(matches!(result, Err(DomainError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn change_password_verifies_current() {
        let (_, service) = service();
        let user = service
            .register("ngthanh", "thanh@example.com", "rent-a-car-2026", None, None)
            .await
            .unwrap();

        let wrong = service
            .change_password(&user.id, "wrong-password", "brand-new-password")
            .await;
        assert!(matches!(wrong, Err(DomainError::Unauthorized(_))));

        service
            .change_password(&user.id, "rent-a-car-2026", "brand-new-password")
            .await
            .unwrap();

        assert!(service.login("ngthanh", "rent-a-car-2026").await.is_err());
        assert!(service.login("ngthanh", "brand-new-password").await.is_ok());
    }
}
