use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::domain::user::{
    CreateUserDto, GetUserDto, UpdateUserDto, User, UserRepositoryInterface, UserRole,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::user;
use crate::shared::PaginatedResult;

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn entity_role_to_domain(role: user::UserRole) -> UserRole {
    match role {
        user::UserRole::Admin => UserRole::Admin,
        user::UserRole::Staff => UserRole::Staff,
        user::UserRole::Renter => UserRole::Renter,
    }
}

fn domain_role_to_entity(role: &UserRole) -> user::UserRole {
    match role {
        UserRole::Admin => user::UserRole::Admin,
        UserRole::Staff => user::UserRole::Staff,
        UserRole::Renter => user::UserRole::Renter,
    }
}

fn user_model_to_domain(model: user::Model) -> User {
    User {
        id: model.id,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        role: entity_role_to_domain(model.role),
        full_name: model.full_name,
        phone: model.phone,
        driver_license_no: model.driver_license_no,
        is_active: model.is_active,
        created_at: model.created_at,
        updated_at: model.updated_at,
        last_login_at: model.last_login_at,
    }
}

fn unique_violation(e: sea_orm::DbErr) -> DomainError {
    if e.to_string().contains("UNIQUE") || e.to_string().contains("duplicate") {
        DomainError::Conflict("Username or email already exists".to_string())
    } else {
        e.into()
    }
}

// ── Repository implementation ───────────────────────────────────

#[async_trait]
impl UserRepositoryInterface for SeaOrmUserRepository {
    async fn create_user(&self, dto: CreateUserDto) -> DomainResult<()> {
        use crate::infrastructure::crypto::password::hash_password;

        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();

        let password_hash = hash_password(&dto.password)
            .map_err(|e| DomainError::Validation(format!("Failed to hash password: {}", e)))?;

        let role = dto
            .role
            .as_ref()
            .map_or(user::UserRole::Renter, domain_role_to_entity);

        let new_user = user::ActiveModel {
            id: Set(id),
            username: Set(dto.username),
            email: Set(dto.email),
            password_hash: Set(password_hash),
            role: Set(role),
            full_name: Set(dto.full_name),
            phone: Set(dto.phone),
            driver_license_no: Set(dto.driver_license_no),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            last_login_at: Set(None),
        };

        new_user.insert(&self.db).await.map_err(unique_violation)?;
        Ok(())
    }

    async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        let page = dto.page.unwrap_or(1).max(1);
        let page_size = dto.page_size.unwrap_or(20).clamp(1, 100);

        let mut query = user::Entity::find();

        // Search matches username or email
        if let Some(ref search) = dto.search {
            query = query.filter(
                user::Column::Username
                    .contains(search)
                    .or(user::Column::Email.contains(search)),
            );
        }

        if let Some(ref role) = dto.role {
            query = query.filter(user::Column::Role.eq(domain_role_to_entity(role)));
        }

        match dto.sort_by.as_deref() {
            Some("username") => {
                query = query.order_by_asc(user::Column::Username);
            }
            Some("email") => {
                query = query.order_by_asc(user::Column::Email);
            }
            Some("role") => {
                query = query.order_by_asc(user::Column::Role);
            }
            _ => {
                query = query.order_by_desc(user::Column::CreatedAt);
            }
        }

        let total = query.clone().count(&self.db).await?;

        let offset = (page - 1) * page_size;
        let models = query.offset(offset).limit(page_size).all(&self.db).await?;

        let items: Vec<User> = models.into_iter().map(user_model_to_domain).collect();

        Ok(PaginatedResult::new(items, total, page, page_size))
    }

    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?;
        Ok(model.map(user_model_to_domain))
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(model.map(user_model_to_domain))
    }

    async fn get_user_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(user_model_to_domain))
    }

    async fn update_user(&self, id: &str, dto: UpdateUserDto) -> DomainResult<Option<User>> {
        let existing = user::Entity::find_by_id(id).one(&self.db).await?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        let mut active: user::ActiveModel = existing.into();

        if let Some(username) = dto.username {
            active.username = Set(username);
        }
        if let Some(email) = dto.email {
            active.email = Set(email);
        }
        if let Some(ref role) = dto.role {
            active.role = Set(domain_role_to_entity(role));
        }
        if let Some(is_active) = dto.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(full_name) = dto.full_name {
            active.full_name = Set(Some(full_name));
        }
        if let Some(phone) = dto.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(driver_license_no) = dto.driver_license_no {
            active.driver_license_no = Set(Some(driver_license_no));
        }

        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await.map_err(unique_violation)?;
        Ok(Some(user_model_to_domain(updated)))
    }

    async fn update_user_password(&self, id: &str, new_password_hash: &str) -> DomainResult<()> {
        let existing = user::Entity::find_by_id(id).one(&self.db).await?;

        let Some(existing) = existing else {
            return Err(DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            });
        };

        let mut active: user::ActiveModel = existing.into();
        active.password_hash = Set(new_password_hash.to_string());
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await?;

        Ok(())
    }

    async fn touch_last_login(&self, id: &str) -> DomainResult<()> {
        let existing = user::Entity::find_by_id(id).one(&self.db).await?;

        let Some(existing) = existing else {
            return Err(DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            });
        };

        let mut active: user::ActiveModel = existing.into();
        active.last_login_at = Set(Some(Utc::now()));
        active.update(&self.db).await?;

        Ok(())
    }

    async fn delete_user(&self, id: &str) -> DomainResult<()> {
        let result = user::Entity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            });
        }

        Ok(())
    }
}
