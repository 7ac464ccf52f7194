//! SeaORM implementation of VehicleRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::debug;
use uuid::Uuid;

use crate::domain::vehicle::{Vehicle, VehicleRepository, VehicleStatus};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::vehicle;
use crate::shared::{PaginatedResult, PaginationParams};

pub struct SeaOrmVehicleRepository {
    db: DatabaseConnection,
}

impl SeaOrmVehicleRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: vehicle::Model) -> Vehicle {
    Vehicle {
        id: m.id,
        license_plate: m.license_plate,
        brand: m.brand,
        model: m.model,
        year: m.year,
        color: m.color,
        hourly_rate: m.hourly_rate,
        daily_rate: m.daily_rate,
        status: VehicleStatus::from_str(&m.status),
        image_url: m.image_url,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn domain_to_active(v: Vehicle) -> vehicle::ActiveModel {
    vehicle::ActiveModel {
        id: Set(v.id),
        license_plate: Set(v.license_plate),
        brand: Set(v.brand),
        model: Set(v.model),
        year: Set(v.year),
        color: Set(v.color),
        hourly_rate: Set(v.hourly_rate),
        daily_rate: Set(v.daily_rate),
        status: Set(v.status.as_str().to_string()),
        image_url: Set(v.image_url),
        created_at: Set(v.created_at),
        updated_at: Set(v.updated_at),
    }
}

// ── VehicleRepository impl ──────────────────────────────────────

#[async_trait]
impl VehicleRepository for SeaOrmVehicleRepository {
    async fn save(&self, v: Vehicle) -> DomainResult<()> {
        debug!("Saving vehicle: {} ({})", v.license_plate, v.id);

        domain_to_active(v).insert(&self.db).await.map_err(|e| {
            if e.to_string().contains("UNIQUE") || e.to_string().contains("duplicate") {
                DomainError::Conflict("License plate already registered".to_string())
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Vehicle>> {
        let model = vehicle::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_license_plate(&self, plate: &str) -> DomainResult<Option<Vehicle>> {
        let model = vehicle::Entity::find()
            .filter(vehicle::Column::LicensePlate.eq(plate))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_domain))
    }

    async fn list(
        &self,
        status: Option<VehicleStatus>,
        pagination: PaginationParams,
    ) -> DomainResult<PaginatedResult<Vehicle>> {
        let page = pagination.page.max(1);
        let limit = pagination.limit.max(1);

        let mut query = vehicle::Entity::find().order_by_asc(vehicle::Column::LicensePlate);
        if let Some(status) = status {
            query = query.filter(vehicle::Column::Status.eq(status.as_str()));
        }

        let total = query.clone().count(&self.db).await?;
        let models = query
            .offset((page - 1) * limit)
            .limit(limit)
            .all(&self.db)
            .await?;

        let items = models.into_iter().map(model_to_domain).collect();
        Ok(PaginatedResult::new(items, total, page, limit))
    }

    async fn update(&self, v: Vehicle) -> DomainResult<()> {
        let existing = vehicle::Entity::find_by_id(v.id).one(&self.db).await?;

        if existing.is_none() {
            return Err(DomainError::NotFound {
                entity: "Vehicle",
                field: "id",
                value: v.id.to_string(),
            });
        }

        let mut active = domain_to_active(v);
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await?;
        Ok(())
    }

    async fn update_status(&self, id: Uuid, status: VehicleStatus) -> DomainResult<()> {
        let result = vehicle::Entity::update_many()
            .col_expr(vehicle::Column::Status, Expr::value(status.as_str()))
            .col_expr(vehicle::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(vehicle::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound {
                entity: "Vehicle",
                field: "id",
                value: id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = vehicle::Entity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound {
                entity: "Vehicle",
                field: "id",
                value: id.to_string(),
            });
        }
        Ok(())
    }
}
