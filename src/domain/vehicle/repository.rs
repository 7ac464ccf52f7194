//! Vehicle repository interface

use async_trait::async_trait;
use uuid::Uuid;

use super::model::{Vehicle, VehicleStatus};
use crate::domain::DomainResult;
use crate::shared::{PaginatedResult, PaginationParams};

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    /// Save a new vehicle
    async fn save(&self, vehicle: Vehicle) -> DomainResult<()>;

    /// Find vehicle by ID
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Vehicle>>;

    /// Find vehicle by license plate (plates are unique)
    async fn find_by_license_plate(&self, plate: &str) -> DomainResult<Option<Vehicle>>;

    /// List vehicles, optionally filtered by status
    async fn list(
        &self,
        status: Option<VehicleStatus>,
        pagination: PaginationParams,
    ) -> DomainResult<PaginatedResult<Vehicle>>;

    /// Update an existing vehicle
    async fn update(&self, vehicle: Vehicle) -> DomainResult<()>;

    /// Set the availability status only
    async fn update_status(&self, id: Uuid, status: VehicleStatus) -> DomainResult<()>;

    /// Remove a vehicle from the fleet
    async fn delete(&self, id: Uuid) -> DomainResult<()>;
}
