//! Vehicle DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::domain::Vehicle;
use crate::shared::validations::validate_license_plate;

/// Vehicle API representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VehicleDto {
    pub id: Uuid,
    pub license_plate: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    /// VND per hour for sub-day rentals
    pub hourly_rate: i64,
    /// VND per day for rentals of a day or longer
    pub daily_rate: i64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Vehicle> for VehicleDto {
    fn from(v: Vehicle) -> Self {
        Self {
            id: v.id,
            license_plate: v.license_plate,
            brand: v.brand,
            model: v.model,
            year: v.year,
            color: v.color,
            hourly_rate: v.hourly_rate,
            daily_rate: v.daily_rate,
            status: v.status.as_str().to_string(),
            image_url: v.image_url,
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

/// Register a vehicle into the fleet
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVehicleRequest {
    #[validate(custom(function = "validate_license_plate"))]
    pub license_plate: String,
    #[validate(length(min = 1, max = 50, message = "brand is required"))]
    pub brand: String,
    #[validate(length(min = 1, max = 50, message = "model is required"))]
    pub model: String,
    #[validate(range(min = 1990, max = 2100, message = "year out of range"))]
    pub year: i32,
    #[validate(length(min = 1, max = 30, message = "color is required"))]
    pub color: String,
    #[validate(range(min = 1, message = "hourly rate must be positive"))]
    pub hourly_rate: i64,
    #[validate(range(min = 1, message = "daily rate must be positive"))]
    pub daily_rate: i64,
    pub image_url: Option<String>,
}

/// Update a vehicle's details; absent fields are left untouched
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 1, max = 50))]
    pub brand: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub model: Option<String>,
    #[validate(range(min = 1990, max = 2100))]
    pub year: Option<i32>,
    #[validate(length(min = 1, max = 30))]
    pub color: Option<String>,
    #[validate(range(min = 1))]
    pub hourly_rate: Option<i64>,
    #[validate(range(min = 1))]
    pub daily_rate: Option<i64>,
    pub image_url: Option<String>,
}

/// Change a vehicle's availability status
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeVehicleStatusRequest {
    /// Available, Rented, Maintenance or Retired
    pub status: String,
}

/// List vehicles query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListVehiclesParams {
    /// Filter by status (Available, Rented, Maintenance, Retired)
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}
