//! Vehicle domain entity

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Vehicle availability status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleStatus {
    /// Ready to be booked
    Available,
    /// Currently checked out by a renter
    Rented,
    /// Pulled from the fleet for service
    Maintenance,
    /// Permanently removed from the fleet
    Retired,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Rented => "Rented",
            Self::Maintenance => "Maintenance",
            Self::Retired => "Retired",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Available" => Self::Available,
            "Rented" => Self::Rented,
            "Maintenance" => Self::Maintenance,
            "Retired" => Self::Retired,
            _ => Self::Maintenance,
        }
    }
}

impl std::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rentable vehicle with its rate card
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: Uuid,
    pub license_plate: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    /// Rate for rentals shorter than a day (VND per hour)
    pub hourly_rate: i64,
    /// Rate for rentals of a day or longer (VND per day)
    pub daily_rate: i64,
    pub status: VehicleStatus,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        license_plate: impl Into<String>,
        brand: impl Into<String>,
        model: impl Into<String>,
        year: i32,
        color: impl Into<String>,
        hourly_rate: i64,
        daily_rate: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            license_plate: license_plate.into(),
            brand: brand.into(),
            model: model.into(),
            year,
            color: color.into(),
            hourly_rate,
            daily_rate,
            status: VehicleStatus::Available,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether new bookings may be taken against this vehicle.
    pub fn is_bookable(&self) -> bool {
        self.status == VehicleStatus::Available
    }

    /// Price a rental window against the rate card.
    ///
    /// Windows of a day or more bill whole days (rounded up) at the daily
    /// rate; anything shorter bills whole hours (rounded up) at the
    /// hourly rate. Non-positive windows price to zero.
    pub fn rental_price(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
        let span = end - start;
        if span <= Duration::zero() {
            return 0;
        }

        let minutes = span.num_minutes().max(1);
        if span >= Duration::days(1) {
            let days = (minutes + 24 * 60 - 1) / (24 * 60);
            days * self.daily_rate
        } else {
            let hours = (minutes + 59) / 60;
            hours * self.hourly_rate
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vehicle() -> Vehicle {
        Vehicle::new("51F-123.45", "VinFast", "VF e34", 2024, "White", 50_000, 800_000)
    }

    #[test]
    fn new_vehicle_is_available() {
        let v = sample_vehicle();
        assert_eq!(v.status, VehicleStatus::Available);
        assert!(v.is_bookable());
    }

    #[test]
    fn short_rental_bills_hourly_rounded_up() {
        let v = sample_vehicle();
        let start = Utc::now();
        assert_eq!(v.rental_price(start, start + Duration::hours(3)), 150_000);
        assert_eq!(
            v.rental_price(start, start + Duration::minutes(90)),
            100_000
        );
    }

    #[test]
    fn day_or_longer_bills_daily_rounded_up() {
        let v = sample_vehicle();
        let start = Utc::now();
        assert_eq!(v.rental_price(start, start + Duration::days(1)), 800_000);
        assert_eq!(
            v.rental_price(start, start + Duration::hours(25)),
            1_600_000
        );
        assert_eq!(v.rental_price(start, start + Duration::days(3)), 2_400_000);
    }

    #[test]
    fn empty_window_prices_to_zero() {
        let v = sample_vehicle();
        let start = Utc::now();
        assert_eq!(v.rental_price(start, start), 0);
        assert_eq!(v.rental_price(start, start - Duration::hours(1)), 0);
    }

    #[test]
    fn status_roundtrip() {
        for s in [
            VehicleStatus::Available,
            VehicleStatus::Rented,
            VehicleStatus::Maintenance,
            VehicleStatus::Retired,
        ] {
            assert_eq!(VehicleStatus::from_str(s.as_str()), s);
        }
    }

    #[test]
    fn unknown_status_defaults_to_maintenance() {
        assert_eq!(VehicleStatus::from_str("???"), VehicleStatus::Maintenance);
    }
}
