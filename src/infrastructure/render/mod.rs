//! Contract document rendering
//!
//! Produces the plain-text rental agreement a renter signs. The text is what
//! gets hashed into the contract record, so rendering must be deterministic
//! for a given booking — no timestamps of "now", no random ordering.

use async_trait::async_trait;

use crate::application::ports::DocumentRendererPort;
use crate::domain::{Booking, DomainResult, User, Vehicle};

/// Built-in plain-text renderer.
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentRendererPort for TemplateRenderer {
    async fn render_contract(
        &self,
        contract_number: &str,
        renter: &User,
        booking: &Booking,
        vehicle: &Vehicle,
    ) -> DomainResult<String> {
        let phone = renter.phone.as_deref().unwrap_or("(not provided)");
        let license = renter
            .driver_license_no
            .as_deref()
            .unwrap_or("(presented at pickup)");

        let text = format!(
            "VEHICLE RENTAL AGREEMENT\n\
             Contract no: {number}\n\
             \n\
             Renter: {renter}\n\
             Phone: {phone}\n\
             Driver license: {license}\n\
             Vehicle: {brand} {model} {year}, {color}, plate {plate}\n\
             \n\
             Rental period: {start} to {end}\n\
             Rental total: {total} VND\n\
             Security deposit: {deposit} VND\n\
             Overdue rate: {hourly} VND per hour\n\
             \n\
             The renter agrees to return the vehicle by the end of the rental\n\
             period in the condition it was handed over. Late returns are\n\
             billed per started hour at the overdue rate. Damage assessed at\n\
             return is charged against the deposit; any remainder is refunded\n\
             after return.\n\
             \n\
             Signed electronically via the booking portal.\n",
            number = contract_number,
            renter = renter.display_name(),
            phone = phone,
            license = license,
            brand = vehicle.brand,
            model = vehicle.model,
            year = vehicle.year,
            color = vehicle.color,
            plate = vehicle.license_plate,
            start = booking.start_time.format("%Y-%m-%d %H:%M UTC"),
            end = booking.end_time.format("%Y-%m-%d %H:%M UTC"),
            total = booking.total_amount,
            deposit = booking.deposit_amount,
            hourly = booking.hourly_rate,
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;
    use chrono::{Duration, Utc};

    fn sample_renter() -> User {
        User {
            id: "renter-1".into(),
            username: "ngthanh".into(),
            email: "thanh@example.com".into(),
            password_hash: String::new(),
            role: UserRole::Renter,
            full_name: Some("Nguyen Van Thanh".into()),
            phone: Some("+84 90 123 4567".into()),
            driver_license_no: Some("B2-123456".into()),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    fn sample_vehicle() -> Vehicle {
        Vehicle::new("51F-123.45", "VinFast", "VF e34", 2024, "White", 50_000, 800_000)
    }

    #[tokio::test]
    async fn rendering_is_deterministic_and_complete() {
        let vehicle = sample_vehicle();
        let renter = sample_renter();
        let start = Utc::now() + Duration::hours(24);
        let booking = Booking::new(
            "renter-1",
            vehicle.id,
            start,
            start + Duration::hours(8),
            50_000,
            800_000,
            400_000,
            120_000,
        );

        let renderer = TemplateRenderer::new();
        let first = renderer
            .render_contract("HD-2026-000001", &renter, &booking, &vehicle)
            .await
            .unwrap();
        let second = renderer
            .render_contract("HD-2026-000001", &renter, &booking, &vehicle)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert!(first.contains("HD-2026-000001"));
        assert!(first.contains("Nguyen Van Thanh"));
        assert!(first.contains("B2-123456"));
        assert!(first.contains("51F-123.45"));
        assert!(first.contains(&booking.total_amount.to_string()));
    }

    #[tokio::test]
    async fn missing_profile_fields_render_placeholders() {
        let vehicle = sample_vehicle();
        let mut renter = sample_renter();
        renter.full_name = None;
        renter.phone = None;
        renter.driver_license_no = None;

        let start = Utc::now() + Duration::hours(24);
        let booking = Booking::new(
            "renter-1",
            vehicle.id,
            start,
            start + Duration::hours(8),
            50_000,
            800_000,
            400_000,
            120_000,
        );

        let text = TemplateRenderer::new()
            .render_contract("HD-2026-000002", &renter, &booking, &vehicle)
            .await
            .unwrap();

        assert!(text.contains("Renter: ngthanh"));
        assert!(text.contains("(presented at pickup)"));
    }
}
