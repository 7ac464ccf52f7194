//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20260101_000001_create_users;
mod m20260101_000002_create_vehicles;
mod m20260101_000003_create_bookings;
mod m20260101_000004_create_contracts;
mod m20260101_000005_create_payments;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_users::Migration),
            Box::new(m20260101_000002_create_vehicles::Migration),
            Box::new(m20260101_000003_create_bookings::Migration),
            Box::new(m20260101_000004_create_contracts::Migration),
            Box::new(m20260101_000005_create_payments::Migration),
        ]
    }
}
