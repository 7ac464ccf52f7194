//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::booking::BookingRepository;
use crate::domain::contract::ContractRepository;
use crate::domain::payment::PaymentRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::user::UserRepositoryInterface;
use crate::domain::vehicle::VehicleRepository;

use super::booking_repository::SeaOrmBookingRepository;
use super::contract_repository::SeaOrmContractRepository;
use super::payment_repository::SeaOrmPaymentRepository;
use super::user_repository::SeaOrmUserRepository;
use super::vehicle_repository::SeaOrmVehicleRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let booking = repos.bookings().find_by_id(id).await?;
/// let ledger = repos.payments().list_for_booking(id).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    bookings: SeaOrmBookingRepository,
    contracts: SeaOrmContractRepository,
    payments: SeaOrmPaymentRepository,
    vehicles: SeaOrmVehicleRepository,
    users: SeaOrmUserRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            bookings: SeaOrmBookingRepository::new(db.clone()),
            contracts: SeaOrmContractRepository::new(db.clone()),
            payments: SeaOrmPaymentRepository::new(db.clone()),
            vehicles: SeaOrmVehicleRepository::new(db.clone()),
            users: SeaOrmUserRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }

    fn contracts(&self) -> &dyn ContractRepository {
        &self.contracts
    }

    fn payments(&self) -> &dyn PaymentRepository {
        &self.payments
    }

    fn vehicles(&self) -> &dyn VehicleRepository {
        &self.vehicles
    }

    fn users(&self) -> &dyn UserRepositoryInterface {
        &self.users
    }
}
