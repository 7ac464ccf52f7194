//! Repository traits for the domain layer
//!
//! Contains:
//! - `RepositoryProvider` — unified access to all per-aggregate repositories
//! - `DomainResult` — standard result type for domain operations

use super::booking::BookingRepository;
use super::contract::ContractRepository;
use super::payment::PaymentRepository;
use super::user::UserRepositoryInterface;
use super::vehicle::VehicleRepository;
use crate::shared::types::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

// ── RepositoryProvider ──────────────────────────────────────────

/// Provides access to all domain repositories.
///
/// Consumers request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let booking = repos.bookings().find_by_id(id).await?;
///     let ledger = repos.payments().list_for_booking(id).await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn bookings(&self) -> &dyn BookingRepository;
    fn contracts(&self) -> &dyn ContractRepository;
    fn payments(&self) -> &dyn PaymentRepository;
    fn users(&self) -> &dyn UserRepositoryInterface;
    fn vehicles(&self) -> &dyn VehicleRepository;
}
