//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod booking_repository;
pub mod contract_repository;
pub mod payment_repository;
pub mod repository_provider;
pub mod user_repository;
pub mod vehicle_repository;

pub use repository_provider::SeaOrmRepositoryProvider;
pub use user_repository::SeaOrmUserRepository;
