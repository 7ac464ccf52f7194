//! # Rentra Booking Service
//!
//! Booking lifecycle orchestration for a vehicle rental fleet: reservations,
//! contract signing, deposit and settlement payments, check-in/check-out.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Core business entities, state machines and repository traits
//! - **application**: Lifecycle services, payment ledger and background tasks
//! - **infrastructure**: External concerns (database, payment gateway, crypto)
//! - **interfaces**: REST API with Swagger documentation
//! - **shared**: Errors, pagination, retry and shutdown plumbing

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{init_database, SeaOrmRepositoryProvider, SeaOrmUserRepository};

// Re-export API router
pub use interfaces::create_api_router;
