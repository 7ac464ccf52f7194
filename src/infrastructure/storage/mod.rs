//! In-memory storage implementations

mod memory;

pub use memory::{
    InMemoryBookingRepository, InMemoryContractRepository, InMemoryPaymentRepository,
    InMemoryRepositoryProvider, InMemoryUserRepository, InMemoryVehicleRepository,
};
