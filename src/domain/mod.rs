pub mod booking;
pub mod contract;
pub mod payment;
pub mod repositories;
pub mod settlement;
pub mod user;
pub mod vehicle;

// Re-export commonly used types
pub use booking::{deposit_for, windows_overlap, Booking, BookingRepository, BookingStatus, CheckOutRecord};
pub use contract::{
    contract_number_for, Contract, ContractDraft, ContractRepository, ContractStatus,
    SignatureRecord,
};
pub use payment::{Payment, PaymentRepository, PaymentStatus, PaymentType};
pub use repositories::{DomainResult, RepositoryProvider};
pub use settlement::{apply_late_grace, settle, Settlement};
pub use user::{
    CreateUserDto, GetUserDto, UpdateUserDto, User, UserChangePasswordDto, UserRepositoryInterface,
    UserRole,
};
pub use vehicle::{Vehicle, VehicleRepository, VehicleStatus};

// Re-export DomainError from shared for convenience
pub use crate::shared::types::errors::DomainError;
