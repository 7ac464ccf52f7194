//! Payment aggregate

pub mod model;
pub mod repository;

pub use model::{Payment, PaymentStatus, PaymentType};
pub use repository::PaymentRepository;
