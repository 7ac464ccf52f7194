//! Booking aggregate

pub mod model;
pub mod repository;

pub use model::{deposit_for, windows_overlap, Booking, BookingStatus};
pub use repository::{BookingRepository, CheckOutRecord};
