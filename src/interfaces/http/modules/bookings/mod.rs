//! Booking module — the rental lifecycle API

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
