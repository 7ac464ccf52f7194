//! Contract module — the public signing gate and staff contract views

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
