//! User management module — admin-only CRUD

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
