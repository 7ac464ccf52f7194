//! Service health probe

pub mod handlers;

pub use handlers::*;
