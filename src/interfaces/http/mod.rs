//! HTTP REST API interfaces
//!
//! - `common`: Response envelope, pagination DTOs, validated JSON extractor
//! - `middleware`: JWT authentication middleware
//! - `modules`: Request handlers grouped per resource
//! - `router`: API router with Swagger documentation

pub mod common;
pub mod middleware;
pub mod modules;
pub mod router;

pub use router::create_api_router;
