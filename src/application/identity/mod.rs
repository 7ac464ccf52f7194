//! Identity module — user management & authentication
//!
//! Contains the `UserService` which orchestrates all user-related
//! use-cases: login, registration, profile updates, password changes.

pub mod service;

pub use service::{AuthResult, UserService};
