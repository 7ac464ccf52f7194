
pub mod auth;
pub mod bookings;
pub mod contracts;
pub mod health;
pub mod metrics;
pub mod request_id;
pub mod users;
pub mod vehicles;
