//! Database entities module

pub mod booking;
pub mod contract;
pub mod payment;
pub mod user;
pub mod vehicle;

pub use booking::Entity as Booking;
pub use contract::Entity as Contract;
pub use payment::Entity as Payment;
pub use user::Entity as User;
pub use vehicle::Entity as Vehicle;
