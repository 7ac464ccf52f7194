//! Vehicle aggregate

pub mod model;
pub mod repository;

pub use model::{Vehicle, VehicleStatus};
pub use repository::VehicleRepository;
