//! Payment gateway adapters

mod paygate;
mod simulated;

pub use paygate::PayGateGateway;
pub use simulated::SimulatedGateway;
