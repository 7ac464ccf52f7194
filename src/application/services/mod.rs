//! Application services

mod booking_lifecycle;
mod booking_watchdog;
mod contract_expiry;
mod contract_gate;
mod gateway_reconciler;
mod payment_ledger;

pub use booking_lifecycle::{BookingCreated, BookingLifecycleService, SignOutcome};
pub use booking_watchdog::start_booking_watchdog_task;
pub use contract_expiry::start_contract_expiry_task;
pub use contract_gate::ContractGateService;
pub use gateway_reconciler::{map_gateway_status, GatewayReconcilerService, GatewayVerdict};
pub use payment_ledger::{amount_for, PaymentLedgerService};
