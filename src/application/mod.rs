pub mod identity;
pub mod ports;
pub mod services;

// Re-export key types for convenience
pub use identity::{AuthResult, UserService};
pub use ports::{DocumentRendererPort, NotifierPort, PaymentGatewayPort};
pub use services::{
    BookingLifecycleService, ContractGateService, GatewayReconcilerService, PaymentLedgerService,
};
