//! Application ports (hexagonal architecture boundaries)
//!
//! Outbound ports decouple the booking services from the payment
//! gateway, notification channel and contract renderer.

pub mod outbound;

pub use outbound::{
    CheckoutRequest, CheckoutSession, DocumentRendererPort, GatewayOrderStatus, NotifierPort,
    PaymentGatewayPort,
};
