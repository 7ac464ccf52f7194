//! Outbound ports — interfaces for the world outside the booking saga
//!
//! These traits are the architectural contract that decouples the
//! application services from concrete integrations:
//!
//! - [`PaymentGatewayPort`] — hosted-checkout provider (PayGate or the
//!   in-memory simulator). Raw gateway status strings cross this boundary
//!   untranslated; mapping to ledger statuses happens in the reconciler.
//! - [`NotifierPort`] — best-effort renter notifications. Failures are
//!   logged by the implementation and never propagate into the saga.
//! - [`DocumentRendererPort`] — produces the contract text a renter signs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Booking, BookingStatus, Contract, DomainResult, Payment, User, Vehicle};

// ── Payment gateway ─────────────────────────────────────────────

/// Request to open a hosted checkout at the gateway.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Server-issued unique order reference
    pub order_code: i64,
    /// Amount in VND
    pub amount: i64,
    /// Line shown to the payer on the checkout page
    pub description: String,
    pub return_url: String,
    pub cancel_url: String,
}

/// Hosted checkout created by the gateway.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub checkout_url: String,
    /// QR payload for bank-app scanning
    pub qr_code: String,
}

/// Order state as reported by the gateway, untranslated.
#[derive(Debug, Clone)]
pub struct GatewayOrderStatus {
    pub order_code: i64,
    /// Provider vocabulary, e.g. "PAID", "PENDING", "PROCESSING", "CANCELLED"
    pub raw_status: String,
    pub paid_at: Option<DateTime<Utc>>,
    /// Gateway-side transaction reference, present once the order is paid
    pub transaction_ref: Option<String>,
}

#[async_trait]
pub trait PaymentGatewayPort: Send + Sync {
    /// Open a hosted checkout for the given order.
    async fn create_checkout(&self, request: CheckoutRequest) -> DomainResult<CheckoutSession>;

    /// Ask the gateway what it currently knows about an order.
    async fn fetch_status(&self, order_code: i64) -> DomainResult<GatewayOrderStatus>;

    /// Void an order the renter no longer needs to pay.
    async fn cancel_order(&self, order_code: i64, reason: &str) -> DomainResult<()>;
}

// ── Notifications ───────────────────────────────────────────────

/// Best-effort renter/staff notifications. Implementations must swallow
/// their own failures; the saga never waits on or retries a notification.
#[async_trait]
pub trait NotifierPort: Send + Sync {
    async fn booking_status_changed(&self, booking: &Booking, previous: BookingStatus);

    /// The contract is issued and the signing link is live. `signing_token`
    /// is the raw single-use token for building the link; it exists only
    /// here and in the renter's inbox, never in storage.
    async fn contract_ready(&self, booking: &Booking, contract: &Contract, signing_token: &str);

    async fn payment_succeeded(&self, booking: &Booking, payment: &Payment);

    /// Staff heads-up that a manual refund payout is waiting.
    async fn refund_due(&self, booking: &Booking);
}

// ── Document rendering ──────────────────────────────────────────

#[async_trait]
pub trait DocumentRendererPort: Send + Sync {
    /// Render the full contract text for a booking. The renter's profile
    /// supplies the legal name and license details printed on it.
    async fn render_contract(
        &self,
        contract_number: &str,
        renter: &User,
        booking: &Booking,
        vehicle: &Vehicle,
    ) -> DomainResult<String>;
}
