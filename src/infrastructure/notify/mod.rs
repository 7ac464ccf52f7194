//! Notification adapters
//!
//! The saga only ever talks to [`NotifierPort`]; this module provides the
//! log-only implementation used in every deployment today. A real email or
//! SMS sender slots in behind the same trait without touching the services.

use async_trait::async_trait;
use tracing::info;

use crate::application::ports::NotifierPort;
use crate::domain::{Booking, BookingStatus, Contract, Payment};

/// Structured-log notifier. Messages land in the service log instead of a
/// renter's inbox, which is exactly what development and staging need.
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotifierPort for TracingNotifier {
    async fn booking_status_changed(&self, booking: &Booking, previous: BookingStatus) {
        info!(
            booking_id = %booking.id,
            renter_id = %booking.renter_id,
            "📣 Booking moved {} -> {}",
            previous,
            booking.status
        );
    }

    async fn contract_ready(&self, booking: &Booking, contract: &Contract, signing_token: &str) {
        // The raw token is intentionally absent from the log line; only its
        // length is recorded so a leaked log never signs a contract.
        info!(
            booking_id = %booking.id,
            contract_number = %contract.contract_number,
            token_len = signing_token.len(),
            "📣 Contract ready for signature"
        );
    }

    async fn payment_succeeded(&self, booking: &Booking, payment: &Payment) {
        info!(
            booking_id = %booking.id,
            payment_type = %payment.payment_type,
            amount = payment.amount,
            "📣 Payment received"
        );
    }

    async fn refund_due(&self, booking: &Booking) {
        info!(
            booking_id = %booking.id,
            amount = booking.refund_amount,
            "📣 Manual refund payout waiting for staff"
        );
    }
}
