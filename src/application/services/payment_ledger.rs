//! Payment ledger — one row per money movement
//!
//! Opening a payment is idempotent per (booking, type): an existing
//! Pending or Success row is returned unchanged instead of creating a
//! duplicate. Status flips are conditional writes, so applying the same
//! gateway outcome twice performs exactly one state change.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{
    Booking, DomainError, DomainResult, Payment, PaymentType, RepositoryProvider,
};

/// Amount owed for a payment type, read from the booking at the moment
/// the payment is opened. Deposit and Rental come from the booking's
/// pricing; Extra and Refund are the settlement outcomes stamped on the
/// booking (fees netted against the deposit at check-out, or the full
/// deposit on a refundable cancel). Later booking mutations never reach
/// back into an already-created payment row.
pub fn amount_for(booking: &Booking, payment_type: PaymentType) -> i64 {
    match payment_type {
        PaymentType::Deposit => booking.deposit_amount,
        PaymentType::Rental => booking.total_amount,
        PaymentType::Extra => booking.extra_amount,
        PaymentType::Refund => booking.refund_amount,
    }
}

pub struct PaymentLedgerService {
    repos: Arc<dyn RepositoryProvider>,
}

impl PaymentLedgerService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Open a payment of `payment_type` for a booking.
    ///
    /// Returns the existing row when one is already Pending or Success;
    /// a fresh Pending row (with a new order code) otherwise.
    pub async fn open_payment(
        &self,
        booking_id: Uuid,
        payment_type: PaymentType,
    ) -> DomainResult<Payment> {
        let booking = self
            .repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "Booking",
                field: "id",
                value: booking_id.to_string(),
            })?;

        if let Some(existing) = self
            .repos
            .payments()
            .find_open(booking_id, payment_type)
            .await?
        {
            debug!(
                booking_id = %booking_id,
                payment_id = %existing.id,
                payment_type = %payment_type,
                "Payment already open, returning existing row"
            );
            return Ok(existing);
        }

        let amount = amount_for(&booking, payment_type);
        if amount <= 0 {
            return Err(DomainError::Validation(format!(
                "Cannot open {} payment of {} VND",
                payment_type, amount
            )));
        }

        let order_code = self.next_order_code().await?;
        let payment = Payment::new(booking_id, payment_type, amount, order_code);
        self.repos.payments().save(payment.clone()).await?;

        info!(
            booking_id = %booking_id,
            payment_id = %payment.id,
            payment_type = %payment_type,
            amount,
            order_code,
            "💰 Payment opened"
        );

        Ok(payment)
    }

    /// Server-issued gateway reference: Unix epoch millis, bumped past
    /// any collision with an existing row.
    async fn next_order_code(&self) -> DomainResult<i64> {
        let mut code = Utc::now().timestamp_millis();
        while self.repos.payments().order_code_taken(code).await? {
            code += 1;
        }
        Ok(code)
    }

    /// Record a confirmed payment, keeping the gateway's transaction
    /// reference when one was reported. Returns the payment when this
    /// call performed the Pending -> Success flip, `None` when the row
    /// had already been resolved (nothing was written).
    pub async fn apply_success(
        &self,
        order_code: i64,
        paid_at: DateTime<Utc>,
        transaction_ref: Option<&str>,
    ) -> DomainResult<Option<Payment>> {
        let flipped = self
            .repos
            .payments()
            .mark_success(order_code, paid_at, transaction_ref)
            .await?;
        if !flipped {
            debug!(order_code, "Payment already resolved, success ignored");
            return Ok(None);
        }

        let payment = self
            .repos
            .payments()
            .find_by_order_code(order_code)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "Payment",
                field: "order_code",
                value: order_code.to_string(),
            })?;

        info!(
            payment_id = %payment.id,
            booking_id = %payment.booking_id,
            payment_type = %payment.payment_type,
            order_code,
            "✅ Payment succeeded"
        );

        Ok(Some(payment))
    }

    /// Record a rejected payment. Success is sticky: a resolved row is
    /// left untouched and `false` is returned.
    pub async fn apply_failure(&self, order_code: i64, reason: &str) -> DomainResult<bool> {
        let flipped = self.repos.payments().mark_failed(order_code, reason).await?;
        if flipped {
            info!(order_code, reason, "Payment failed");
        }
        Ok(flipped)
    }

    /// Full ledger for a booking, oldest first.
    pub async fn ledger_for(&self, booking_id: Uuid) -> DomainResult<Vec<Payment>> {
        self.repos.payments().list_for_booking(booking_id).await
    }

    pub async fn find_payment(&self, id: Uuid) -> DomainResult<Option<Payment>> {
        self.repos.payments().find_by_id(id).await
    }

    /// Close out the manual Refund payment when staff confirm the payout.
    /// Manual payouts have no gateway transaction behind them.
    pub async fn settle_refund(
        &self,
        booking_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> DomainResult<Option<Payment>> {
        let Some(refund) = self
            .repos
            .payments()
            .find_open(booking_id, PaymentType::Refund)
            .await?
        else {
            return Ok(None);
        };
        self.apply_success(refund.order_code, paid_at, None).await
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookingStatus, PaymentStatus};
    use crate::infrastructure::storage::InMemoryRepositoryProvider;
    use chrono::Duration;

    fn sample_booking() -> Booking {
        let start = Utc::now() + Duration::days(1);
        let mut booking = Booking::new(
            "renter-1",
            Uuid::new_v4(),
            start,
            start + Duration::days(1),
            50_000,
            800_000,
            800_000,
            240_000,
        );
        booking.status = BookingStatus::ContractSigned;
        booking
    }

    async fn service_with_booking() -> (PaymentLedgerService, Booking) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let booking = sample_booking();
        repos.bookings().save(booking.clone()).await.unwrap();
        (PaymentLedgerService::new(repos), booking)
    }

    #[test]
    fn amounts_follow_booking_fields() {
        let mut b = sample_booking();
        b.late_fee = 150_000;
        b.damage_fee = 140_000;
        b.extra_amount = 50_000;

        assert_eq!(amount_for(&b, PaymentType::Deposit), 240_000);
        assert_eq!(amount_for(&b, PaymentType::Rental), 800_000);
        // Settlement already netted the fees against the deposit
        assert_eq!(amount_for(&b, PaymentType::Extra), 50_000);
        assert_eq!(amount_for(&b, PaymentType::Refund), 0);

        let mut refundable = sample_booking();
        refundable.refund_amount = 240_000;
        assert_eq!(amount_for(&refundable, PaymentType::Refund), 240_000);
    }

    #[tokio::test]
    async fn open_payment_is_idempotent() {
        let (ledger, booking) = service_with_booking().await;

        let first = ledger
            .open_payment(booking.id, PaymentType::Deposit)
            .await
            .unwrap();
        let second = ledger
            .open_payment(booking.id, PaymentType::Deposit)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.order_code, second.order_code);
        assert_eq!(ledger.ledger_for(booking.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn open_payment_snapshot_survives_booking_changes() {
        let (ledger, booking) = service_with_booking().await;

        let payment = ledger
            .open_payment(booking.id, PaymentType::Deposit)
            .await
            .unwrap();
        assert_eq!(payment.amount, 240_000);

        // A later (hypothetical) deposit change must not reach the row
        let reloaded = ledger.find_payment(payment.id).await.unwrap().unwrap();
        assert_eq!(reloaded.amount, 240_000);
    }

    #[tokio::test]
    async fn failed_payment_can_be_reopened() {
        let (ledger, booking) = service_with_booking().await;

        let first = ledger
            .open_payment(booking.id, PaymentType::Deposit)
            .await
            .unwrap();
        ledger
            .apply_failure(first.order_code, "CANCELLED")
            .await
            .unwrap();

        let second = ledger
            .open_payment(booking.id, PaymentType::Deposit)
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn success_is_applied_exactly_once() {
        let (ledger, booking) = service_with_booking().await;
        let payment = ledger
            .open_payment(booking.id, PaymentType::Deposit)
            .await
            .unwrap();

        let now = Utc::now();
        let first = ledger
            .apply_success(payment.order_code, now, Some("FT2606170042"))
            .await
            .unwrap();
        let second = ledger
            .apply_success(payment.order_code, now, None)
            .await
            .unwrap();

        let settled = first.unwrap();
        assert_eq!(settled.transaction_id.as_deref(), Some("FT2606170042"));
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn success_is_sticky_against_failure() {
        let (ledger, booking) = service_with_booking().await;
        let payment = ledger
            .open_payment(booking.id, PaymentType::Deposit)
            .await
            .unwrap();

        ledger
            .apply_success(payment.order_code, Utc::now(), None)
            .await
            .unwrap();
        let flipped = ledger
            .apply_failure(payment.order_code, "EXPIRED")
            .await
            .unwrap();

        assert!(!flipped);
        let reloaded = ledger.find_payment(payment.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, PaymentStatus::Success);
    }

    #[tokio::test]
    async fn zero_amount_extra_is_rejected() {
        let (ledger, booking) = service_with_booking().await;
        // Settlement stamped no extra charge: nothing to open
        let result = ledger.open_payment(booking.id, PaymentType::Extra).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_booking_is_rejected() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let ledger = PaymentLedgerService::new(repos);
        let result = ledger
            .open_payment(Uuid::new_v4(), PaymentType::Deposit)
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
