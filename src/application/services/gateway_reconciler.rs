//! Gateway reconciler — keeps the payment ledger in step with the gateway
//!
//! There are no inbound webhooks: the gateway is polled, and every poll
//! is translated into at most one conditional ledger flip per payment.
//! A payment that loses its gateway session (crash between save and
//! checkout creation) is repaired by calling [`ensure_checkout`] again.
//!
//! [`ensure_checkout`]: GatewayReconcilerService::ensure_checkout

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::ports::{CheckoutRequest, PaymentGatewayPort};
use crate::application::services::payment_ledger::PaymentLedgerService;
use crate::domain::{DomainError, DomainResult, Payment, PaymentStatus, PaymentType, RepositoryProvider};
use crate::shared::{retry_with_backoff, RetryConfig};

// ── Status mapping ──────────────────────────────────────────────

/// What a raw gateway status means for the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayVerdict {
    /// Money confirmed
    Paid,
    /// Still awaiting the payer
    StillPending,
    /// Cancelled, expired or otherwise dead at the gateway
    Failed,
}

/// Translate the provider's status vocabulary. Anything unrecognised is
/// treated as Failed so a new vocabulary word can never hold a booking
/// open forever.
pub fn map_gateway_status(raw: &str) -> GatewayVerdict {
    match raw.to_ascii_uppercase().as_str() {
        "PAID" => GatewayVerdict::Paid,
        "PENDING" | "PROCESSING" => GatewayVerdict::StillPending,
        _ => GatewayVerdict::Failed,
    }
}

// ── Service ─────────────────────────────────────────────────────

pub struct GatewayReconcilerService {
    repos: Arc<dyn RepositoryProvider>,
    ledger: Arc<PaymentLedgerService>,
    gateway: Arc<dyn PaymentGatewayPort>,
    return_url: String,
    cancel_url: String,
}

impl GatewayReconcilerService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        ledger: Arc<PaymentLedgerService>,
        gateway: Arc<dyn PaymentGatewayPort>,
        return_url: String,
        cancel_url: String,
    ) -> Self {
        Self {
            repos,
            ledger,
            gateway,
            return_url,
            cancel_url,
        }
    }

    /// Make sure a pending payment has a live hosted checkout, creating
    /// one at the gateway if needed. Idempotent: a payment that already
    /// carries a checkout URL is returned as-is without a gateway call.
    ///
    /// Refunds are manual payouts and never get a checkout.
    pub async fn ensure_checkout(&self, payment_id: Uuid) -> DomainResult<Payment> {
        let payment = self
            .repos
            .payments()
            .find_by_id(payment_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "Payment",
                field: "id",
                value: payment_id.to_string(),
            })?;

        if payment.payment_type == PaymentType::Refund {
            debug!(payment_id = %payment.id, "Refunds are paid out manually, no checkout");
            return Ok(payment);
        }
        if payment.status != PaymentStatus::Pending {
            return Ok(payment);
        }
        if payment.checkout_url.is_some() {
            return Ok(payment);
        }

        // Checkout descriptions are length-capped at the provider; the
        // short booking prefix is enough for bank-statement matching.
        let booking_ref = payment.booking_id.to_string();
        let request = CheckoutRequest {
            order_code: payment.order_code,
            amount: payment.amount,
            description: format!("{} for booking {}", payment.payment_type, &booking_ref[..8]),
            return_url: self.return_url.clone(),
            cancel_url: self.cancel_url.clone(),
        };
        let session = retry_with_backoff(
            RetryConfig::default(),
            || self.gateway.create_checkout(request.clone()),
            |err| err.is_transient(),
            "gateway_create_checkout",
        )
        .await?;

        self.repos
            .payments()
            .set_gateway_artifacts(payment.id, &session.checkout_url, &session.qr_code)
            .await?;

        info!(
            payment_id = %payment.id,
            order_code = payment.order_code,
            amount = payment.amount,
            "🔗 Checkout session created"
        );

        self.repos
            .payments()
            .find_by_id(payment.id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "Payment",
                field: "id",
                value: payment.id.to_string(),
            })
    }

    /// Poll the gateway for every pending payment of a booking and apply
    /// what it reports. Returns the payments that flipped to Success this
    /// round, so the caller can advance the booking for each of them.
    ///
    /// One unreachable order never blocks the rest: per-payment errors
    /// are logged and skipped.
    pub async fn sync(&self, booking_id: Uuid) -> DomainResult<Vec<Payment>> {
        let pending = self
            .repos
            .payments()
            .find_pending_for_booking(booking_id)
            .await?;

        let mut confirmed = Vec::new();
        for payment in pending {
            if payment.payment_type == PaymentType::Refund {
                continue;
            }

            let status = match retry_with_backoff(
                RetryConfig::default(),
                || self.gateway.fetch_status(payment.order_code),
                |err| err.is_transient(),
                "gateway_fetch_status",
            )
            .await
            {
                Ok(status) => status,
                Err(e) => {
                    warn!(
                        order_code = payment.order_code,
                        error = %e,
                        "Gateway status fetch failed, will retry next sync"
                    );
                    continue;
                }
            };

            match map_gateway_status(&status.raw_status) {
                GatewayVerdict::Paid => {
                    let paid_at = status.paid_at.unwrap_or_else(Utc::now);
                    if let Some(updated) = self
                        .ledger
                        .apply_success(
                            payment.order_code,
                            paid_at,
                            status.transaction_ref.as_deref(),
                        )
                        .await?
                    {
                        confirmed.push(updated);
                    }
                }
                GatewayVerdict::StillPending => {
                    debug!(
                        order_code = payment.order_code,
                        raw_status = %status.raw_status,
                        "Payment still pending at gateway"
                    );
                }
                GatewayVerdict::Failed => {
                    self.ledger
                        .apply_failure(
                            payment.order_code,
                            &format!("Gateway reported {}", status.raw_status),
                        )
                        .await?;
                }
            }
        }

        Ok(confirmed)
    }

    /// Kill every pending payment of a booking: void the gateway order
    /// best-effort, then fail the ledger row with the given reason.
    /// Returns how many rows were failed.
    pub async fn abandon_pending(&self, booking_id: Uuid, reason: &str) -> DomainResult<usize> {
        let pending = self
            .repos
            .payments()
            .find_pending_for_booking(booking_id)
            .await?;

        let mut abandoned = 0;
        for payment in pending {
            if payment.payment_type != PaymentType::Refund {
                if let Err(e) = self.gateway.cancel_order(payment.order_code, reason).await {
                    warn!(
                        order_code = payment.order_code,
                        error = %e,
                        "Gateway order cancellation failed, failing ledger row anyway"
                    );
                }
            }
            if self.ledger.apply_failure(payment.order_code, reason).await? {
                abandoned += 1;
            }
        }

        Ok(abandoned)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Booking, BookingStatus};
    use crate::infrastructure::gateway::SimulatedGateway;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;
    use chrono::Duration;

    #[test]
    fn status_mapping_table() {
        assert_eq!(map_gateway_status("PAID"), GatewayVerdict::Paid);
        assert_eq!(map_gateway_status("paid"), GatewayVerdict::Paid);
        assert_eq!(map_gateway_status("PENDING"), GatewayVerdict::StillPending);
        assert_eq!(map_gateway_status("PROCESSING"), GatewayVerdict::StillPending);
        assert_eq!(map_gateway_status("CANCELLED"), GatewayVerdict::Failed);
        assert_eq!(map_gateway_status("EXPIRED"), GatewayVerdict::Failed);
        assert_eq!(map_gateway_status("SOMETHING_NEW"), GatewayVerdict::Failed);
    }

    fn sample_booking() -> Booking {
        let start = Utc::now() + Duration::days(1);
        let mut booking = Booking::new(
            "renter-1",
            Uuid::new_v4(),
            start,
            start + Duration::days(2),
            50_000,
            800_000,
            1_600_000,
            480_000,
        );
        booking.status = BookingStatus::ContractSigned;
        booking
    }

    struct Harness {
        reconciler: GatewayReconcilerService,
        repos: Arc<InMemoryRepositoryProvider>,
        ledger: Arc<PaymentLedgerService>,
        gateway: Arc<SimulatedGateway>,
        booking: Booking,
    }

    async fn harness() -> Harness {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let booking = sample_booking();
        repos.bookings().save(booking.clone()).await.unwrap();

        let ledger = Arc::new(PaymentLedgerService::new(repos.clone()));
        let gateway = Arc::new(SimulatedGateway::new());
        let reconciler = GatewayReconcilerService::new(
            repos.clone(),
            ledger.clone(),
            gateway.clone(),
            "https://app.test/payment/return".to_string(),
            "https://app.test/payment/cancel".to_string(),
        );
        Harness {
            reconciler,
            repos,
            ledger,
            gateway,
            booking,
        }
    }

    /// Stamp the full deposit as refundable, as a refundable cancel would.
    async fn make_refundable(h: &Harness) {
        let mut booking = h.booking.clone();
        booking.refund_amount = booking.deposit_amount;
        h.repos.bookings().save(booking).await.unwrap();
    }

    #[tokio::test]
    async fn ensure_checkout_is_idempotent() {
        let h = harness().await;
        let payment = h
            .ledger
            .open_payment(h.booking.id, PaymentType::Deposit)
            .await
            .unwrap();

        let first = h.reconciler.ensure_checkout(payment.id).await.unwrap();
        assert!(first.checkout_url.is_some());
        assert_eq!(h.gateway.checkouts_created(), 1);

        let second = h.reconciler.ensure_checkout(payment.id).await.unwrap();
        assert_eq!(second.checkout_url, first.checkout_url);
        assert_eq!(h.gateway.checkouts_created(), 1);
    }

    #[tokio::test]
    async fn refunds_never_get_a_checkout() {
        let h = harness().await;
        make_refundable(&h).await;
        let refund = h
            .ledger
            .open_payment(h.booking.id, PaymentType::Refund)
            .await
            .unwrap();
        assert_eq!(refund.amount, 480_000);

        let after = h.reconciler.ensure_checkout(refund.id).await.unwrap();
        assert!(after.checkout_url.is_none());
        assert_eq!(h.gateway.checkouts_created(), 0);
    }

    #[tokio::test]
    async fn sync_confirms_paid_orders() {
        let h = harness().await;
        let payment = h
            .ledger
            .open_payment(h.booking.id, PaymentType::Deposit)
            .await
            .unwrap();
        h.reconciler.ensure_checkout(payment.id).await.unwrap();

        // Nothing paid yet
        let confirmed = h.reconciler.sync(h.booking.id).await.unwrap();
        assert!(confirmed.is_empty());

        h.gateway.mark_paid(payment.order_code);
        let confirmed = h.reconciler.sync(h.booking.id).await.unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].status, PaymentStatus::Success);
        assert!(confirmed[0].paid_at.is_some());
        assert_eq!(
            confirmed[0].transaction_id,
            Some(format!("SIMTX-{}", payment.order_code))
        );

        // Already applied: the next sync has nothing pending to flip
        let confirmed = h.reconciler.sync(h.booking.id).await.unwrap();
        assert!(confirmed.is_empty());
    }

    #[tokio::test]
    async fn sync_fails_cancelled_orders() {
        let h = harness().await;
        let payment = h
            .ledger
            .open_payment(h.booking.id, PaymentType::Deposit)
            .await
            .unwrap();
        h.reconciler.ensure_checkout(payment.id).await.unwrap();
        h.gateway.mark_cancelled(payment.order_code);

        let confirmed = h.reconciler.sync(h.booking.id).await.unwrap();
        assert!(confirmed.is_empty());

        let ledger = h.ledger.ledger_for(h.booking.id).await.unwrap();
        assert_eq!(ledger[0].status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn sync_skips_refund_rows() {
        let h = harness().await;
        make_refundable(&h).await;
        h.ledger
            .open_payment(h.booking.id, PaymentType::Refund)
            .await
            .unwrap();

        let confirmed = h.reconciler.sync(h.booking.id).await.unwrap();
        assert!(confirmed.is_empty());

        // Still pending: sync never touches manual payouts
        let ledger = h.ledger.ledger_for(h.booking.id).await.unwrap();
        assert_eq!(ledger[0].status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn abandon_pending_voids_and_fails() {
        let h = harness().await;
        let payment = h
            .ledger
            .open_payment(h.booking.id, PaymentType::Deposit)
            .await
            .unwrap();
        h.reconciler.ensure_checkout(payment.id).await.unwrap();

        let abandoned = h
            .reconciler
            .abandon_pending(h.booking.id, "Booking cancelled")
            .await
            .unwrap();
        assert_eq!(abandoned, 1);

        let ledger = h.ledger.ledger_for(h.booking.id).await.unwrap();
        assert_eq!(ledger[0].status, PaymentStatus::Failed);
        assert_eq!(ledger[0].failure_reason.as_deref(), Some("Booking cancelled"));
        assert_eq!(h.gateway.status_of(payment.order_code).as_deref(), Some("CANCELLED"));
    }
}
