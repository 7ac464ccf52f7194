//! Payment repository interface
//!
//! Status flips are conditional writes keyed on the current Pending
//! status. Success is sticky: once a row is Success nothing moves it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::{Payment, PaymentType};
use crate::domain::DomainResult;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Save a new payment
    async fn save(&self, payment: Payment) -> DomainResult<()>;

    /// Find payment by ID
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Payment>>;

    /// Find payment by its gateway order code
    async fn find_by_order_code(&self, order_code: i64) -> DomainResult<Option<Payment>>;

    /// The open (Pending or Success) payment of this type, if any
    async fn find_open(
        &self,
        booking_id: Uuid,
        payment_type: PaymentType,
    ) -> DomainResult<Option<Payment>>;

    /// All Pending payments for a booking (reconciliation targets)
    async fn find_pending_for_booking(&self, booking_id: Uuid) -> DomainResult<Vec<Payment>>;

    /// Full ledger for a booking, oldest first
    async fn list_for_booking(&self, booking_id: Uuid) -> DomainResult<Vec<Payment>>;

    /// Whether any payment already uses this order code
    async fn order_code_taken(&self, order_code: i64) -> DomainResult<bool>;

    /// Pending -> Success with the confirmation time and the gateway's
    /// transaction reference. Returns false when the row was not Pending
    /// (already resolved).
    async fn mark_success(
        &self,
        order_code: i64,
        paid_at: DateTime<Utc>,
        transaction_ref: Option<&str>,
    ) -> DomainResult<bool>;

    /// Pending -> Failed with the gateway's reason. Returns false when
    /// the row was not Pending.
    async fn mark_failed(&self, order_code: i64, reason: &str) -> DomainResult<bool>;

    /// Attach the gateway checkout link and QR payload to a payment
    async fn set_gateway_artifacts(
        &self,
        id: Uuid,
        checkout_url: &str,
        qr_code: &str,
    ) -> DomainResult<()>;
}
