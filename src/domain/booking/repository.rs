//! Booking repository interface
//!
//! Status transitions are conditional writes: `WHERE status = expected`
//! at the SQL level, returning whether a row actually changed. Callers
//! treat `false` as a lost race and re-read instead of overwriting.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::{Booking, BookingStatus};
use crate::domain::DomainResult;
use crate::shared::{PaginatedResult, PaginationParams};

/// Settlement values written together with the CheckedOut transition.
#[derive(Debug, Clone)]
pub struct CheckOutRecord {
    pub at: DateTime<Utc>,
    pub note: Option<String>,
    pub photo_url: Option<String>,
    pub return_station_id: Option<Uuid>,
    pub late_fee: i64,
    pub damage_fee: i64,
    pub extra_amount: i64,
    pub refund_amount: i64,
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Save a new booking
    async fn save(&self, booking: Booking) -> DomainResult<()>;

    /// Find booking by ID
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Booking>>;

    /// List bookings for one renter, newest first
    async fn find_by_renter(
        &self,
        renter_id: &str,
        pagination: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>>;

    /// List all bookings, optionally filtered by status, newest first
    async fn list(
        &self,
        status: Option<BookingStatus>,
        pagination: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>>;

    /// Conditionally advance `expected -> next`. Returns false when the
    /// booking was not in `expected` (someone else moved it first).
    async fn cas_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> DomainResult<bool>;

    /// DepositPaid -> CheckedIn, recording the handover moment and any
    /// condition evidence taken at the counter.
    async fn record_check_in(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        note: Option<String>,
        photo_url: Option<String>,
    ) -> DomainResult<bool>;

    /// CheckedIn -> CheckedOut, recording the settlement in the same write.
    async fn record_check_out(&self, id: Uuid, record: CheckOutRecord) -> DomainResult<bool>;

    /// Move to `next` (Cancelled or RefundPending) from any of the
    /// `expected` statuses, stamping the reason and refundable amount.
    async fn record_cancel(
        &self,
        id: Uuid,
        expected: &[BookingStatus],
        next: BookingStatus,
        reason: &str,
        refund_amount: i64,
    ) -> DomainResult<bool>;

    /// RefundPending -> `final_status`, stamping who paid out and when.
    async fn record_refund_confirmed(
        &self,
        id: Uuid,
        staff_id: &str,
        at: DateTime<Utc>,
        final_status: BookingStatus,
    ) -> DomainResult<bool>;

    /// Vehicle-holding bookings whose window collides with [start, end)
    async fn find_overlapping(
        &self,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>>;

    /// Unsigned bookings (Pending / ContractPending) created before `cutoff`
    async fn find_stale_pending(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Booking>>;

    /// Paid bookings whose renter never showed: DepositPaid with
    /// start_time before `cutoff`
    async fn find_no_shows(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Booking>>;
}
