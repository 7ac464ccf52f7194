//! Booking domain entity
//!
//! A booking walks a fixed status ladder from creation to settlement.
//! Transitions are enforced twice: here as pure guards, and again in the
//! repository as conditional writes so concurrent actors cannot skip steps.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Booking lifecycle status
///
/// Forward order: Pending -> ContractPending -> ContractSigned ->
/// DepositPaid -> CheckedIn -> CheckedOut, then one of
/// ExtraPaymentPending / RefundPending / Completed depending on the
/// settlement. Cancelled is reachable from any state before CheckedIn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    /// Created, waiting for a contract to be issued
    Pending,
    /// Contract issued, waiting for the renter's signature
    ContractPending,
    /// Contract signed, waiting for the deposit
    ContractSigned,
    /// Deposit received, renter may pick up the vehicle
    DepositPaid,
    /// Vehicle handed over
    CheckedIn,
    /// Vehicle returned, settlement recorded
    CheckedOut,
    /// Settlement left the renter owing money
    ExtraPaymentPending,
    /// Settlement owes the renter (part of) the deposit back
    RefundPending,
    /// Fully settled
    Completed,
    /// Abandoned before pickup
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::ContractPending => "ContractPending",
            Self::ContractSigned => "ContractSigned",
            Self::DepositPaid => "DepositPaid",
            Self::CheckedIn => "CheckedIn",
            Self::CheckedOut => "CheckedOut",
            Self::ExtraPaymentPending => "ExtraPaymentPending",
            Self::RefundPending => "RefundPending",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Pending" => Self::Pending,
            "ContractPending" => Self::ContractPending,
            "ContractSigned" => Self::ContractSigned,
            "DepositPaid" => Self::DepositPaid,
            "CheckedIn" => Self::CheckedIn,
            "CheckedOut" => Self::CheckedOut,
            "ExtraPaymentPending" => Self::ExtraPaymentPending,
            "RefundPending" => Self::RefundPending,
            "Completed" => Self::Completed,
            _ => Self::Cancelled,
        }
    }

    /// No further transitions leave a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Statuses that keep the vehicle unavailable for overlapping windows.
    pub fn holds_vehicle(&self) -> bool {
        matches!(
            self,
            Self::Pending
                | Self::ContractPending
                | Self::ContractSigned
                | Self::DepositPaid
                | Self::CheckedIn
        )
    }

    /// Whether the booking can still be cancelled (pickup not happened).
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            Self::Pending | Self::ContractPending | Self::ContractSigned | Self::DepositPaid
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Two half-open rental windows collide when each starts before the
/// other ends.
pub fn windows_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Deposit owed up front: `percent` of the rental total, rounded down.
pub fn deposit_for(total_amount: i64, percent: i64) -> i64 {
    total_amount * percent / 100
}

/// Vehicle rental booking
#[derive(Debug, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub renter_id: String,
    pub vehicle_id: Uuid,
    /// Station the vehicle is collected from. Opaque reference; station
    /// inventory lives in another system
    pub pickup_station_id: Option<Uuid>,
    /// Station the vehicle came back to, recorded at check-out
    pub return_station_id: Option<Uuid>,
    /// Scheduled pickup time
    pub start_time: DateTime<Utc>,
    /// Scheduled return time
    pub end_time: DateTime<Utc>,
    /// Rate card snapshot taken at creation; later vehicle price changes
    /// never touch an existing booking
    pub hourly_rate: i64,
    pub daily_rate: i64,
    /// Rental price for the scheduled window (VND)
    pub total_amount: i64,
    /// Deposit held until settlement (VND)
    pub deposit_amount: i64,
    /// Late-return fee recorded at check-out
    pub late_fee: i64,
    /// Damage fee recorded at check-out
    pub damage_fee: i64,
    /// Owed by the renter after settlement
    pub extra_amount: i64,
    /// Owed back to the renter after settlement
    pub refund_amount: i64,
    pub status: BookingStatus,
    pub cancel_reason: Option<String>,
    pub actual_check_in_at: Option<DateTime<Utc>>,
    pub actual_check_out_at: Option<DateTime<Utc>>,
    pub check_in_note: Option<String>,
    /// Handover condition photo, if staff attached one
    pub check_in_photo_url: Option<String>,
    pub check_out_note: Option<String>,
    pub check_out_photo_url: Option<String>,
    /// Staff user that confirmed the refund payout
    pub refund_confirmed_by: Option<String>,
    pub refund_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        renter_id: impl Into<String>,
        vehicle_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        hourly_rate: i64,
        daily_rate: i64,
        total_amount: i64,
        deposit_amount: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            renter_id: renter_id.into(),
            vehicle_id,
            pickup_station_id: None,
            return_station_id: None,
            start_time,
            end_time,
            hourly_rate,
            daily_rate,
            total_amount,
            deposit_amount,
            late_fee: 0,
            damage_fee: 0,
            extra_amount: 0,
            refund_amount: 0,
            status: BookingStatus::Pending,
            cancel_reason: None,
            actual_check_in_at: None,
            actual_check_out_at: None,
            check_in_note: None,
            check_in_photo_url: None,
            check_out_note: None,
            check_out_photo_url: None,
            refund_confirmed_by: None,
            refund_confirmed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Pickup is allowed within `grace_minutes` on either side of the
    /// scheduled start.
    pub fn check_in_window_open(&self, now: DateTime<Utc>, grace_minutes: i64) -> bool {
        let grace = Duration::minutes(grace_minutes);
        now >= self.start_time - grace && now <= self.start_time + grace
    }

    /// A paid cancellation keeps the deposit refundable only when made
    /// at least `cutoff_hours` before the scheduled start.
    pub fn cancel_refunds_deposit(&self, now: DateTime<Utc>, cutoff_hours: i64) -> bool {
        now <= self.start_time - Duration::hours(cutoff_hours)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_booking() -> Booking {
        let start = Utc::now() + Duration::days(2);
        Booking::new(
            "user-1",
            Uuid::new_v4(),
            start,
            start + Duration::days(1),
            50_000,
            800_000,
            800_000,
            240_000,
        )
    }

    #[test]
    fn new_booking_starts_pending() {
        let b = sample_booking();
        assert_eq!(b.status, BookingStatus::Pending);
        assert_eq!(b.late_fee, 0);
        assert_eq!(b.extra_amount, 0);
        assert!(!b.is_terminal());
    }

    #[test]
    fn deposit_is_percent_rounded_down() {
        assert_eq!(deposit_for(800_000, 30), 240_000);
        assert_eq!(deposit_for(1_000_001, 30), 300_000);
        assert_eq!(deposit_for(0, 30), 0);
    }

    #[test]
    fn pre_pickup_statuses_hold_the_vehicle() {
        assert!(BookingStatus::Pending.holds_vehicle());
        assert!(BookingStatus::DepositPaid.holds_vehicle());
        assert!(BookingStatus::CheckedIn.holds_vehicle());
        assert!(!BookingStatus::CheckedOut.holds_vehicle());
        assert!(!BookingStatus::Cancelled.holds_vehicle());
        assert!(!BookingStatus::Completed.holds_vehicle());
    }

    #[test]
    fn cancellation_stops_at_pickup() {
        assert!(BookingStatus::Pending.is_cancellable());
        assert!(BookingStatus::DepositPaid.is_cancellable());
        assert!(!BookingStatus::CheckedIn.is_cancellable());
        assert!(!BookingStatus::RefundPending.is_cancellable());
        assert!(!BookingStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn terminal_statuses() {
        assert!(BookingStatus::Completed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(!BookingStatus::RefundPending.is_terminal());
        assert!(!BookingStatus::ExtraPaymentPending.is_terminal());
    }

    #[test]
    fn status_roundtrip() {
        for s in [
            BookingStatus::Pending,
            BookingStatus::ContractPending,
            BookingStatus::ContractSigned,
            BookingStatus::DepositPaid,
            BookingStatus::CheckedIn,
            BookingStatus::CheckedOut,
            BookingStatus::ExtraPaymentPending,
            BookingStatus::RefundPending,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::from_str(s.as_str()), s);
        }
    }

    #[test]
    fn unknown_status_defaults_to_cancelled() {
        assert_eq!(BookingStatus::from_str("???"), BookingStatus::Cancelled);
    }

    #[test]
    fn overlap_is_strict_on_edges() {
        let t = Utc::now();
        let h = Duration::hours(1);
        // back-to-back windows do not collide
        assert!(!windows_overlap(t, t + h, t + h, t + h + h));
        // nested windows do
        assert!(windows_overlap(t, t + h + h, t + h, t + h + h));
        // disjoint windows do not
        assert!(!windows_overlap(t, t + h, t + h + h, t + h + h + h));
    }

    #[test]
    fn check_in_window_spans_grace_both_sides() {
        let b = sample_booking();
        assert!(b.check_in_window_open(b.start_time, 60));
        assert!(b.check_in_window_open(b.start_time - Duration::minutes(60), 60));
        assert!(b.check_in_window_open(b.start_time + Duration::minutes(60), 60));
        assert!(!b.check_in_window_open(b.start_time - Duration::minutes(61), 60));
        assert!(!b.check_in_window_open(b.start_time + Duration::minutes(61), 60));
    }

    #[test]
    fn refund_eligibility_follows_cutoff() {
        let b = sample_booking();
        assert!(b.cancel_refunds_deposit(b.start_time - Duration::hours(25), 24));
        assert!(b.cancel_refunds_deposit(b.start_time - Duration::hours(24), 24));
        assert!(!b.cancel_refunds_deposit(b.start_time - Duration::hours(23), 24));
    }
}
