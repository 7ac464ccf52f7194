//! Return settlement calculator
//!
//! Pure money math for closing out a rental: late fees, damage fees and
//! how they net against the held deposit. No clock reads, no I/O; every
//! input comes in as an argument so the whole module is table-testable.

use chrono::{DateTime, Duration, Utc};

/// Outcome of netting fees against the deposit at return time.
///
/// Exactly one of `extra_amount` / `refund_amount` can be non-zero:
/// either the renter still owes money, or part of the deposit flows back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Whole billable hours past the expected return
    pub late_hours: i64,
    /// late_hours x hourly late rate
    pub late_fee: i64,
    /// Amount still owed by the renter after the deposit is applied
    pub extra_amount: i64,
    /// Deposit portion flowing back to the renter
    pub refund_amount: i64,
}

/// Billable late hours: elapsed time past `expected_return`, rounded up
/// to whole hours. Early or on-time returns count as zero.
pub fn late_hours(expected_return: DateTime<Utc>, actual_return: DateTime<Utc>) -> i64 {
    let overdue = actual_return - expected_return;
    if overdue <= Duration::zero() {
        return 0;
    }
    // Ceil to whole hours: 1 second late is 1 billable hour
    (overdue.num_seconds() + 3599) / 3600
}

/// Net the return charges against the held deposit.
///
/// `net = late_fee + damage_fee - deposit`. A positive net becomes an
/// extra charge; a non-positive net becomes a (partial or full) refund.
pub fn settle(
    expected_return: DateTime<Utc>,
    actual_return: DateTime<Utc>,
    hourly_late_rate: i64,
    damage_fee: i64,
    deposit: i64,
) -> Settlement {
    let late_hours = late_hours(expected_return, actual_return);
    let late_fee = late_hours * hourly_late_rate;

    let net = late_fee + damage_fee - deposit;
    let (extra_amount, refund_amount) = if net > 0 { (net, 0) } else { (0, -net) };

    Settlement {
        late_hours,
        late_fee,
        extra_amount,
        refund_amount,
    }
}

/// Collapse a return inside the grace window onto the expected time.
///
/// Returns `expected_return` when the actual return is no more than
/// `grace_minutes` past it, so a tolerated delay produces zero late fee.
/// Returns outside the window keep their full lateness.
pub fn apply_late_grace(
    expected_return: DateTime<Utc>,
    actual_return: DateTime<Utc>,
    grace_minutes: i64,
) -> DateTime<Utc> {
    let overdue = actual_return - expected_return;
    if overdue > Duration::zero() && overdue <= Duration::minutes(grace_minutes) {
        expected_return
    } else {
        actual_return
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn three_hours_late_charges_extra_over_deposit() {
        let t = base_time();
        let s = settle(t, t + Duration::hours(3), 50_000, 0, 100_000);

        assert_eq!(s.late_hours, 3);
        assert_eq!(s.late_fee, 150_000);
        assert_eq!(s.extra_amount, 50_000);
        assert_eq!(s.refund_amount, 0);
    }

    #[test]
    fn early_return_refunds_full_deposit() {
        let t = base_time();
        let s = settle(t, t - Duration::hours(1), 50_000, 0, 100_000);

        assert_eq!(s.late_hours, 0);
        assert_eq!(s.late_fee, 0);
        assert_eq!(s.extra_amount, 0);
        assert_eq!(s.refund_amount, 100_000);
    }

    #[test]
    fn partial_hour_bills_as_full_hour() {
        let t = base_time();
        assert_eq!(late_hours(t, t + Duration::minutes(61)), 2);
        assert_eq!(late_hours(t, t + Duration::seconds(1)), 1);
        assert_eq!(late_hours(t, t + Duration::hours(2)), 2);
    }

    #[test]
    fn on_time_return_is_not_late() {
        let t = base_time();
        assert_eq!(late_hours(t, t), 0);
    }

    #[test]
    fn damage_fee_nets_against_deposit() {
        let t = base_time();
        // On time, 80k damage against 100k deposit: 20k back
        let s = settle(t, t, 50_000, 80_000, 100_000);
        assert_eq!(s.extra_amount, 0);
        assert_eq!(s.refund_amount, 20_000);
    }

    #[test]
    fn charges_exactly_matching_deposit_refund_nothing() {
        let t = base_time();
        let s = settle(t, t + Duration::hours(2), 50_000, 0, 100_000);
        assert_eq!(s.late_fee, 100_000);
        assert_eq!(s.extra_amount, 0);
        assert_eq!(s.refund_amount, 0);
    }

    #[test]
    fn grace_window_swallows_small_delay() {
        let t = base_time();
        let actual = t + Duration::minutes(20);
        assert_eq!(apply_late_grace(t, actual, 30), t);
    }

    #[test]
    fn grace_boundary_is_inclusive() {
        let t = base_time();
        let actual = t + Duration::minutes(30);
        assert_eq!(apply_late_grace(t, actual, 30), t);
    }

    #[test]
    fn beyond_grace_keeps_full_lateness() {
        let t = base_time();
        let actual = t + Duration::minutes(31);
        assert_eq!(apply_late_grace(t, actual, 30), actual);

        let s = settle(t, apply_late_grace(t, actual, 30), 50_000, 0, 100_000);
        assert_eq!(s.late_fee, 50_000);
    }

    #[test]
    fn early_return_passes_grace_untouched() {
        let t = base_time();
        let actual = t - Duration::hours(2);
        assert_eq!(apply_late_grace(t, actual, 30), actual);
    }
}
