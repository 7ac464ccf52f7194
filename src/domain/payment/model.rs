//! Payment domain entity
//!
//! One ledger row per money movement. A booking has at most one open
//! (Pending or Success) payment per type; re-requesting an open payment
//! returns the existing row instead of creating a duplicate.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// What the money movement is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentType {
    /// Up-front deposit holding the booking
    Deposit,
    /// Main rental charge
    Rental,
    /// Post-settlement charge (late / damage beyond the deposit)
    Extra,
    /// Deposit flowing back to the renter
    Refund,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "Deposit",
            Self::Rental => "Rental",
            Self::Extra => "Extra",
            Self::Refund => "Refund",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Deposit" => Self::Deposit,
            "Rental" => Self::Rental,
            "Refund" => Self::Refund,
            _ => Self::Extra,
        }
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Awaiting confirmation from the gateway
    Pending,
    /// Money confirmed; this state is sticky
    Success,
    /// Rejected or abandoned at the gateway
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Success => "Success",
            Self::Failed => "Failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Pending" => Self::Pending,
            "Success" => Self::Success,
            _ => Self::Failed,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ledger entry for one money movement
#[derive(Debug, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub payment_type: PaymentType,
    /// Amount in VND
    pub amount: i64,
    pub status: PaymentStatus,
    /// Server-issued gateway reference (Unix epoch millis, unique)
    pub order_code: i64,
    pub checkout_url: Option<String>,
    pub qr_code: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    /// Gateway-side transaction reference, recorded on success
    pub transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(booking_id: Uuid, payment_type: PaymentType, amount: i64, order_code: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booking_id,
            payment_type,
            amount,
            status: PaymentStatus::Pending,
            order_code,
            checkout_url: None,
            qr_code: None,
            paid_at: None,
            transaction_id: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Pending and Success rows block opening another payment of the
    /// same type; only Failed rows may be replaced.
    pub fn is_open(&self) -> bool {
        matches!(self.status, PaymentStatus::Pending | PaymentStatus::Success)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payment() -> Payment {
        Payment::new(Uuid::new_v4(), PaymentType::Deposit, 240_000, 1_717_000_000_000)
    }

    #[test]
    fn new_payment_starts_pending() {
        let p = sample_payment();
        assert_eq!(p.status, PaymentStatus::Pending);
        assert!(p.paid_at.is_none());
        assert!(p.is_open());
    }

    #[test]
    fn failed_payment_is_not_open() {
        let mut p = sample_payment();
        p.status = PaymentStatus::Failed;
        assert!(!p.is_open());

        p.status = PaymentStatus::Success;
        assert!(p.is_open());
    }

    #[test]
    fn type_roundtrip() {
        for t in [
            PaymentType::Deposit,
            PaymentType::Rental,
            PaymentType::Extra,
            PaymentType::Refund,
        ] {
            assert_eq!(PaymentType::from_str(t.as_str()), t);
        }
    }

    #[test]
    fn status_roundtrip() {
        for s in [
            PaymentStatus::Pending,
            PaymentStatus::Success,
            PaymentStatus::Failed,
        ] {
            assert_eq!(PaymentStatus::from_str(s.as_str()), s);
        }
    }

    #[test]
    fn unknown_status_defaults_to_failed() {
        assert_eq!(PaymentStatus::from_str("???"), PaymentStatus::Failed);
    }
}
