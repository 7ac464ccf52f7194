//! Rental contract domain entity
//!
//! Contracts are signed anonymously via a single-use token link. Only the
//! SHA-256 digest of the token is ever stored; losing the raw token means
//! re-issuing the contract.

use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

/// Contract signature status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractStatus {
    /// Issued, waiting for the renter's signature
    Pending,
    /// Signed by the renter
    Signed,
    /// Signing window elapsed before a signature arrived
    Expired,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Signed => "Signed",
            Self::Expired => "Expired",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Pending" => Self::Pending,
            "Signed" => Self::Signed,
            _ => Self::Expired,
        }
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Human-readable contract number: `HD-<year>-<sequence>`, e.g. HD-2025-000042.
pub fn format_contract_number(year: i32, sequence: u32) -> String {
    format!("HD-{}-{:06}", year, sequence)
}

/// Contract number for the current year.
pub fn contract_number_for(now: DateTime<Utc>, sequence: u32) -> String {
    format_contract_number(now.year(), sequence)
}

/// Rental contract tied to one booking
#[derive(Debug, Clone)]
pub struct Contract {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub contract_number: String,
    /// Renter's name as printed on the agreement, frozen at issue time
    pub renter_name: String,
    /// Plate of the rented vehicle, frozen at issue time
    pub vehicle_plate: String,
    /// Rendered contract text shown to the signer
    pub content: String,
    /// SHA-256 of `content`, proving what was signed
    pub content_hash: String,
    pub status: ContractStatus,
    /// SHA-256 of the signing token; cleared once signed
    pub token_hash: Option<String>,
    pub token_expires_at: DateTime<Utc>,
    pub signed_at: Option<DateTime<Utc>>,
    pub signed_ip: Option<String>,
    pub signed_user_agent: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything the gate freezes into a new contract row.
#[derive(Debug, Clone)]
pub struct ContractDraft {
    pub booking_id: Uuid,
    pub contract_number: String,
    pub renter_name: String,
    pub vehicle_plate: String,
    pub content: String,
    pub content_hash: String,
    pub token_hash: String,
    pub token_expires_at: DateTime<Utc>,
}

impl Contract {
    pub fn new(draft: ContractDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booking_id: draft.booking_id,
            contract_number: draft.contract_number,
            renter_name: draft.renter_name,
            vehicle_plate: draft.vehicle_plate,
            content: draft.content,
            content_hash: draft.content_hash,
            status: ContractStatus::Pending,
            token_hash: Some(draft.token_hash),
            token_expires_at: draft.token_expires_at,
            signed_at: None,
            signed_ip: None,
            signed_user_agent: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_token_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.token_expires_at
    }

    /// A signature is accepted only on a live Pending contract with an
    /// unexpired token.
    pub fn is_signable(&self, now: DateTime<Utc>) -> bool {
        self.status == ContractStatus::Pending && !self.is_deleted() && !self.is_token_expired(now)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample_contract() -> Contract {
        Contract::new(ContractDraft {
            booking_id: Uuid::new_v4(),
            contract_number: "HD-2025-000001".into(),
            renter_name: "Nguyen Van Thanh".into(),
            vehicle_plate: "51F-123.45".into(),
            content: "RENTAL CONTRACT ...".into(),
            content_hash: "aabbcc".into(),
            token_hash: "deadbeef".into(),
            token_expires_at: Utc::now() + Duration::hours(24),
        })
    }

    #[test]
    fn new_contract_is_pending_with_token() {
        let c = sample_contract();
        assert_eq!(c.status, ContractStatus::Pending);
        assert!(c.token_hash.is_some());
        assert!(c.signed_at.is_none());
        assert!(!c.is_deleted());
    }

    #[test]
    fn signable_until_token_expires() {
        let c = sample_contract();
        assert!(c.is_signable(Utc::now()));
        assert!(!c.is_signable(c.token_expires_at + Duration::seconds(1)));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let c = sample_contract();
        assert!(!c.is_token_expired(c.token_expires_at));
        assert!(c.is_token_expired(c.token_expires_at + Duration::seconds(1)));
    }

    #[test]
    fn deleted_contract_is_not_signable() {
        let mut c = sample_contract();
        c.deleted_at = Some(Utc::now());
        assert!(!c.is_signable(Utc::now()));
    }

    #[test]
    fn contract_number_format() {
        assert_eq!(format_contract_number(2025, 42), "HD-2025-000042");
        assert_eq!(format_contract_number(2026, 1_234_567), "HD-2026-1234567");

        let at = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(contract_number_for(at, 7), "HD-2025-000007");
    }

    #[test]
    fn status_roundtrip() {
        for s in [
            ContractStatus::Pending,
            ContractStatus::Signed,
            ContractStatus::Expired,
        ] {
            assert_eq!(ContractStatus::from_str(s.as_str()), s);
        }
    }
}
