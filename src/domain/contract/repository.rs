//! Contract repository interface
//!
//! Lookups skip soft-deleted rows. Signature and expiry are conditional
//! writes so a contract can never be signed twice or expire after signing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::Contract;
use crate::domain::DomainResult;

/// Who signed, from where, recorded with the Signed transition.
#[derive(Debug, Clone)]
pub struct SignatureRecord {
    pub at: DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[async_trait]
pub trait ContractRepository: Send + Sync {
    /// Save a new contract
    async fn save(&self, contract: Contract) -> DomainResult<()>;

    /// Find contract by ID (excluding soft-deleted)
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Contract>>;

    /// Latest live contract for a booking
    async fn find_by_booking(&self, booking_id: Uuid) -> DomainResult<Option<Contract>>;

    /// Find contract by the digest of its signing token
    async fn find_by_token_hash(&self, token_hash: &str) -> DomainResult<Option<Contract>>;

    /// Pending -> Signed, clearing the token hash so the link is single-use.
    /// Returns false when the contract was no longer Pending.
    async fn mark_signed(&self, id: Uuid, signature: SignatureRecord) -> DomainResult<bool>;

    /// Pending -> Expired. Returns false when already signed or expired.
    async fn mark_expired(&self, id: Uuid) -> DomainResult<bool>;

    /// Soft-delete: hide from lookups, keep the row for audit
    async fn soft_delete(&self, id: Uuid) -> DomainResult<bool>;

    /// Live Pending contracts whose token expired before `now`
    async fn find_overdue(&self, now: DateTime<Utc>) -> DomainResult<Vec<Contract>>;

    /// Contracts issued this calendar year, for numbering
    async fn count_for_year(&self, year: i32) -> DomainResult<u64>;
}
