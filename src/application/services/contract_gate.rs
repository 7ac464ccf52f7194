//! Contract gate — issuing, viewing and signing rental contracts
//!
//! Signing links are anonymous: possession of the single-use token is
//! the credential. Only the SHA-256 digest of a token is stored, and the
//! digest is cleared by the signature write itself, so a link stops
//! resolving the moment it has been used.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Datelike, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::ports::DocumentRendererPort;
use crate::domain::{
    contract_number_for, Booking, Contract, ContractDraft, ContractStatus, DomainError,
    DomainResult, RepositoryProvider, SignatureRecord,
};

// ── Token helpers ───────────────────────────────────────────────

/// Generate a signing token: 48 random bytes, base64url without padding.
/// Returns `(raw_token, sha256_hex_digest)`; only the digest may be stored.
pub fn generate_signing_token() -> (String, String) {
    let mut bytes = [0u8; 48];
    rand::thread_rng().fill_bytes(&mut bytes);
    let raw = URL_SAFE_NO_PAD.encode(bytes);
    let digest = hash_token(&raw);
    (raw, digest)
}

/// SHA-256 hex digest of a raw token.
pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// SHA-256 hex digest of rendered contract content.
pub fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Constant-time byte comparison: the run time depends only on the
/// lengths, never on where the first mismatch sits.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

// ── Service ─────────────────────────────────────────────────────

pub struct ContractGateService {
    repos: Arc<dyn RepositoryProvider>,
    renderer: Arc<dyn DocumentRendererPort>,
    token_ttl_hours: i64,
}

impl ContractGateService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        renderer: Arc<dyn DocumentRendererPort>,
        token_ttl_hours: i64,
    ) -> Self {
        Self {
            repos,
            renderer,
            token_ttl_hours,
        }
    }

    /// Issue a contract for a booking and return it with the raw signing
    /// token. The contract snapshots the renter's legal name and the
    /// vehicle plate as they are at issue time. Re-issuing replaces a
    /// live unsigned contract (the old row is soft-deleted, its link
    /// dies); a signed contract is final.
    pub async fn issue(&self, booking: &Booking) -> DomainResult<(Contract, String)> {
        let vehicle = self
            .repos
            .vehicles()
            .find_by_id(booking.vehicle_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "Vehicle",
                field: "id",
                value: booking.vehicle_id.to_string(),
            })?;
        let renter = self
            .repos
            .users()
            .get_user_by_id(&booking.renter_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "User",
                field: "id",
                value: booking.renter_id.clone(),
            })?;

        if let Some(existing) = self.repos.contracts().find_by_booking(booking.id).await? {
            if existing.status == ContractStatus::Signed {
                return Err(DomainError::Conflict(
                    "Contract is already signed".to_string(),
                ));
            }
            // Unsigned (Pending or Expired): retire it and issue fresh
            self.repos.contracts().soft_delete(existing.id).await?;
            info!(
                contract_id = %existing.id,
                booking_id = %booking.id,
                "Replaced unsigned contract"
            );
        }

        let now = Utc::now();
        let sequence = self.repos.contracts().count_for_year(now.year()).await? + 1;
        let contract_number = contract_number_for(now, sequence as u32);

        let content = self
            .renderer
            .render_contract(&contract_number, &renter, booking, &vehicle)
            .await?;
        let content_hash = hash_content(&content);

        let (raw_token, token_digest) = generate_signing_token();
        let contract = Contract::new(ContractDraft {
            booking_id: booking.id,
            contract_number,
            renter_name: renter.display_name().to_string(),
            vehicle_plate: vehicle.license_plate.clone(),
            content,
            content_hash,
            token_hash: token_digest,
            token_expires_at: now + Duration::hours(self.token_ttl_hours),
        });
        self.repos.contracts().save(contract.clone()).await?;

        info!(
            contract_id = %contract.id,
            booking_id = %booking.id,
            contract_number = %contract.contract_number,
            expires_at = %contract.token_expires_at,
            "📝 Contract issued"
        );

        Ok((contract, raw_token))
    }

    /// Resolve a signing link for display.
    ///
    /// An expired link marks the contract Expired as a side effect before
    /// reporting the expiry, so the state reflects what the renter saw.
    pub async fn view_by_token(&self, token: &str) -> DomainResult<Contract> {
        let contract = self.find_live_by_token(token).await?;

        if contract.status == ContractStatus::Expired {
            return Err(DomainError::Expired(
                "Contract has expired, request a new one".to_string(),
            ));
        }
        if contract.is_token_expired(Utc::now()) {
            self.expire_contract(&contract).await?;
            return Err(DomainError::Expired(
                "Signing link has expired, request a new contract".to_string(),
            ));
        }

        Ok(contract)
    }

    /// Sign a contract through its token.
    ///
    /// The Pending -> Signed write clears the stored token digest, so the
    /// first signature invalidates the link for everyone else. A lost
    /// race (or a re-used link) reports a conflict without writing.
    pub async fn sign_with_token(
        &self,
        token: &str,
        ip: Option<String>,
        user_agent: Option<String>,
    ) -> DomainResult<Contract> {
        let contract = self.find_live_by_token(token).await?;

        if contract.status == ContractStatus::Expired {
            return Err(DomainError::Expired(
                "Contract has expired, request a new one".to_string(),
            ));
        }
        let now = Utc::now();
        if contract.is_token_expired(now) {
            self.expire_contract(&contract).await?;
            return Err(DomainError::Expired(
                "Signing link has expired, request a new contract".to_string(),
            ));
        }

        let signed = self
            .repos
            .contracts()
            .mark_signed(
                contract.id,
                SignatureRecord {
                    at: now,
                    ip,
                    user_agent,
                },
            )
            .await?;
        if !signed {
            let current = self.reload(contract.id).await?;
            return Err(match current.status {
                ContractStatus::Signed => {
                    DomainError::Conflict("Contract was already signed".to_string())
                }
                ContractStatus::Expired => DomainError::Expired(
                    "Contract has expired, request a new one".to_string(),
                ),
                ContractStatus::Pending => DomainError::Conflict(
                    "Contract signature lost a status race".to_string(),
                ),
            });
        }

        let contract = self.reload(contract.id).await?;
        info!(
            contract_id = %contract.id,
            booking_id = %contract.booking_id,
            contract_number = %contract.contract_number,
            "✍️ Contract signed"
        );

        Ok(contract)
    }

    /// Mark all overdue Pending contracts Expired. Returns how many
    /// actually flipped this sweep.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> DomainResult<usize> {
        let overdue = self.repos.contracts().find_overdue(now).await?;
        let mut expired = 0;
        for contract in overdue {
            match self.repos.contracts().mark_expired(contract.id).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(contract_id = %contract.id, error = %e, "Failed to expire contract");
                }
            }
        }
        if expired > 0 {
            info!(expired, "⏰ Expired overdue contracts");
        }
        Ok(expired)
    }

    /// Retire a contract so its link stops resolving. The row survives
    /// for audit.
    pub async fn revoke(&self, contract_id: Uuid) -> DomainResult<()> {
        let existed = self.repos.contracts().soft_delete(contract_id).await?;
        if !existed {
            return Err(DomainError::NotFound {
                entity: "Contract",
                field: "id",
                value: contract_id.to_string(),
            });
        }
        info!(contract_id = %contract_id, "Contract revoked");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<Option<Contract>> {
        self.repos.contracts().find_by_id(id).await
    }

    pub async fn get_by_booking(&self, booking_id: Uuid) -> DomainResult<Option<Contract>> {
        self.repos.contracts().find_by_booking(booking_id).await
    }

    // ── Internals ───────────────────────────────────────────────

    /// Look up the live contract holding this token. A digest that no
    /// longer resolves means the link is bogus or was already used; the
    /// two are indistinguishable once the digest has been cleared.
    async fn find_live_by_token(&self, token: &str) -> DomainResult<Contract> {
        let digest = hash_token(token);
        let contract = self
            .repos
            .contracts()
            .find_by_token_hash(&digest)
            .await?
            .ok_or_else(|| {
                DomainError::Unauthorized(
                    "Signing link is invalid or was already used".to_string(),
                )
            })?;

        // The lookup matched on the digest; verify it in constant time
        // anyway so equality here never becomes a timing oracle.
        let stored = contract.token_hash.as_deref().unwrap_or_default();
        if !constant_time_eq(stored.as_bytes(), digest.as_bytes()) {
            return Err(DomainError::Unauthorized(
                "Signing link is invalid or was already used".to_string(),
            ));
        }

        Ok(contract)
    }

    async fn expire_contract(&self, contract: &Contract) -> DomainResult<()> {
        if self.repos.contracts().mark_expired(contract.id).await? {
            info!(
                contract_id = %contract.id,
                booking_id = %contract.booking_id,
                "Contract expired on access"
            );
        }
        Ok(())
    }

    async fn reload(&self, id: Uuid) -> DomainResult<Contract> {
        self.repos
            .contracts()
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "Contract",
                field: "id",
                value: id.to_string(),
            })
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CreateUserDto, Vehicle};
    use crate::infrastructure::render::TemplateRenderer;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;

    fn sample_vehicle() -> Vehicle {
        Vehicle::new("51F-123.45", "VinFast", "VF e34", 2024, "White", 50_000, 800_000)
    }

    fn sample_booking(renter_id: &str, vehicle_id: Uuid) -> Booking {
        let start = Utc::now() + Duration::days(1);
        Booking::new(
            renter_id,
            vehicle_id,
            start,
            start + Duration::days(1),
            50_000,
            800_000,
            800_000,
            240_000,
        )
    }

    /// Create a renter account and return its generated id.
    async fn seed_renter(repos: &InMemoryRepositoryProvider) -> String {
        repos
            .users()
            .create_user(CreateUserDto {
                username: "ngthanh".into(),
                email: "thanh@example.com".into(),
                role: None,
                password: "rent-a-car-2026".into(),
                full_name: Some("Nguyen Van Thanh".into()),
                phone: Some("+84 90 123 4567".into()),
                driver_license_no: Some("B2-123456".into()),
            })
            .await
            .unwrap();
        repos
            .users()
            .get_user_by_username("ngthanh")
            .await
            .unwrap()
            .unwrap()
            .id
    }

    async fn gate_with_booking() -> (ContractGateService, Booking) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let renter_id = seed_renter(&repos).await;
        let vehicle = sample_vehicle();
        let booking = sample_booking(&renter_id, vehicle.id);
        repos.vehicles().save(vehicle).await.unwrap();
        repos.bookings().save(booking.clone()).await.unwrap();

        let gate = ContractGateService::new(repos, Arc::new(TemplateRenderer::new()), 24);
        (gate, booking)
    }

    #[test]
    fn tokens_are_unique_and_hash_deterministically() {
        let (raw_a, digest_a) = generate_signing_token();
        let (raw_b, digest_b) = generate_signing_token();

        assert_ne!(raw_a, raw_b);
        assert_ne!(digest_a, digest_b);
        assert_eq!(hash_token(&raw_a), digest_a);
        // 48 bytes -> 64 base64url chars, 32-byte digest -> 64 hex chars
        assert_eq!(raw_a.len(), 64);
        assert_eq!(digest_a.len(), 64);
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }

    #[tokio::test]
    async fn issue_then_view_roundtrip() {
        let (gate, booking) = gate_with_booking().await;
        let (contract, token) = gate.issue(&booking).await.unwrap();

        assert_eq!(contract.status, ContractStatus::Pending);
        assert!(contract.contract_number.starts_with("HD-"));
        assert_eq!(contract.content_hash, hash_content(&contract.content));

        let viewed = gate.view_by_token(&token).await.unwrap();
        assert_eq!(viewed.id, contract.id);
    }

    #[tokio::test]
    async fn contract_snapshots_renter_and_vehicle() {
        let (gate, booking) = gate_with_booking().await;
        let (contract, _) = gate.issue(&booking).await.unwrap();

        assert_eq!(contract.renter_name, "Nguyen Van Thanh");
        assert_eq!(contract.vehicle_plate, "51F-123.45");
        assert!(contract.content.contains("Nguyen Van Thanh"));
        assert!(contract.content.contains("51F-123.45"));
    }

    #[tokio::test]
    async fn issue_without_renter_account_fails() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let vehicle = sample_vehicle();
        let booking = sample_booking("ghost", vehicle.id);
        repos.vehicles().save(vehicle).await.unwrap();
        repos.bookings().save(booking.clone()).await.unwrap();

        let gate = ContractGateService::new(repos, Arc::new(TemplateRenderer::new()), 24);
        let result = gate.issue(&booking).await;
        assert!(matches!(
            result,
            Err(DomainError::NotFound { entity: "User", .. })
        ));
    }

    #[tokio::test]
    async fn signing_twice_fails_second_time() {
        let (gate, booking) = gate_with_booking().await;
        let (_, token) = gate.issue(&booking).await.unwrap();

        let signed = gate
            .sign_with_token(&token, Some("10.0.0.1".into()), None)
            .await
            .unwrap();
        assert_eq!(signed.status, ContractStatus::Signed);
        assert!(signed.token_hash.is_none());
        assert!(signed.signed_at.is_some());

        // Token digest was cleared by the signature: link is dead
        let again = gate.sign_with_token(&token, None, None).await;
        assert!(matches!(again, Err(DomainError::Unauthorized(_))));

        let reloaded = gate.get(signed.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, ContractStatus::Signed);
    }

    #[tokio::test]
    async fn bogus_token_is_unauthorized() {
        let (gate, booking) = gate_with_booking().await;
        gate.issue(&booking).await.unwrap();

        let result = gate.view_by_token("not-a-real-token").await;
        assert!(matches!(result, Err(DomainError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn reissue_kills_previous_link() {
        let (gate, booking) = gate_with_booking().await;
        let (first, first_token) = gate.issue(&booking).await.unwrap();
        let (second, second_token) = gate.issue(&booking).await.unwrap();

        assert_ne!(first.id, second.id);
        assert!(matches!(
            gate.view_by_token(&first_token).await,
            Err(DomainError::Unauthorized(_))
        ));
        assert_eq!(
            gate.view_by_token(&second_token).await.unwrap().id,
            second.id
        );
    }

    #[tokio::test]
    async fn reissue_after_signature_is_rejected() {
        let (gate, booking) = gate_with_booking().await;
        let (_, token) = gate.issue(&booking).await.unwrap();
        gate.sign_with_token(&token, None, None).await.unwrap();

        let result = gate.issue(&booking).await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn expired_link_marks_contract_and_reports_expiry() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let renter_id = seed_renter(&repos).await;
        let vehicle = sample_vehicle();
        let booking = sample_booking(&renter_id, vehicle.id);
        repos.vehicles().save(vehicle).await.unwrap();
        repos.bookings().save(booking.clone()).await.unwrap();

        // TTL of zero hours: the token is expired the moment it exists
        let gate = ContractGateService::new(repos, Arc::new(TemplateRenderer::new()), 0);
        let (contract, token) = gate.issue(&booking).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let result = gate.view_by_token(&token).await;
        assert!(matches!(result, Err(DomainError::Expired(_))));

        let reloaded = gate.get(contract.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, ContractStatus::Expired);
    }

    #[tokio::test]
    async fn sweep_expires_overdue_contracts_once() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let renter_id = seed_renter(&repos).await;
        let vehicle = sample_vehicle();
        let booking = sample_booking(&renter_id, vehicle.id);
        repos.vehicles().save(vehicle).await.unwrap();
        repos.bookings().save(booking.clone()).await.unwrap();

        let gate = ContractGateService::new(repos, Arc::new(TemplateRenderer::new()), 0);
        gate.issue(&booking).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let first = gate.expire_overdue(Utc::now()).await.unwrap();
        let second = gate.expire_overdue(Utc::now()).await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn contract_numbers_increment_within_year() {
        let (gate, booking) = gate_with_booking().await;
        let (first, _) = gate.issue(&booking).await.unwrap();
        let (second, _) = gate.issue(&booking).await.unwrap();

        let year = Utc::now().year();
        assert_eq!(first.contract_number, format!("HD-{}-000001", year));
        assert_eq!(second.contract_number, format!("HD-{}-000002", year));
    }
}
