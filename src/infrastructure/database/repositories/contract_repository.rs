//! SeaORM implementation of ContractRepository
//!
//! Lookups exclude soft-deleted rows. Signature and expiry flips are
//! conditional on the Pending status so a signed contract can never be
//! expired and a link can never be used twice.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;
use uuid::Uuid;

use crate::domain::contract::{Contract, ContractRepository, ContractStatus, SignatureRecord};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::contract;

pub struct SeaOrmContractRepository {
    db: DatabaseConnection,
}

impl SeaOrmContractRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: contract::Model) -> Contract {
    Contract {
        id: m.id,
        booking_id: m.booking_id,
        contract_number: m.contract_number,
        renter_name: m.renter_name,
        vehicle_plate: m.vehicle_plate,
        content: m.content,
        content_hash: m.content_hash,
        status: ContractStatus::from_str(&m.status),
        token_hash: m.token_hash,
        token_expires_at: m.token_expires_at,
        signed_at: m.signed_at,
        signed_ip: m.signed_ip,
        signed_user_agent: m.signed_user_agent,
        deleted_at: m.deleted_at,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

// ── ContractRepository impl ─────────────────────────────────────

#[async_trait]
impl ContractRepository for SeaOrmContractRepository {
    async fn save(&self, c: Contract) -> DomainResult<()> {
        debug!("Saving contract: {} ({})", c.contract_number, c.id);

        let model = contract::ActiveModel {
            id: Set(c.id),
            booking_id: Set(c.booking_id),
            contract_number: Set(c.contract_number),
            renter_name: Set(c.renter_name),
            vehicle_plate: Set(c.vehicle_plate),
            content: Set(c.content),
            content_hash: Set(c.content_hash),
            status: Set(c.status.as_str().to_string()),
            token_hash: Set(c.token_hash),
            token_expires_at: Set(c.token_expires_at),
            signed_at: Set(c.signed_at),
            signed_ip: Set(c.signed_ip),
            signed_user_agent: Set(c.signed_user_agent),
            deleted_at: Set(c.deleted_at),
            created_at: Set(c.created_at),
            updated_at: Set(c.updated_at),
        };
        model.insert(&self.db).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Contract>> {
        let model = contract::Entity::find_by_id(id)
            .filter(contract::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> DomainResult<Option<Contract>> {
        let model = contract::Entity::find()
            .filter(contract::Column::BookingId.eq(booking_id))
            .filter(contract::Column::DeletedAt.is_null())
            .order_by_desc(contract::Column::CreatedAt)
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> DomainResult<Option<Contract>> {
        let model = contract::Entity::find()
            .filter(contract::Column::TokenHash.eq(token_hash))
            .filter(contract::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_domain))
    }

    async fn mark_signed(&self, id: Uuid, signature: SignatureRecord) -> DomainResult<bool> {
        let result = contract::Entity::update_many()
            .col_expr(
                contract::Column::Status,
                Expr::value(ContractStatus::Signed.as_str()),
            )
            // Single-use link: the digest goes away with the signature
            .col_expr(contract::Column::TokenHash, Expr::value(Option::<String>::None))
            .col_expr(contract::Column::SignedAt, Expr::value(Some(signature.at)))
            .col_expr(contract::Column::SignedIp, Expr::value(signature.ip))
            .col_expr(
                contract::Column::SignedUserAgent,
                Expr::value(signature.user_agent),
            )
            .col_expr(contract::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(contract::Column::Id.eq(id))
            .filter(contract::Column::Status.eq(ContractStatus::Pending.as_str()))
            .filter(contract::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn mark_expired(&self, id: Uuid) -> DomainResult<bool> {
        let result = contract::Entity::update_many()
            .col_expr(
                contract::Column::Status,
                Expr::value(ContractStatus::Expired.as_str()),
            )
            .col_expr(contract::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(contract::Column::Id.eq(id))
            .filter(contract::Column::Status.eq(ContractStatus::Pending.as_str()))
            .filter(contract::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn soft_delete(&self, id: Uuid) -> DomainResult<bool> {
        let result = contract::Entity::update_many()
            .col_expr(contract::Column::DeletedAt, Expr::value(Some(Utc::now())))
            .col_expr(contract::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(contract::Column::Id.eq(id))
            .filter(contract::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> DomainResult<Vec<Contract>> {
        let models = contract::Entity::find()
            .filter(contract::Column::Status.eq(ContractStatus::Pending.as_str()))
            .filter(contract::Column::DeletedAt.is_null())
            .filter(contract::Column::TokenExpiresAt.lt(now))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn count_for_year(&self, year: i32) -> DomainResult<u64> {
        // Soft-deleted rows keep their number, so they still count
        let count = contract::Entity::find()
            .filter(contract::Column::CreatedAt.gte(year_start(year)))
            .filter(contract::Column::CreatedAt.lt(year_start(year + 1)))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}

/// Midnight UTC on January 1st of `year`. Falls back to the epoch for
/// years chrono cannot represent, which no real clock will produce.
fn year_start(year: i32) -> DateTime<Utc> {
    chrono::NaiveDate::from_ymd_opt(year, 1, 1)
        .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
        .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn year_start_is_january_first() {
        let start = year_start(2026);
        assert_eq!(start.year(), 2026);
        assert_eq!(start.ordinal(), 1);
        assert_eq!(start.to_rfc3339(), "2026-01-01T00:00:00+00:00");
    }
}
