//! SeaORM implementation of PaymentRepository
//!
//! Success and failure flips are conditional on the Pending status, which
//! makes Success sticky at the SQL level: a late "failed" verdict from the
//! gateway cannot overwrite a row that already settled.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;
use uuid::Uuid;

use crate::domain::payment::{Payment, PaymentRepository, PaymentStatus, PaymentType};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::payment;

pub struct SeaOrmPaymentRepository {
    db: DatabaseConnection,
}

impl SeaOrmPaymentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: payment::Model) -> Payment {
    Payment {
        id: m.id,
        booking_id: m.booking_id,
        payment_type: PaymentType::from_str(&m.payment_type),
        amount: m.amount,
        status: PaymentStatus::from_str(&m.status),
        order_code: m.order_code,
        checkout_url: m.checkout_url,
        qr_code: m.qr_code,
        paid_at: m.paid_at,
        transaction_id: m.transaction_id,
        failure_reason: m.failure_reason,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

// ── PaymentRepository impl ──────────────────────────────────────

#[async_trait]
impl PaymentRepository for SeaOrmPaymentRepository {
    async fn save(&self, p: Payment) -> DomainResult<()> {
        debug!("Saving payment: {} order {}", p.id, p.order_code);

        let model = payment::ActiveModel {
            id: Set(p.id),
            booking_id: Set(p.booking_id),
            payment_type: Set(p.payment_type.as_str().to_string()),
            amount: Set(p.amount),
            status: Set(p.status.as_str().to_string()),
            order_code: Set(p.order_code),
            checkout_url: Set(p.checkout_url),
            qr_code: Set(p.qr_code),
            paid_at: Set(p.paid_at),
            transaction_id: Set(p.transaction_id),
            failure_reason: Set(p.failure_reason),
            created_at: Set(p.created_at),
            updated_at: Set(p.updated_at),
        };
        model.insert(&self.db).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Payment>> {
        let model = payment::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_order_code(&self, order_code: i64) -> DomainResult<Option<Payment>> {
        let model = payment::Entity::find()
            .filter(payment::Column::OrderCode.eq(order_code))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_domain))
    }

    async fn find_open(
        &self,
        booking_id: Uuid,
        payment_type: PaymentType,
    ) -> DomainResult<Option<Payment>> {
        let model = payment::Entity::find()
            .filter(payment::Column::BookingId.eq(booking_id))
            .filter(payment::Column::PaymentType.eq(payment_type.as_str()))
            .filter(payment::Column::Status.is_in([
                PaymentStatus::Pending.as_str(),
                PaymentStatus::Success.as_str(),
            ]))
            .order_by_desc(payment::Column::CreatedAt)
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_domain))
    }

    async fn find_pending_for_booking(&self, booking_id: Uuid) -> DomainResult<Vec<Payment>> {
        let models = payment::Entity::find()
            .filter(payment::Column::BookingId.eq(booking_id))
            .filter(payment::Column::Status.eq(PaymentStatus::Pending.as_str()))
            .order_by_asc(payment::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn list_for_booking(&self, booking_id: Uuid) -> DomainResult<Vec<Payment>> {
        let models = payment::Entity::find()
            .filter(payment::Column::BookingId.eq(booking_id))
            .order_by_asc(payment::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn order_code_taken(&self, order_code: i64) -> DomainResult<bool> {
        let count = payment::Entity::find()
            .filter(payment::Column::OrderCode.eq(order_code))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn mark_success(
        &self,
        order_code: i64,
        paid_at: DateTime<Utc>,
        transaction_ref: Option<&str>,
    ) -> DomainResult<bool> {
        let result = payment::Entity::update_many()
            .col_expr(
                payment::Column::Status,
                Expr::value(PaymentStatus::Success.as_str()),
            )
            .col_expr(payment::Column::PaidAt, Expr::value(Some(paid_at)))
            .col_expr(
                payment::Column::TransactionId,
                Expr::value(transaction_ref.map(str::to_string)),
            )
            .col_expr(payment::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(payment::Column::OrderCode.eq(order_code))
            .filter(payment::Column::Status.eq(PaymentStatus::Pending.as_str()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn mark_failed(&self, order_code: i64, reason: &str) -> DomainResult<bool> {
        let result = payment::Entity::update_many()
            .col_expr(
                payment::Column::Status,
                Expr::value(PaymentStatus::Failed.as_str()),
            )
            .col_expr(
                payment::Column::FailureReason,
                Expr::value(Some(reason.to_string())),
            )
            .col_expr(payment::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(payment::Column::OrderCode.eq(order_code))
            .filter(payment::Column::Status.eq(PaymentStatus::Pending.as_str()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn set_gateway_artifacts(
        &self,
        id: Uuid,
        checkout_url: &str,
        qr_code: &str,
    ) -> DomainResult<()> {
        let result = payment::Entity::update_many()
            .col_expr(
                payment::Column::CheckoutUrl,
                Expr::value(Some(checkout_url.to_string())),
            )
            .col_expr(payment::Column::QrCode, Expr::value(Some(qr_code.to_string())))
            .col_expr(payment::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(payment::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound {
                entity: "Payment",
                field: "id",
                value: id.to_string(),
            });
        }
        Ok(())
    }
}
