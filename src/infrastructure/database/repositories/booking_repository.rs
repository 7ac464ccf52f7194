//! SeaORM implementation of BookingRepository
//!
//! Every status transition is a single conditional UPDATE filtered on the
//! expected status. `rows_affected == 0` means another writer got there
//! first; callers re-read and decide, nothing here retries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::debug;
use uuid::Uuid;

use crate::domain::booking::{
    Booking, BookingRepository, BookingStatus, CheckOutRecord,
};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::booking;
use crate::shared::{PaginatedResult, PaginationParams};

pub struct SeaOrmBookingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: booking::Model) -> Booking {
    Booking {
        id: m.id,
        renter_id: m.renter_id,
        vehicle_id: m.vehicle_id,
        pickup_station_id: m.pickup_station_id,
        return_station_id: m.return_station_id,
        start_time: m.start_time,
        end_time: m.end_time,
        hourly_rate: m.hourly_rate,
        daily_rate: m.daily_rate,
        total_amount: m.total_amount,
        deposit_amount: m.deposit_amount,
        late_fee: m.late_fee,
        damage_fee: m.damage_fee,
        extra_amount: m.extra_amount,
        refund_amount: m.refund_amount,
        status: BookingStatus::from_str(&m.status),
        cancel_reason: m.cancel_reason,
        actual_check_in_at: m.actual_check_in_at,
        actual_check_out_at: m.actual_check_out_at,
        check_in_note: m.check_in_note,
        check_in_photo_url: m.check_in_photo_url,
        check_out_note: m.check_out_note,
        check_out_photo_url: m.check_out_photo_url,
        refund_confirmed_by: m.refund_confirmed_by,
        refund_confirmed_at: m.refund_confirmed_at,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

/// Stored-string forms of the statuses that keep a vehicle reserved
fn holding_status_strings() -> [&'static str; 5] {
    [
        BookingStatus::Pending.as_str(),
        BookingStatus::ContractPending.as_str(),
        BookingStatus::ContractSigned.as_str(),
        BookingStatus::DepositPaid.as_str(),
        BookingStatus::CheckedIn.as_str(),
    ]
}

// ── BookingRepository impl ──────────────────────────────────────

#[async_trait]
impl BookingRepository for SeaOrmBookingRepository {
    async fn save(&self, b: Booking) -> DomainResult<()> {
        debug!("Saving booking: {}", b.id);

        let model = booking::ActiveModel {
            id: Set(b.id),
            renter_id: Set(b.renter_id),
            vehicle_id: Set(b.vehicle_id),
            pickup_station_id: Set(b.pickup_station_id),
            return_station_id: Set(b.return_station_id),
            start_time: Set(b.start_time),
            end_time: Set(b.end_time),
            hourly_rate: Set(b.hourly_rate),
            daily_rate: Set(b.daily_rate),
            total_amount: Set(b.total_amount),
            deposit_amount: Set(b.deposit_amount),
            late_fee: Set(b.late_fee),
            damage_fee: Set(b.damage_fee),
            extra_amount: Set(b.extra_amount),
            refund_amount: Set(b.refund_amount),
            status: Set(b.status.as_str().to_string()),
            cancel_reason: Set(b.cancel_reason),
            actual_check_in_at: Set(b.actual_check_in_at),
            actual_check_out_at: Set(b.actual_check_out_at),
            check_in_note: Set(b.check_in_note),
            check_in_photo_url: Set(b.check_in_photo_url),
            check_out_note: Set(b.check_out_note),
            check_out_photo_url: Set(b.check_out_photo_url),
            refund_confirmed_by: Set(b.refund_confirmed_by),
            refund_confirmed_at: Set(b.refund_confirmed_at),
            created_at: Set(b.created_at),
            updated_at: Set(b.updated_at),
        };
        model.insert(&self.db).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Booking>> {
        let model = booking::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_renter(
        &self,
        renter_id: &str,
        pagination: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>> {
        let page = pagination.page.max(1);
        let limit = pagination.limit.max(1);

        let query = booking::Entity::find()
            .filter(booking::Column::RenterId.eq(renter_id))
            .order_by_desc(booking::Column::CreatedAt);

        let total = query.clone().count(&self.db).await?;
        let models = query
            .offset((page - 1) * limit)
            .limit(limit)
            .all(&self.db)
            .await?;

        let items = models.into_iter().map(model_to_domain).collect();
        Ok(PaginatedResult::new(items, total, page, limit))
    }

    async fn list(
        &self,
        status: Option<BookingStatus>,
        pagination: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>> {
        let page = pagination.page.max(1);
        let limit = pagination.limit.max(1);

        let mut query = booking::Entity::find().order_by_desc(booking::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(booking::Column::Status.eq(status.as_str()));
        }

        let total = query.clone().count(&self.db).await?;
        let models = query
            .offset((page - 1) * limit)
            .limit(limit)
            .all(&self.db)
            .await?;

        let items = models.into_iter().map(model_to_domain).collect();
        Ok(PaginatedResult::new(items, total, page, limit))
    }

    async fn cas_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> DomainResult<bool> {
        let result = booking::Entity::update_many()
            .col_expr(booking::Column::Status, Expr::value(next.as_str()))
            .col_expr(booking::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(booking::Column::Id.eq(id))
            .filter(booking::Column::Status.eq(expected.as_str()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn record_check_in(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        note: Option<String>,
        photo_url: Option<String>,
    ) -> DomainResult<bool> {
        let result = booking::Entity::update_many()
            .col_expr(
                booking::Column::Status,
                Expr::value(BookingStatus::CheckedIn.as_str()),
            )
            .col_expr(booking::Column::ActualCheckInAt, Expr::value(Some(at)))
            .col_expr(booking::Column::CheckInNote, Expr::value(note))
            .col_expr(booking::Column::CheckInPhotoUrl, Expr::value(photo_url))
            .col_expr(booking::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(booking::Column::Id.eq(id))
            .filter(booking::Column::Status.eq(BookingStatus::DepositPaid.as_str()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn record_check_out(&self, id: Uuid, record: CheckOutRecord) -> DomainResult<bool> {
        let result = booking::Entity::update_many()
            .col_expr(
                booking::Column::Status,
                Expr::value(BookingStatus::CheckedOut.as_str()),
            )
            .col_expr(
                booking::Column::ActualCheckOutAt,
                Expr::value(Some(record.at)),
            )
            .col_expr(booking::Column::CheckOutNote, Expr::value(record.note))
            .col_expr(
                booking::Column::CheckOutPhotoUrl,
                Expr::value(record.photo_url),
            )
            .col_expr(
                booking::Column::ReturnStationId,
                Expr::value(record.return_station_id),
            )
            .col_expr(booking::Column::LateFee, Expr::value(record.late_fee))
            .col_expr(booking::Column::DamageFee, Expr::value(record.damage_fee))
            .col_expr(booking::Column::ExtraAmount, Expr::value(record.extra_amount))
            .col_expr(
                booking::Column::RefundAmount,
                Expr::value(record.refund_amount),
            )
            .col_expr(booking::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(booking::Column::Id.eq(id))
            .filter(booking::Column::Status.eq(BookingStatus::CheckedIn.as_str()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn record_cancel(
        &self,
        id: Uuid,
        expected: &[BookingStatus],
        next: BookingStatus,
        reason: &str,
        refund_amount: i64,
    ) -> DomainResult<bool> {
        let expected_strs: Vec<&str> = expected.iter().map(|s| s.as_str()).collect();

        let result = booking::Entity::update_many()
            .col_expr(booking::Column::Status, Expr::value(next.as_str()))
            .col_expr(
                booking::Column::CancelReason,
                Expr::value(Some(reason.to_string())),
            )
            .col_expr(booking::Column::RefundAmount, Expr::value(refund_amount))
            .col_expr(booking::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(booking::Column::Id.eq(id))
            .filter(booking::Column::Status.is_in(expected_strs))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn record_refund_confirmed(
        &self,
        id: Uuid,
        staff_id: &str,
        at: DateTime<Utc>,
        final_status: BookingStatus,
    ) -> DomainResult<bool> {
        let result = booking::Entity::update_many()
            .col_expr(booking::Column::Status, Expr::value(final_status.as_str()))
            .col_expr(
                booking::Column::RefundConfirmedBy,
                Expr::value(Some(staff_id.to_string())),
            )
            .col_expr(booking::Column::RefundConfirmedAt, Expr::value(Some(at)))
            .col_expr(booking::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(booking::Column::Id.eq(id))
            .filter(booking::Column::Status.eq(BookingStatus::RefundPending.as_str()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn find_overlapping(
        &self,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>> {
        // Half-open windows collide when each starts before the other ends
        let models = booking::Entity::find()
            .filter(booking::Column::VehicleId.eq(vehicle_id))
            .filter(booking::Column::Status.is_in(holding_status_strings()))
            .filter(booking::Column::StartTime.lt(end))
            .filter(booking::Column::EndTime.gt(start))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_stale_pending(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .filter(booking::Column::Status.is_in([
                BookingStatus::Pending.as_str(),
                BookingStatus::ContractPending.as_str(),
            ]))
            .filter(booking::Column::CreatedAt.lt(cutoff))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_no_shows(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .filter(booking::Column::Status.eq(BookingStatus::DepositPaid.as_str()))
            .filter(booking::Column::StartTime.lt(cutoff))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}
