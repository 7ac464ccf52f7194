//! Payment entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub booking_id: Uuid,

    /// Ledger row kind: Deposit, Rental, Extra, Refund
    pub payment_type: String,

    /// VND
    pub amount: i64,

    /// Row status: Pending, Success, Failed
    pub status: String,

    /// Gateway order reference, unique across all payments
    #[sea_orm(unique)]
    pub order_code: i64,

    #[sea_orm(nullable)]
    pub checkout_url: Option<String>,
    #[sea_orm(nullable)]
    pub qr_code: Option<String>,

    #[sea_orm(nullable)]
    pub paid_at: Option<DateTimeUtc>,
    /// Gateway-side transaction reference, set on success
    #[sea_orm(nullable)]
    pub transaction_id: Option<String>,
    #[sea_orm(nullable)]
    pub failure_reason: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::booking::Entity",
        from = "Column::BookingId",
        to = "super::booking::Column::Id"
    )]
    Booking,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
