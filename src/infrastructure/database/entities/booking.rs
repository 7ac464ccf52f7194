//! Booking entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub renter_id: String,
    pub vehicle_id: Uuid,

    /// Station references are opaque here; inventory lives elsewhere
    #[sea_orm(nullable)]
    pub pickup_station_id: Option<Uuid>,
    #[sea_orm(nullable)]
    pub return_station_id: Option<Uuid>,

    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,

    /// Rate card snapshot taken at creation, VND
    pub hourly_rate: i64,
    pub daily_rate: i64,

    pub total_amount: i64,
    pub deposit_amount: i64,

    /// Settlement columns, written with the CheckedOut transition
    pub late_fee: i64,
    pub damage_fee: i64,
    pub extra_amount: i64,
    pub refund_amount: i64,

    /// Saga status: Pending, ContractPending, ContractSigned, DepositPaid,
    /// CheckedIn, CheckedOut, ExtraPaymentPending, RefundPending,
    /// Completed, Cancelled
    pub status: String,

    #[sea_orm(nullable)]
    pub cancel_reason: Option<String>,

    #[sea_orm(nullable)]
    pub actual_check_in_at: Option<DateTimeUtc>,
    #[sea_orm(nullable)]
    pub actual_check_out_at: Option<DateTimeUtc>,
    #[sea_orm(nullable)]
    pub check_in_note: Option<String>,
    #[sea_orm(nullable)]
    pub check_in_photo_url: Option<String>,
    #[sea_orm(nullable)]
    pub check_out_note: Option<String>,
    #[sea_orm(nullable)]
    pub check_out_photo_url: Option<String>,

    #[sea_orm(nullable)]
    pub refund_confirmed_by: Option<String>,
    #[sea_orm(nullable)]
    pub refund_confirmed_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vehicle::Entity",
        from = "Column::VehicleId",
        to = "super::vehicle::Column::Id"
    )]
    Vehicle,

    #[sea_orm(has_many = "super::contract::Entity")]
    Contracts,

    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::vehicle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicle.def()
    }
}

impl Related<super::contract::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contracts.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
