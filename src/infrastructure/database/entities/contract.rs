//! Contract entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contracts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub booking_id: Uuid,

    /// Sequential per calendar year, e.g. "HD-2026-000042"
    #[sea_orm(unique)]
    pub contract_number: String,

    /// Renter's legal name as printed on the agreement
    pub renter_name: String,

    /// Vehicle plate as printed on the agreement
    pub vehicle_plate: String,

    /// Full rendered agreement text
    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// SHA-256 hex digest of the content at issue time
    pub content_hash: String,

    /// Signature state: Pending, Signed, Expired
    pub status: String,

    /// SHA-256 hex digest of the signing token; cleared on signature
    #[sea_orm(nullable)]
    pub token_hash: Option<String>,

    pub token_expires_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub signed_at: Option<DateTimeUtc>,
    #[sea_orm(nullable)]
    pub signed_ip: Option<String>,
    #[sea_orm(nullable)]
    pub signed_user_agent: Option<String>,

    /// Soft delete: hidden from lookups, kept for audit
    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTimeUtc>,

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
