//! Create payments table
//!
//! Append-style ledger: failed attempts stay as rows, successful rows
//! are never reopened. The order code is the join key to the gateway.

use sea_orm_migration::prelude::*;

use super::m20260101_000003_create_bookings::Bookings;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::BookingId).uuid().not_null())
                    .col(
                        ColumnDef::new(Payments::PaymentType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Payments::Status)
                            .string_len(20)
                            .not_null()
                            .default("Pending"),
                    )
                    .col(
                        ColumnDef::new(Payments::OrderCode)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Payments::CheckoutUrl).string().null())
                    .col(ColumnDef::new(Payments::QrCode).text().null())
                    .col(
                        ColumnDef::new(Payments::PaidAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Payments::TransactionId).string().null())
                    .col(ColumnDef::new(Payments::FailureReason).string().null())
                    .col(
                        ColumnDef::new(Payments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Payments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_booking")
                            .from(Payments::Table, Payments::BookingId)
                            .to(Bookings::Table, Bookings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payments_booking")
                    .table(Payments::Table)
                    .col(Payments::BookingId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payments_booking_type")
                    .table(Payments::Table)
                    .col(Payments::BookingId)
                    .col(Payments::PaymentType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payments_status")
                    .table(Payments::Table)
                    .col(Payments::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Payments {
    Table,
    Id,
    BookingId,
    PaymentType,
    Amount,
    Status,
    OrderCode,
    CheckoutUrl,
    QrCode,
    PaidAt,
    TransactionId,
    FailureReason,
    CreatedAt,
    UpdatedAt,
}
