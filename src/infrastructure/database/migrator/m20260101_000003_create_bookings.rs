//! Create bookings table
//!
//! One row per rental saga. Status transitions go through conditional
//! `UPDATE .. WHERE status = ?` writes, so the status column is the
//! concurrency guard for the whole lifecycle.

use sea_orm_migration::prelude::*;

use super::m20260101_000002_create_vehicles::Vehicles;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bookings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bookings::RenterId).string().not_null())
                    .col(ColumnDef::new(Bookings::VehicleId).uuid().not_null())
                    .col(ColumnDef::new(Bookings::PickupStationId).uuid().null())
                    .col(ColumnDef::new(Bookings::ReturnStationId).uuid().null())
                    .col(
                        ColumnDef::new(Bookings::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::EndTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::HourlyRate)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::DailyRate)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::TotalAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::DepositAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::LateFee)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Bookings::DamageFee)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Bookings::ExtraAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Bookings::RefundAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Bookings::Status)
                            .string_len(30)
                            .not_null()
                            .default("Pending"),
                    )
                    .col(ColumnDef::new(Bookings::CancelReason).string().null())
                    .col(
                        ColumnDef::new(Bookings::ActualCheckInAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::ActualCheckOutAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Bookings::CheckInNote).text().null())
                    .col(ColumnDef::new(Bookings::CheckInPhotoUrl).string().null())
                    .col(ColumnDef::new(Bookings::CheckOutNote).text().null())
                    .col(ColumnDef::new(Bookings::CheckOutPhotoUrl).string().null())
                    .col(ColumnDef::new(Bookings::RefundConfirmedBy).string().null())
                    .col(
                        ColumnDef::new(Bookings::RefundConfirmedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_vehicle")
                            .from(Bookings::Table, Bookings::VehicleId)
                            .to(Vehicles::Table, Vehicles::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_renter")
                    .table(Bookings::Table)
                    .col(Bookings::RenterId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_status")
                    .table(Bookings::Table)
                    .col(Bookings::Status)
                    .to_owned(),
            )
            .await?;

        // Overlap checks scan by vehicle and window
        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_vehicle_window")
                    .table(Bookings::Table)
                    .col(Bookings::VehicleId)
                    .col(Bookings::StartTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Bookings {
    Table,
    Id,
    RenterId,
    VehicleId,
    PickupStationId,
    ReturnStationId,
    StartTime,
    EndTime,
    HourlyRate,
    DailyRate,
    TotalAmount,
    DepositAmount,
    LateFee,
    DamageFee,
    ExtraAmount,
    RefundAmount,
    Status,
    CancelReason,
    ActualCheckInAt,
    ActualCheckOutAt,
    CheckInNote,
    CheckInPhotoUrl,
    CheckOutNote,
    CheckOutPhotoUrl,
    RefundConfirmedBy,
    RefundConfirmedAt,
    CreatedAt,
    UpdatedAt,
}
