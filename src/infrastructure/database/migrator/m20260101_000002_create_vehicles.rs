//! Create vehicles table
//!
//! The fleet with its rate card. Rates live here only as the current
//! price list; bookings snapshot them at creation.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vehicles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vehicles::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Vehicles::LicensePlate)
                            .string_len(20)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Vehicles::Brand).string_len(100).not_null())
                    .col(ColumnDef::new(Vehicles::Model).string_len(100).not_null())
                    .col(ColumnDef::new(Vehicles::Year).integer().not_null())
                    .col(ColumnDef::new(Vehicles::Color).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Vehicles::HourlyRate)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Vehicles::DailyRate)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Vehicles::Status)
                            .string_len(20)
                            .not_null()
                            .default("Available"),
                    )
                    .col(ColumnDef::new(Vehicles::ImageUrl).string().null())
                    .col(
                        ColumnDef::new(Vehicles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Vehicles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vehicles_status")
                    .table(Vehicles::Table)
                    .col(Vehicles::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vehicles::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Vehicles {
    Table,
    Id,
    LicensePlate,
    Brand,
    Model,
    Year,
    Color,
    HourlyRate,
    DailyRate,
    Status,
    ImageUrl,
    CreatedAt,
    UpdatedAt,
}
