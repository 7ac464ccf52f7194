//! Create contracts table
//!
//! Stores the rendered agreement, its content digest, and the digest of
//! the single-use signing token. The raw token itself is never stored.

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
                    .table(Contracts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contracts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Contracts::BookingId).uuid().not_null())
                    .col(
                        ColumnDef::new(Contracts::ContractNumber)
                            .string_len(20)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Contracts::RenterName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contracts::VehiclePlate)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Contracts::Content).text().not_null())
                    .col(
                        ColumnDef::new(Contracts::ContentHash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contracts::Status)
                            .string_len(20)
                            .not_null()
                            .default("Pending"),
                    )
                    .col(ColumnDef::new(Contracts::TokenHash).string_len(64).null())
                    .col(
                        ColumnDef::new(Contracts::TokenExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contracts::SignedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Contracts::SignedIp).string_len(45).null())
                    .col(ColumnDef::new(Contracts::SignedUserAgent).string().null())
                    .col(
                        ColumnDef::new(Contracts::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Contracts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contracts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contracts_booking")
                            .from(Contracts::Table, Contracts::BookingId)
                            .to(Bookings::Table, Bookings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contracts_booking")
                    .table(Contracts::Table)
                    .col(Contracts::BookingId)
                    .to_owned(),
            )
            .await?;

        // Signing-link resolution is a point lookup on the token digest
        manager
            .create_index(
                Index::create()
                    .name("idx_contracts_token_hash")
                    .table(Contracts::Table)
                    .col(Contracts::TokenHash)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contracts_status")
                    .table(Contracts::Table)
                    .col(Contracts::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Contracts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Contracts {
    Table,
    Id,
    BookingId,
    ContractNumber,
    RenterName,
    VehiclePlate,
    Content,
    ContentHash,
    Status,
    TokenHash,
    TokenExpiresAt,
    SignedAt,
    SignedIp,
    SignedUserAgent,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}
