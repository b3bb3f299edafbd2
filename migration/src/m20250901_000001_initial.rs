use sea_orm_migration::prelude::*;

/// Giveaways owned by a tenant
#[derive(DeriveIden)]
enum Giveaways {
    Table,
    Id,
    TenantId,
    Title,
    Description,
    PrizeDetails,
    StartDate,
    EndDate,
    Status,
    WinnerSelectionMethod,
    WinnerCount,
    BonusEntriesPerReferral,
    MaxEntriesPerUser,
    CreatedAt,
    UpdatedAt,
}

/// One row per (giveaway, user)
#[derive(DeriveIden)]
enum Entries {
    Table,
    Id,
    GiveawayId,
    UserId,
    Email,
    MembershipId,
    EntryCount,
    ReferralCode,
    ReferredBy,
    ReferralCount,
    Metadata,
    CreatedAt,
}

/// Drawn winners, one row per (giveaway, entry)
#[derive(DeriveIden)]
enum Winners {
    Table,
    Id,
    GiveawayId,
    EntryId,
    Position,
    SelectedAt,
    Notified,
    NotifiedAt,
    PrizeClaimed,
    ClaimedAt,
    Notes,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Giveaways::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Giveaways::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Giveaways::TenantId).string_len(64).not_null())
                    .col(ColumnDef::new(Giveaways::Title).string_len(100).not_null())
                    .col(ColumnDef::new(Giveaways::Description).text().null())
                    .col(ColumnDef::new(Giveaways::PrizeDetails).json_binary().not_null())
                    .col(
                        ColumnDef::new(Giveaways::StartDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Giveaways::EndDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Giveaways::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(Giveaways::WinnerSelectionMethod)
                            .string_len(32)
                            .not_null()
                            .default("random_weighted"),
                    )
                    .col(
                        ColumnDef::new(Giveaways::WinnerCount)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Giveaways::BonusEntriesPerReferral)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Giveaways::MaxEntriesPerUser).integer().null())
                    .col(
                        ColumnDef::new(Giveaways::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Giveaways::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 配额统计按 (tenant_id, status) 计数
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_giveaways_tenant_status")
                    .table(Giveaways::Table)
                    .col(Giveaways::TenantId)
                    .col(Giveaways::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Entries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Entries::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Entries::GiveawayId).uuid().not_null())
                    .col(ColumnDef::new(Entries::UserId).string_len(64).not_null())
                    .col(ColumnDef::new(Entries::Email).string_len(255).null())
                    .col(ColumnDef::new(Entries::MembershipId).string_len(64).null())
                    .col(
                        ColumnDef::new(Entries::EntryCount)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Entries::ReferralCode).string_len(16).not_null())
                    .col(ColumnDef::new(Entries::ReferredBy).string_len(16).null())
                    .col(
                        ColumnDef::new(Entries::ReferralCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Entries::Metadata).json_binary().not_null())
                    .col(
                        ColumnDef::new(Entries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_entries_giveaway")
                            .from(Entries::Table, Entries::GiveawayId)
                            .to(Giveaways::Table, Giveaways::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 每个用户在同一个 giveaway 中最多一条参与记录
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_entries_giveaway_user_unique")
                    .table(Entries::Table)
                    .col(Entries::GiveawayId)
                    .col(Entries::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 推荐码全局唯一
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_entries_referral_code_unique")
                    .table(Entries::Table)
                    .col(Entries::ReferralCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Winners::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Winners::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Winners::GiveawayId).uuid().not_null())
                    .col(ColumnDef::new(Winners::EntryId).uuid().not_null())
                    .col(ColumnDef::new(Winners::Position).integer().not_null())
                    .col(
                        ColumnDef::new(Winners::SelectedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Winners::Notified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Winners::NotifiedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Winners::PrizeClaimed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Winners::ClaimedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Winners::Notes).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_winners_giveaway")
                            .from(Winners::Table, Winners::GiveawayId)
                            .to(Giveaways::Table, Giveaways::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_winners_entry")
                            .from(Winners::Table, Winners::EntryId)
                            .to(Entries::Table, Entries::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一 entry 在同一 giveaway 中只能中奖一次
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_winners_giveaway_entry_unique")
                    .table(Winners::Table)
                    .col(Winners::GiveawayId)
                    .col(Winners::EntryId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_winners_giveaway_position_unique")
                    .table(Winners::Table)
                    .col(Winners::GiveawayId)
                    .col(Winners::Position)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序：winners -> entries -> giveaways
        manager
            .drop_table(Table::drop().if_exists().table(Winners::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().if_exists().table(Entries::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().if_exists().table(Giveaways::Table).to_owned())
            .await?;

        Ok(())
    }
}
