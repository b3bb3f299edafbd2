use sea_orm_migration::prelude::*;

/// Tenant subscription tier (每个 tenant 一行)
#[derive(DeriveIden)]
enum TenantSubscriptions {
    Table,
    TenantId,
    Tier,
    PlanId,
    MembershipId,
    UserId,
    Status,
    ActivatedAt,
    DeactivatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 没有 active 行的 tenant 视为 free 档
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TenantSubscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TenantSubscriptions::TenantId)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TenantSubscriptions::Tier)
                            .string_len(16)
                            .not_null()
                            .default("free"),
                    )
                    .col(ColumnDef::new(TenantSubscriptions::PlanId).string_len(64).null())
                    .col(
                        ColumnDef::new(TenantSubscriptions::MembershipId)
                            .string_len(64)
                            .null(),
                    )
                    .col(ColumnDef::new(TenantSubscriptions::UserId).string_len(64).null())
                    .col(
                        ColumnDef::new(TenantSubscriptions::Status)
                            .string_len(16)
                            .not_null()
                            .default("inactive"),
                    )
                    .col(
                        ColumnDef::new(TenantSubscriptions::ActivatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TenantSubscriptions::DeactivatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TenantSubscriptions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 取消订阅事件按 membership_id 查找
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tenant_subscriptions_membership")
                    .table(TenantSubscriptions::Table)
                    .col(TenantSubscriptions::MembershipId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(TenantSubscriptions::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
