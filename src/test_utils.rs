//! Shared fixtures for service tests: an in-memory SQLite database with the real migrations.

use crate::config::PlansConfig;
use crate::entities::{
    GiveawayStatus, PrizeDetails, SubscriptionStatus, Tier, WinnerSelectionMethod,
    entry_entity as entries, giveaway_entity as giveaways, tenant_subscription_entity as subs,
};
use crate::external::JwtIdentityVerifier;
use crate::services::{
    EntryService, GiveawayService, SubscriptionService, TierService, WinnerService,
};
use crate::utils::generate_referral_code;
use chrono::{Duration, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

pub const PRO_PLAN: &str = "plan_pro";
pub const BUSINESS_PLAN: &str = "plan_business";
pub const IDENTITY_SECRET: &str = "test-identity-secret";

pub async fn setup_db() -> DatabaseConnection {
    // 内存库每个连接独立, 必须只用一个连接
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub fn plans() -> PlansConfig {
    PlansConfig {
        pro_plan_id: Some(PRO_PLAN.to_string()),
        business_plan_id: Some(BUSINESS_PLAN.to_string()),
    }
}

pub fn tier_service(db: &DatabaseConnection) -> TierService {
    TierService::new(db.clone(), plans())
}

pub fn giveaway_service(db: &DatabaseConnection) -> GiveawayService {
    GiveawayService::new(db.clone(), tier_service(db))
}

pub fn entry_service(db: &DatabaseConnection) -> EntryService {
    EntryService::new(db.clone(), tier_service(db))
}

pub fn winner_service(db: &DatabaseConnection) -> WinnerService {
    WinnerService::new(db.clone(), tier_service(db))
}

pub fn subscription_service(db: &DatabaseConnection) -> SubscriptionService {
    SubscriptionService::new(db.clone(), tier_service(db))
}

pub fn identity() -> JwtIdentityVerifier {
    JwtIdentityVerifier::new(IDENTITY_SECRET, "x-user-token")
}

pub async fn set_subscription(
    db: &DatabaseConnection,
    tenant_id: &str,
    tier: Tier,
    status: SubscriptionStatus,
) {
    let now = Utc::now();
    subs::Entity::insert(subs::ActiveModel {
        tenant_id: Set(tenant_id.to_string()),
        tier: Set(tier),
        plan_id: Set(None),
        membership_id: Set(Some(format!("mem_{tenant_id}"))),
        user_id: Set(None),
        status: Set(status),
        activated_at: Set(Some(now)),
        deactivated_at: Set(None),
        updated_at: Set(now),
    })
    .on_conflict(
        OnConflict::column(subs::Column::TenantId)
            .update_columns([subs::Column::Tier, subs::Column::Status])
            .to_owned(),
    )
    .exec_without_returning(db)
    .await
    .unwrap();
}

/// 一个正在进行中的 giveaway (开始于一小时前, 一周后结束)
pub async fn insert_giveaway(
    db: &DatabaseConnection,
    tenant_id: &str,
    status: GiveawayStatus,
) -> giveaways::Model {
    insert_giveaway_with(db, tenant_id, status, 1, 1, None).await
}

pub async fn insert_giveaway_with(
    db: &DatabaseConnection,
    tenant_id: &str,
    status: GiveawayStatus,
    winner_count: i32,
    bonus_entries_per_referral: i32,
    max_entries_per_user: Option<i32>,
) -> giveaways::Model {
    let now = Utc::now();
    giveaways::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id.to_string()),
        title: Set("Test giveaway".to_string()),
        description: Set(None),
        prize_details: Set(PrizeDetails {
            title: "Prize".to_string(),
            ..Default::default()
        }),
        start_date: Set(now - Duration::hours(1)),
        end_date: Set(now + Duration::days(7)),
        status: Set(status),
        winner_selection_method: Set(WinnerSelectionMethod::RandomWeighted),
        winner_count: Set(winner_count),
        bonus_entries_per_referral: Set(bonus_entries_per_referral),
        max_entries_per_user: Set(max_entries_per_user),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_entry(
    db: &DatabaseConnection,
    giveaway_id: Uuid,
    user_id: &str,
    entry_count: i32,
) -> entries::Model {
    entries::ActiveModel {
        id: Set(Uuid::new_v4()),
        giveaway_id: Set(giveaway_id),
        user_id: Set(user_id.to_string()),
        email: Set(None),
        membership_id: Set(None),
        entry_count: Set(entry_count),
        referral_code: Set(generate_referral_code()),
        referred_by: Set(None),
        referral_count: Set(0),
        metadata: Set(serde_json::json!({})),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
}
