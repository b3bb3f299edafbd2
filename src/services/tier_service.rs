use crate::config::PlansConfig;
use crate::entities::{
    GiveawayStatus, SubscriptionStatus, Tier, giveaway_entity as giveaways,
    tenant_subscription_entity as subs,
};
use crate::error::AppResult;
use crate::models::{TierDisplay, TierInfoResponse, TierLimits};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};

#[derive(Clone)]
pub struct TierService {
    pool: DatabaseConnection,
    plans: PlansConfig,
}

impl TierService {
    pub fn new(pool: DatabaseConnection, plans: PlansConfig) -> Self {
        Self { pool, plans }
    }

    /// 没有 active 订阅记录时视为 free
    pub async fn resolve_tier(&self, tenant_id: &str) -> AppResult<Tier> {
        Self::resolve_tier_on(&self.pool, tenant_id).await
    }

    /// Same lookup on an arbitrary connection, so callers inside a transaction stay on it.
    pub async fn resolve_tier_on<C: ConnectionTrait>(conn: &C, tenant_id: &str) -> AppResult<Tier> {
        let row = subs::Entity::find_by_id(tenant_id.to_string())
            .filter(subs::Column::Status.eq(SubscriptionStatus::Active))
            .one(conn)
            .await?;
        Ok(row.map(|r| r.tier).unwrap_or(Tier::Free))
    }

    pub fn limits(tier: Tier) -> TierLimits {
        TierLimits::for_tier(tier)
    }

    pub async fn count_active_giveaways<C: ConnectionTrait>(
        conn: &C,
        tenant_id: &str,
    ) -> AppResult<u64> {
        let count = giveaways::Entity::find()
            .filter(giveaways::Column::TenantId.eq(tenant_id))
            .filter(giveaways::Column::Status.eq(GiveawayStatus::Active))
            .count(conn)
            .await?;
        Ok(count)
    }

    /// 档位、配额和当前用量
    pub async fn tier_info(&self, tenant_id: &str) -> AppResult<TierInfoResponse> {
        let tier = self.resolve_tier(tenant_id).await?;
        let active_giveaways = Self::count_active_giveaways(&self.pool, tenant_id).await?;
        Ok(TierInfoResponse {
            tier,
            limits: Self::limits(tier),
            display: TierDisplay::for_tier(tier),
            active_giveaways,
        })
    }

    /// 根据配置把外部 plan / product id 映射为档位, 未配置的 id 返回 None
    pub fn tier_for_plan(&self, plan_id: Option<&str>, product_id: Option<&str>) -> Option<Tier> {
        let matches = |configured: &Option<String>| {
            configured
                .as_deref()
                .is_some_and(|id| plan_id == Some(id) || product_id == Some(id))
        };

        if matches(&self.plans.business_plan_id) {
            Some(Tier::Business)
        } else if matches(&self.plans.pro_plan_id) {
            Some(Tier::Pro)
        } else {
            None
        }
    }
}
