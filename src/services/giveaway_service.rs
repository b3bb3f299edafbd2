use crate::entities::{
    GiveawayStatus, Tier, entry_entity as entries, giveaway_entity as giveaways,
    winner_entity as winners,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateGiveawayRequest, CreateGiveawayResponse, DashboardStats, GiveawayResponse,
    GiveawaySummary, Limit, PaginatedResponse, PaginationParams, pluralize,
};
use crate::services::TierService;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

#[derive(Clone)]
pub struct GiveawayService {
    pool: DatabaseConnection,
    tiers: TierService,
}

pub(crate) fn require_caller(caller: Option<&str>) -> AppResult<&str> {
    caller.ok_or_else(|| AppError::Unauthenticated("Please sign in to continue".into()))
}

/// 读取属于该 tenant 的 giveaway, 不存在 -> NotFound, 不属于 -> Forbidden
pub(crate) async fn find_owned_giveaway<C: ConnectionTrait>(
    conn: &C,
    tenant_id: &str,
    giveaway_id: Uuid,
) -> AppResult<giveaways::Model> {
    let giveaway = giveaways::Entity::find_by_id(giveaway_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Giveaway not found".into()))?;
    if giveaway.tenant_id != tenant_id {
        return Err(AppError::Forbidden(
            "Giveaway does not belong to this company".into(),
        ));
    }
    Ok(giveaway)
}

fn active_quota_message(limit: u64, tier: Tier) -> String {
    format!(
        "You've reached the limit of {} on the {tier} plan. Upgrade to create more.",
        pluralize(limit, "active giveaway")
    )
}

impl GiveawayService {
    pub fn new(pool: DatabaseConnection, tiers: TierService) -> Self {
        Self { pool, tiers }
    }

    async fn ensure_active_quota(&self, tenant_id: &str) -> AppResult<()> {
        let tier = self.tiers.resolve_tier(tenant_id).await?;
        let limit = TierService::limits(tier).max_active_giveaways;
        let active = TierService::count_active_giveaways(&self.pool, tenant_id).await?;
        if let Limit::Limited(max) = limit
            && limit.is_reached(active)
        {
            return Err(AppError::QuotaExceeded(active_quota_message(max, tier)));
        }
        Ok(())
    }

    /// 创建 giveaway
    ///
    /// 1. 校验输入 (标题、奖品、结束时间、图片 URL)
    /// 2. 要求已登录
    /// 3. 检查 tenant 档位的 active giveaway 配额
    /// 4. 以 active 状态写入, start_date = now
    pub async fn create_giveaway(
        &self,
        tenant_id: &str,
        caller: Option<&str>,
        req: CreateGiveawayRequest,
    ) -> AppResult<CreateGiveawayResponse> {
        let now = Utc::now();
        let valid = req.validate(now)?;
        let user_id = require_caller(caller)?;

        self.ensure_active_quota(tenant_id).await?;

        let id = Uuid::new_v4();
        giveaways::ActiveModel {
            id: Set(id),
            tenant_id: Set(tenant_id.to_string()),
            title: Set(valid.title),
            description: Set(valid.description),
            prize_details: Set(valid.prize),
            start_date: Set(now),
            end_date: Set(valid.end_date),
            status: Set(GiveawayStatus::Active),
            winner_selection_method: Set(valid.winner_selection_method),
            winner_count: Set(valid.winner_count),
            bonus_entries_per_referral: Set(valid.bonus_entries_per_referral),
            max_entries_per_user: Set(valid.max_entries_per_user),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.pool)
        .await
        .map_err(|e| AppError::from(e).logged("create_giveaway", tenant_id))?;

        log::info!("Giveaway {id} created for tenant {tenant_id} by {user_id}");
        Ok(CreateGiveawayResponse { giveaway_id: id })
    }

    /// 状态只能 draft -> active -> ended, 同状态为 no-op
    pub async fn update_status(
        &self,
        tenant_id: &str,
        giveaway_id: Uuid,
        caller: Option<&str>,
        status: GiveawayStatus,
    ) -> AppResult<GiveawayResponse> {
        require_caller(caller)?;
        let giveaway = find_owned_giveaway(&self.pool, tenant_id, giveaway_id).await?;

        if giveaway.status == status {
            return Ok(giveaway.into());
        }
        if status.rank() < giveaway.status.rank() {
            return Err(AppError::InvalidState(format!(
                "Cannot move a giveaway from {} back to {status}",
                giveaway.status
            )));
        }
        if status == GiveawayStatus::Active {
            self.ensure_active_quota(tenant_id).await?;
        }

        let mut am = giveaway.into_active_model();
        am.status = Set(status);
        am.updated_at = Set(Utc::now());
        let updated = am
            .update(&self.pool)
            .await
            .map_err(|e| AppError::from(e).logged("update_status", giveaway_id))?;

        log::info!("Giveaway {giveaway_id} moved to {status}");
        Ok(updated.into())
    }

    /// 把已过 end_date 的 active giveaway 置为 ended, 返回更新条数
    pub async fn expire_due_giveaways(&self) -> AppResult<u64> {
        let now = Utc::now();
        let result = giveaways::Entity::update_many()
            .col_expr(
                giveaways::Column::Status,
                Expr::value(GiveawayStatus::Ended.to_string()),
            )
            .col_expr(giveaways::Column::UpdatedAt, Expr::value(now))
            .filter(giveaways::Column::Status.eq(GiveawayStatus::Active))
            .filter(giveaways::Column::EndDate.lt(now))
            .exec(&self.pool)
            .await?;

        if result.rows_affected > 0 {
            log::info!("Expired {} giveaways", result.rows_affected);
        }
        Ok(result.rows_affected)
    }

    /// 公开读取 (参与页)
    pub async fn get_giveaway(&self, giveaway_id: Uuid) -> AppResult<GiveawayResponse> {
        giveaways::Entity::find_by_id(giveaway_id)
            .one(&self.pool)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound("Giveaway not found".into()))
    }

    /// tenant 的 giveaway 列表 (新的在前), 附带参与和中奖数
    pub async fn list_giveaways(
        &self,
        tenant_id: &str,
        caller: Option<&str>,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<GiveawaySummary>> {
        require_caller(caller)?;

        let base_query =
            giveaways::Entity::find().filter(giveaways::Column::TenantId.eq(tenant_id));
        let total = base_query.clone().count(&self.pool).await?;

        let models = base_query
            .order_by_desc(giveaways::Column::CreatedAt)
            .order_by_desc(giveaways::Column::Id)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;

        let mut items = Vec::with_capacity(models.len());
        for giveaway in models {
            let total_entries = entries::Entity::find()
                .filter(entries::Column::GiveawayId.eq(giveaway.id))
                .count(&self.pool)
                .await?;
            let total_winners = winners::Entity::find()
                .filter(winners::Column::GiveawayId.eq(giveaway.id))
                .count(&self.pool)
                .await?;
            items.push(GiveawaySummary {
                giveaway: giveaway.into(),
                total_entries,
                total_winners,
            });
        }

        Ok(PaginatedResponse::new(items, params, total))
    }

    pub async fn dashboard_stats(
        &self,
        tenant_id: &str,
        caller: Option<&str>,
    ) -> AppResult<DashboardStats> {
        require_caller(caller)?;

        let total_giveaways = giveaways::Entity::find()
            .filter(giveaways::Column::TenantId.eq(tenant_id))
            .count(&self.pool)
            .await?;
        let active_giveaways = TierService::count_active_giveaways(&self.pool, tenant_id).await?;
        let total_entries = entries::Entity::find()
            .inner_join(giveaways::Entity)
            .filter(giveaways::Column::TenantId.eq(tenant_id))
            .count(&self.pool)
            .await?;
        let total_winners = winners::Entity::find()
            .inner_join(giveaways::Entity)
            .filter(giveaways::Column::TenantId.eq(tenant_id))
            .count(&self.pool)
            .await?;

        Ok(DashboardStats {
            total_giveaways,
            active_giveaways,
            total_entries,
            total_winners,
        })
    }
}
