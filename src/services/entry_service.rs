use crate::entities::{GiveawayStatus, entry_entity as entries, giveaway_entity as giveaways};
use crate::error::{AppError, AppResult, map_unique_violation};
use crate::models::{
    EnterGiveawayRequest, EnterGiveawayResponse, EntryResponse, Limit, PaginatedResponse,
    PaginationParams, UserEntryResponse,
};
use crate::services::TierService;
use crate::services::giveaway_service::{find_owned_giveaway, require_caller};
use crate::utils::generate_unique_referral_code;
use chrono::Utc;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

#[derive(Clone)]
pub struct EntryService {
    pool: DatabaseConnection,
    tiers: TierService,
}

/// 推荐成功: referral_count + 1, entry_count + bonus (不超过 max_entries_per_user, 未设置时不超过 i32::MAX)
/// 单条 UPDATE 完成, 并发推荐不会丢失更新
async fn credit_referrer<C: ConnectionTrait>(
    conn: &C,
    referrer_id: Uuid,
    bonus: i32,
    cap: Option<i32>,
) -> AppResult<()> {
    let cap = cap.unwrap_or(i32::MAX);
    let bonus = bonus.max(0);
    // 条件在加法之前判断, 数据库里不会出现溢出的中间值
    let new_count: SimpleExpr = Expr::case(
        Expr::col(entries::Column::EntryCount).gte(cap - bonus),
        Expr::val(cap),
    )
    .finally(Expr::col(entries::Column::EntryCount).add(bonus))
    .into();

    entries::Entity::update_many()
        .col_expr(
            entries::Column::ReferralCount,
            Expr::col(entries::Column::ReferralCount).add(1),
        )
        .col_expr(entries::Column::EntryCount, new_count)
        .filter(entries::Column::Id.eq(referrer_id))
        .exec(conn)
        .await?;
    Ok(())
}

impl EntryService {
    pub fn new(pool: DatabaseConnection, tiers: TierService) -> Self {
        Self { pool, tiers }
    }

    /// 参与 giveaway
    ///
    /// 依次校验: 登录 -> giveaway 存在 -> active -> 时间窗口 -> 档位参与上限 -> 未参与过,
    /// 然后生成推荐码并在同一事务中写入 entry 和推荐奖励。
    pub async fn enter(
        &self,
        giveaway_id: Uuid,
        caller: Option<&str>,
        req: EnterGiveawayRequest,
    ) -> AppResult<EnterGiveawayResponse> {
        let user_id = require_caller(caller)?;

        let giveaway = giveaways::Entity::find_by_id(giveaway_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Giveaway not found".into()))?;

        if giveaway.status != GiveawayStatus::Active {
            return Err(AppError::InvalidState("Giveaway is not active".into()));
        }
        let now = Utc::now();
        if now < giveaway.start_date {
            return Err(AppError::InvalidState("Giveaway has not started yet".into()));
        }
        if now > giveaway.end_date {
            return Err(AppError::InvalidState("Giveaway has ended".into()));
        }

        let tier = self.tiers.resolve_tier(&giveaway.tenant_id).await?;
        let limit = TierService::limits(tier).max_entries_per_giveaway;
        let current = entries::Entity::find()
            .filter(entries::Column::GiveawayId.eq(giveaway_id))
            .count(&self.pool)
            .await?;
        if let Limit::Limited(max) = limit
            && limit.is_reached(current)
        {
            let noun = if max == 1 { "entry" } else { "entries" };
            return Err(AppError::QuotaExceeded(format!(
                "This giveaway has reached the maximum of {max} {noun} on the {tier} plan."
            )));
        }

        let existing = entries::Entity::find()
            .filter(entries::Column::GiveawayId.eq(giveaway_id))
            .filter(entries::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::AlreadyExists(
                "You have already entered this giveaway".into(),
            ));
        }

        let referrer = match req
            .referral_code
            .as_deref()
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
        {
            Some(code) => {
                let referrer = entries::Entity::find()
                    .filter(entries::Column::GiveawayId.eq(giveaway_id))
                    .filter(entries::Column::ReferralCode.eq(code.as_str()))
                    .one(&self.pool)
                    .await?
                    .ok_or_else(|| AppError::ValidationError("Invalid referral code".into()))?;
                if referrer.user_id == user_id {
                    return Err(AppError::ValidationError(
                        "You cannot use your own referral code".into(),
                    ));
                }
                Some(referrer)
            }
            None => None,
        };

        let txn = self.pool.begin().await?;

        let referral_code = generate_unique_referral_code(&txn)
            .await
            .map_err(|e| e.logged("enter", giveaway_id))?;

        let entry_id = Uuid::new_v4();
        entries::ActiveModel {
            id: Set(entry_id),
            giveaway_id: Set(giveaway_id),
            user_id: Set(user_id.to_string()),
            email: Set(req.email.filter(|e| !e.trim().is_empty())),
            membership_id: Set(req.membership_id),
            entry_count: Set(1),
            referral_code: Set(referral_code.clone()),
            referred_by: Set(referrer.as_ref().map(|r| r.referral_code.clone())),
            referral_count: Set(0),
            metadata: Set(req.metadata.unwrap_or_else(|| serde_json::json!({}))),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                AppError::AlreadyExists("You have already entered this giveaway".into())
            })
            .logged("enter", giveaway_id)
        })?;

        if let Some(referrer) = &referrer {
            credit_referrer(
                &txn,
                referrer.id,
                giveaway.bonus_entries_per_referral,
                giveaway.max_entries_per_user,
            )
            .await
            .map_err(|e| e.logged("enter", giveaway_id))?;
        }

        txn.commit().await?;

        log::info!("User {user_id} entered giveaway {giveaway_id}");
        Ok(EnterGiveawayResponse {
            entry_id,
            referral_code,
        })
    }

    /// 当前用户的参与状态, 未登录视为未参与
    pub async fn user_entry(
        &self,
        giveaway_id: Uuid,
        caller: Option<&str>,
    ) -> AppResult<UserEntryResponse> {
        let Some(user_id) = caller else {
            return Ok(UserEntryResponse {
                has_entered: false,
                entry: None,
            });
        };

        let entry = entries::Entity::find()
            .filter(entries::Column::GiveawayId.eq(giveaway_id))
            .filter(entries::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?;

        Ok(UserEntryResponse {
            has_entered: entry.is_some(),
            entry: entry.map(Into::into),
        })
    }

    /// 后台参与列表 (新的在前)
    pub async fn list_entries(
        &self,
        tenant_id: &str,
        giveaway_id: Uuid,
        caller: Option<&str>,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<EntryResponse>> {
        require_caller(caller)?;
        find_owned_giveaway(&self.pool, tenant_id, giveaway_id).await?;

        let base_query = entries::Entity::find().filter(entries::Column::GiveawayId.eq(giveaway_id));
        let total = base_query.clone().count(&self.pool).await?;
        let items = base_query
            .order_by_desc(entries::Column::CreatedAt)
            .order_by_desc(entries::Column::Id)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(PaginatedResponse::new(items, params, total))
    }
}
