use crate::entities::{SubscriptionStatus, Tier, tenant_subscription_entity as subs};
use crate::error::{AppError, AppResult};
use crate::models::{CommerceEvent, MembershipData};
use crate::services::TierService;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

/// 根据宿主平台的 membership 事件同步 tenant 档位
#[derive(Clone)]
pub struct SubscriptionService {
    pool: DatabaseConnection,
    tiers: TierService,
}

impl SubscriptionService {
    pub fn new(pool: DatabaseConnection, tiers: TierService) -> Self {
        Self { pool, tiers }
    }

    pub async fn handle_event(&self, event: CommerceEvent) -> AppResult<()> {
        match event {
            CommerceEvent::MembershipActivated(data) => self.activate(&data).await,
            CommerceEvent::MembershipDeactivated(data) => self.deactivate(&data).await,
            CommerceEvent::Billing { event_type } => {
                log::info!("Billing event {event_type} received, no action");
                Ok(())
            }
            CommerceEvent::Unhandled { event_type } => {
                log::info!("Unhandled webhook event type: {event_type}");
                Ok(())
            }
        }
    }

    /// membership.activated: 以 tenant_id 为键 upsert, 重复投递不产生新行
    pub async fn activate(&self, data: &MembershipData) -> AppResult<()> {
        let Some(tier) = self.tiers.tier_for_plan(data.plan_id(), data.product_id()) else {
            log::info!(
                "Membership {} activated for unrecognized plan {:?} / product {:?}, ignored",
                data.id,
                data.plan_id(),
                data.product_id()
            );
            return Ok(());
        };
        let Some(tenant_id) = data.tenant_id() else {
            log::warn!("Membership {} activated without a company reference, skipped", data.id);
            return Ok(());
        };

        let current = subs::Entity::find_by_id(tenant_id.to_string())
            .one(&self.pool)
            .await?;
        if let Some(row) = &current
            && row.status == SubscriptionStatus::Active
            && row.tier == tier
            && row.membership_id.as_deref() == Some(data.id.as_str())
        {
            log::info!("Tenant {tenant_id} already on {tier} via membership {}", data.id);
            return Ok(());
        }

        let now = Utc::now();
        let plan_id = data.plan_id().or(data.product_id()).map(str::to_string);
        subs::Entity::insert(subs::ActiveModel {
            tenant_id: Set(tenant_id.to_string()),
            tier: Set(tier),
            plan_id: Set(plan_id),
            membership_id: Set(Some(data.id.clone())),
            user_id: Set(data.user.as_ref().map(|u| u.id.clone())),
            status: Set(SubscriptionStatus::Active),
            activated_at: Set(Some(now)),
            deactivated_at: Set(None),
            updated_at: Set(now),
        })
        .on_conflict(
            OnConflict::column(subs::Column::TenantId)
                .update_columns([
                    subs::Column::Tier,
                    subs::Column::PlanId,
                    subs::Column::MembershipId,
                    subs::Column::UserId,
                    subs::Column::Status,
                    subs::Column::ActivatedAt,
                    subs::Column::DeactivatedAt,
                    subs::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(&self.pool)
        .await
        .map_err(|e| AppError::from(e).logged("activate_subscription", tenant_id))?;

        log::info!("Tenant {tenant_id} upgraded to {tier} (membership {})", data.id);
        Ok(())
    }

    /// membership.deactivated: 按 membership id 查找, 只处理仍为 active 的记录
    pub async fn deactivate(&self, data: &MembershipData) -> AppResult<()> {
        if self
            .tiers
            .tier_for_plan(data.plan_id(), data.product_id())
            .is_none()
        {
            log::info!(
                "Membership {} deactivated for unrecognized plan, ignored",
                data.id
            );
            return Ok(());
        }

        let now = Utc::now();
        let result = subs::Entity::update_many()
            .col_expr(subs::Column::Tier, Expr::value(Tier::Free.to_string()))
            .col_expr(
                subs::Column::Status,
                Expr::value(SubscriptionStatus::Inactive.to_string()),
            )
            .col_expr(subs::Column::DeactivatedAt, Expr::value(Some(now)))
            .col_expr(subs::Column::UpdatedAt, Expr::value(now))
            .filter(subs::Column::MembershipId.eq(data.id.as_str()))
            .filter(subs::Column::Status.eq(SubscriptionStatus::Active))
            .exec(&self.pool)
            .await
            .map_err(|e| AppError::from(e).logged("deactivate_subscription", &data.id))?;

        if result.rows_affected == 0 {
            log::info!("Membership {} has no active subscription, nothing to do", data.id);
        } else {
            log::info!("Membership {} deactivated, tenant reset to free", data.id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IdRef;
    use crate::test_utils;
    use sea_orm::PaginatorTrait;

    fn membership(id: &str, plan: &str, company: Option<&str>) -> MembershipData {
        MembershipData {
            id: id.to_string(),
            plan: Some(IdRef { id: plan.to_string() }),
            product: None,
            company: company.map(|c| IdRef { id: c.to_string() }),
            user: Some(IdRef { id: "owner_1".to_string() }),
        }
    }

    #[tokio::test]
    async fn test_activation_is_idempotent() {
        let db = test_utils::setup_db().await;
        let service = test_utils::subscription_service(&db);
        let event = membership("mem_1", test_utils::PRO_PLAN, Some("tenant_a"));

        service.activate(&event).await.unwrap();
        service.activate(&event).await.unwrap();

        assert_eq!(subs::Entity::find().count(&db).await.unwrap(), 1);
        let row = subs::Entity::find_by_id("tenant_a".to_string())
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.tier, Tier::Pro);
        assert_eq!(row.status, SubscriptionStatus::Active);
        assert_eq!(row.plan_id.as_deref(), Some(test_utils::PRO_PLAN));
        assert_eq!(row.membership_id.as_deref(), Some("mem_1"));
        assert_eq!(row.user_id.as_deref(), Some("owner_1"));
        assert!(row.deactivated_at.is_none());
    }

    #[tokio::test]
    async fn test_second_activation_overwrites_tier() {
        let db = test_utils::setup_db().await;
        let service = test_utils::subscription_service(&db);

        service
            .activate(&membership("mem_1", test_utils::PRO_PLAN, Some("tenant_a")))
            .await
            .unwrap();
        service
            .activate(&membership("mem_2", test_utils::BUSINESS_PLAN, Some("tenant_a")))
            .await
            .unwrap();

        let tiers = test_utils::tier_service(&db);
        assert_eq!(tiers.resolve_tier("tenant_a").await.unwrap(), Tier::Business);
        assert_eq!(subs::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_plan_and_missing_company_are_ignored() {
        let db = test_utils::setup_db().await;
        let service = test_utils::subscription_service(&db);

        service
            .activate(&membership("mem_1", "plan_other", Some("tenant_a")))
            .await
            .unwrap();
        service
            .activate(&membership("mem_2", test_utils::PRO_PLAN, None))
            .await
            .unwrap();
        assert_eq!(subs::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deactivation_resets_to_free() {
        let db = test_utils::setup_db().await;
        let service = test_utils::subscription_service(&db);
        let tiers = test_utils::tier_service(&db);

        service
            .activate(&membership("mem_1", test_utils::PRO_PLAN, Some("tenant_a")))
            .await
            .unwrap();
        assert_eq!(tiers.resolve_tier("tenant_a").await.unwrap(), Tier::Pro);

        // 停用事件通常不带 company
        let deactivated = membership("mem_1", test_utils::PRO_PLAN, None);
        service.deactivate(&deactivated).await.unwrap();
        service.deactivate(&deactivated).await.unwrap();

        let row = subs::Entity::find_by_id("tenant_a".to_string())
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.tier, Tier::Free);
        assert_eq!(row.status, SubscriptionStatus::Inactive);
        assert!(row.deactivated_at.is_some());
        assert_eq!(tiers.resolve_tier("tenant_a").await.unwrap(), Tier::Free);
    }

    #[tokio::test]
    async fn test_handle_event_dispatch() {
        let db = test_utils::setup_db().await;
        let service = test_utils::subscription_service(&db);

        let body = format!(
            r#"{{"type":"membership.activated","data":{{"id":"mem_9","plan":{{"id":"{}"}},"company":{{"id":"tenant_z"}}}}}}"#,
            test_utils::BUSINESS_PLAN
        );
        service
            .handle_event(CommerceEvent::parse(body.as_bytes()).unwrap())
            .await
            .unwrap();
        service
            .handle_event(CommerceEvent::parse(br#"{"type":"payment.succeeded"}"#).unwrap())
            .await
            .unwrap();

        let tiers = test_utils::tier_service(&db);
        assert_eq!(tiers.resolve_tier("tenant_z").await.unwrap(), Tier::Business);
    }
}
