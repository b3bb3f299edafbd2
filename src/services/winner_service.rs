use crate::entities::{
    GiveawayStatus, entry_entity as entries, giveaway_entity as giveaways,
    winner_entity as winners,
};
use crate::error::{AppError, AppResult, map_unique_violation};
use crate::models::{Limit, PickWinnerResponse, WinnerResponse, pluralize};
use crate::services::TierService;
use crate::services::giveaway_service::{find_owned_giveaway, require_caller};
use crate::utils::pick_weighted_index;
use chrono::Utc;
use dashmap::DashMap;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set, TransactionTrait,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// 离开作用域时, 若没有其他持有者则从表中移除该 giveaway 的锁
struct DrawLockLease<'a> {
    locks: &'a DashMap<Uuid, Arc<Mutex<()>>>,
    giveaway_id: Uuid,
}

impl Drop for DrawLockLease<'_> {
    fn drop(&mut self) {
        self.locks
            .remove_if(&self.giveaway_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[derive(Clone)]
pub struct WinnerService {
    pool: DatabaseConnection,
    tiers: TierService,
    /// 每个 giveaway 一把锁, 同一 giveaway 的抽奖串行执行
    draw_locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl WinnerService {
    pub fn new(pool: DatabaseConnection, tiers: TierService) -> Self {
        Self {
            pool,
            tiers,
            draw_locks: Arc::new(DashMap::new()),
        }
    }

    fn lock_for(&self, giveaway_id: Uuid) -> Arc<Mutex<()>> {
        self.draw_locks
            .entry(giveaway_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn lease(&self, giveaway_id: Uuid) -> DrawLockLease<'_> {
        DrawLockLease {
            locks: &self.draw_locks,
            giveaway_id,
        }
    }

    /// 抽取下一位中奖者
    ///
    /// 加锁后在一个事务中完成: 校验归属与状态 -> 中奖人数 / 档位上限 ->
    /// 排除已中奖 entry -> 按 entry_count 加权随机 -> 写入 winner (position = 已有数 + 1)
    pub async fn pick_winner(
        &self,
        tenant_id: &str,
        giveaway_id: Uuid,
        caller: Option<&str>,
    ) -> AppResult<PickWinnerResponse> {
        let user_id = require_caller(caller)?;

        // lease 先于锁创建, 请求被取消时也会在锁释放之后回收
        let lease = self.lease(giveaway_id);
        let guard = self.lock_for(giveaway_id).lock_owned().await;
        let result = self.draw(tenant_id, giveaway_id).await;
        drop(guard);
        drop(lease);

        let winner = result.map_err(|e| e.logged("pick_winner", giveaway_id))?;
        log::info!(
            "Winner #{} drawn for giveaway {giveaway_id} by {user_id}",
            winner.position
        );
        Ok(winner)
    }

    async fn draw(&self, tenant_id: &str, giveaway_id: Uuid) -> AppResult<PickWinnerResponse> {
        let txn = self.pool.begin().await?;

        let giveaway = giveaways::Entity::find_by_id(giveaway_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Giveaway not found".into()))?;
        if giveaway.tenant_id != tenant_id {
            return Err(AppError::Forbidden(
                "Giveaway does not belong to this company".into(),
            ));
        }
        if giveaway.status != GiveawayStatus::Ended {
            return Err(AppError::InvalidState(
                "Winners can only be picked after the giveaway has ended".into(),
            ));
        }

        let existing = winners::Entity::find()
            .filter(winners::Column::GiveawayId.eq(giveaway_id))
            .count(&txn)
            .await?;
        if existing >= giveaway.winner_count.max(0) as u64 {
            return Err(AppError::Completed("All winners have already been selected".into()));
        }

        let tier = TierService::resolve_tier_on(&txn, tenant_id).await?;
        let cap = TierService::limits(tier).max_winners_per_giveaway;
        if let Limit::Limited(max) = cap
            && cap.is_reached(existing)
        {
            return Err(AppError::QuotaExceeded(format!(
                "The {tier} plan allows {} per giveaway. Upgrade to pick more.",
                pluralize(max, "winner")
            )));
        }

        let eligible = Self::eligible_entries(&txn, giveaway_id).await?;
        let weights: Vec<u64> = eligible
            .iter()
            .map(|e| e.entry_count.max(0) as u64)
            .collect();
        let picked = {
            let mut rng = rand::thread_rng();
            pick_weighted_index(&weights, &mut rng)
        };
        let Some(index) = picked else {
            return Err(AppError::NoEligibleEntries);
        };
        let entry = &eligible[index];

        let position = existing as i32 + 1;
        let winner = winners::ActiveModel {
            id: Set(Uuid::new_v4()),
            giveaway_id: Set(giveaway_id),
            entry_id: Set(entry.id),
            position: Set(position),
            selected_at: Set(Utc::now()),
            notified: Set(false),
            notified_at: Set(None),
            prize_claimed: Set(false),
            claimed_at: Set(None),
            notes: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                AppError::InvalidState("Winner was drawn concurrently, please retry".into())
            })
        })?;

        txn.commit().await?;

        Ok(PickWinnerResponse {
            winner_id: winner.id,
            user_id: entry.user_id.clone(),
            position,
        })
    }

    /// 尚未中奖的 entry, 按 id 排序保证遍历顺序确定
    async fn eligible_entries(
        txn: &DatabaseTransaction,
        giveaway_id: Uuid,
    ) -> AppResult<Vec<entries::Model>> {
        let already_won = winners::Entity::find()
            .select_only()
            .column(winners::Column::EntryId)
            .filter(winners::Column::GiveawayId.eq(giveaway_id))
            .into_query();

        let list = entries::Entity::find()
            .filter(entries::Column::GiveawayId.eq(giveaway_id))
            .filter(entries::Column::Id.not_in_subquery(already_won))
            .order_by_asc(entries::Column::Id)
            .all(txn)
            .await?;
        Ok(list)
    }

    /// 中奖列表, 按 position 排序
    pub async fn list_winners(
        &self,
        tenant_id: &str,
        giveaway_id: Uuid,
        caller: Option<&str>,
    ) -> AppResult<Vec<WinnerResponse>> {
        require_caller(caller)?;
        find_owned_giveaway(&self.pool, tenant_id, giveaway_id).await?;

        let rows = winners::Entity::find()
            .filter(winners::Column::GiveawayId.eq(giveaway_id))
            .order_by_asc(winners::Column::Position)
            .find_also_related(entries::Entity)
            .all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(w, entry)| WinnerResponse {
                id: w.id,
                user_id: entry.as_ref().map(|e| e.user_id.clone()).unwrap_or_default(),
                email: entry.and_then(|e| e.email),
                position: w.position,
                selected_at: w.selected_at,
                notified: w.notified,
                prize_claimed: w.prize_claimed,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{SubscriptionStatus, Tier};
    use crate::test_utils;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_pick_requires_ended_giveaway() {
        let db = test_utils::setup_db().await;
        let service = test_utils::winner_service(&db);

        for status in [GiveawayStatus::Draft, GiveawayStatus::Active] {
            let g = test_utils::insert_giveaway(&db, "tenant_a", status).await;
            test_utils::insert_entry(&db, g.id, "u1", 1).await;
            assert!(matches!(
                service.pick_winner("tenant_a", g.id, Some("admin")).await,
                Err(AppError::InvalidState(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_pick_checks_caller_and_tenant() {
        let db = test_utils::setup_db().await;
        let service = test_utils::winner_service(&db);
        let g = test_utils::insert_giveaway(&db, "tenant_a", GiveawayStatus::Ended).await;
        test_utils::insert_entry(&db, g.id, "u1", 1).await;

        assert!(matches!(
            service.pick_winner("tenant_a", g.id, None).await,
            Err(AppError::Unauthenticated(_))
        ));
        assert!(matches!(
            service.pick_winner("tenant_b", g.id, Some("admin")).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.pick_winner("tenant_a", Uuid::new_v4(), Some("admin")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_no_eligible_entries() {
        let db = test_utils::setup_db().await;
        let service = test_utils::winner_service(&db);
        let g = test_utils::insert_giveaway(&db, "tenant_a", GiveawayStatus::Ended).await;

        assert!(matches!(
            service.pick_winner("tenant_a", g.id, Some("admin")).await,
            Err(AppError::NoEligibleEntries)
        ));
    }

    #[tokio::test]
    async fn test_free_tier_single_winner_then_completed() {
        let db = test_utils::setup_db().await;
        let service = test_utils::winner_service(&db);
        let g = test_utils::insert_giveaway(&db, "tenant_a", GiveawayStatus::Ended).await;
        test_utils::insert_entry(&db, g.id, "u1", 1).await;
        test_utils::insert_entry(&db, g.id, "u2", 1).await;

        let first = service.pick_winner("tenant_a", g.id, Some("admin")).await.unwrap();
        assert_eq!(first.position, 1);
        assert!(["u1", "u2"].contains(&first.user_id.as_str()));

        assert!(matches!(
            service.pick_winner("tenant_a", g.id, Some("admin")).await,
            Err(AppError::Completed(_))
        ));
    }

    #[tokio::test]
    async fn test_tier_cap_is_stricter_than_winner_count() {
        let db = test_utils::setup_db().await;
        let service = test_utils::winner_service(&db);
        let g = test_utils::insert_giveaway_with(&db, "tenant_a", GiveawayStatus::Ended, 3, 1, None)
            .await;
        for user in ["u1", "u2", "u3"] {
            test_utils::insert_entry(&db, g.id, user, 1).await;
        }

        service.pick_winner("tenant_a", g.id, Some("admin")).await.unwrap();
        assert!(matches!(
            service.pick_winner("tenant_a", g.id, Some("admin")).await,
            Err(AppError::QuotaExceeded(_))
        ));
    }

    #[tokio::test]
    async fn test_sequential_picks_never_repeat_an_entry() {
        let db = test_utils::setup_db().await;
        test_utils::set_subscription(&db, "tenant_a", Tier::Business, SubscriptionStatus::Active)
            .await;
        let service = test_utils::winner_service(&db);
        let g = test_utils::insert_giveaway_with(&db, "tenant_a", GiveawayStatus::Ended, 5, 1, None)
            .await;
        for (i, weight) in [1, 10, 1, 5, 2].iter().enumerate() {
            test_utils::insert_entry(&db, g.id, &format!("u{i}"), *weight).await;
        }

        let mut users = HashSet::new();
        for expected_position in 1..=5 {
            let w = service.pick_winner("tenant_a", g.id, Some("admin")).await.unwrap();
            assert_eq!(w.position, expected_position);
            assert!(users.insert(w.user_id));
        }
        assert!(matches!(
            service.pick_winner("tenant_a", g.id, Some("admin")).await,
            Err(AppError::Completed(_))
        ));

        let listed = service.list_winners("tenant_a", g.id, Some("admin")).await.unwrap();
        assert_eq!(listed.len(), 5);
        let positions: Vec<i32> = listed.iter().map(|w| w.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_concurrent_picks_respect_winner_count() {
        let db = test_utils::setup_db().await;
        test_utils::set_subscription(&db, "tenant_a", Tier::Pro, SubscriptionStatus::Active).await;
        let service = test_utils::winner_service(&db);
        let g = test_utils::insert_giveaway_with(&db, "tenant_a", GiveawayStatus::Ended, 3, 1, None)
            .await;
        for i in 0..10 {
            test_utils::insert_entry(&db, g.id, &format!("u{i}"), 1 + i % 3).await;
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let id = g.id;
            handles.push(tokio::spawn(async move {
                service.pick_winner("tenant_a", id, Some("admin")).await
            }));
        }

        let mut picked = HashSet::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(w) => assert!(picked.insert(w.user_id)),
                Err(AppError::Completed(_)) => {}
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }
        assert_eq!(picked.len(), 3);

        let stored = winners::Entity::find()
            .filter(winners::Column::GiveawayId.eq(g.id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(stored, 3);
        assert!(service.draw_locks.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_draw_releases_lock() {
        let db = test_utils::setup_db().await;
        let service = test_utils::winner_service(&db);
        let g = test_utils::insert_giveaway(&db, "tenant_a", GiveawayStatus::Ended).await;
        test_utils::insert_entry(&db, g.id, "u1", 1).await;

        // 占住唯一的连接, 让抽奖停在事务开始处
        let txn = db.begin().await.unwrap();
        let handle = {
            let service = service.clone();
            let id = g.id;
            tokio::spawn(async move { service.pick_winner("tenant_a", id, Some("admin")).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(service.draw_locks.len(), 1);

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        txn.rollback().await.unwrap();

        assert!(service.draw_locks.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_no_lock_behind() {
        let db = test_utils::setup_db().await;
        let service = test_utils::winner_service(&db);
        let g = test_utils::insert_giveaway(&db, "tenant_a", GiveawayStatus::Ended).await;
        test_utils::insert_entry(&db, g.id, "u1", 1).await;

        let lease = service.lease(g.id);
        let held = service.lock_for(g.id).lock_owned().await;
        let handle = {
            let service = service.clone();
            let id = g.id;
            tokio::spawn(async move { service.pick_winner("tenant_a", id, Some("admin")).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        drop(held);
        drop(lease);
        assert!(service.draw_locks.is_empty());
    }
}
