//! Background work for the application.
//!
//! `spawn_all` launches the recurring jobs once during startup; `webhook_queue` holds the
//! worker that applies webhook side effects after the delivery has been acknowledged.

pub mod webhook_queue;

pub use webhook_queue::{SubmitOutcome, WebhookQueue};

use crate::services::GiveawayService;

/// Spawn all background tasks.
///
/// Detaches via `tokio::spawn`; does not block.
pub fn spawn_all(giveaway_service: GiveawayService, expire_interval_secs: u64) {
    // 定时把已过结束时间的 giveaway 置为 ended
    {
        let svc = giveaway_service.clone();
        let interval = std::time::Duration::from_secs(expire_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                match svc.expire_due_giveaways().await {
                    Ok(n) if n > 0 => log::info!("Giveaways ended by schedule: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to expire giveaways: {e:?}"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }
}
