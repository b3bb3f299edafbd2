//! In-process queue for webhook side effects.
//!
//! The webhook endpoint acknowledges a delivery as soon as the signature checks out and
//! hands the parsed event to this queue. One worker task drains it in arrival order.
//! Delivery is at-most-once: a full queue drops the event, and a failed handler is
//! only logged.

use crate::models::CommerceEvent;
use crate::services::SubscriptionService;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Queued,
    Dropped,
}

#[derive(Clone)]
pub struct WebhookQueue {
    sender: mpsc::Sender<CommerceEvent>,
}

impl WebhookQueue {
    /// 创建队列并启动消费者
    pub fn start(capacity: usize, subscriptions: SubscriptionService) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<CommerceEvent>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let event_type = event.event_type().to_string();
                match subscriptions.handle_event(event).await {
                    Ok(()) => log::debug!("Webhook event {event_type} processed"),
                    Err(e) => log::error!("Failed to process webhook event {event_type}: {e}"),
                }
            }
            log::info!("Webhook queue closed, worker exiting");
        });

        (Self { sender }, worker)
    }

    /// 不等待; 队列满或已关闭时丢弃并记录日志
    pub fn submit(&self, event: CommerceEvent) -> SubmitOutcome {
        match self.sender.try_send(event) {
            Ok(()) => SubmitOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(event)) => {
                log::error!(
                    "Webhook queue full, dropping {} event",
                    event.event_type()
                );
                SubmitOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                log::error!(
                    "Webhook queue closed, dropping {} event",
                    event.event_type()
                );
                SubmitOutcome::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Tier;
    use crate::models::{IdRef, MembershipData};
    use crate::test_utils;

    #[tokio::test]
    async fn test_queued_event_is_processed() {
        let db = test_utils::setup_db().await;
        let (queue, worker) = WebhookQueue::start(8, test_utils::subscription_service(&db));

        let outcome = queue.submit(CommerceEvent::MembershipActivated(MembershipData {
            id: "mem_1".into(),
            plan: Some(IdRef {
                id: test_utils::PRO_PLAN.into(),
            }),
            product: None,
            company: Some(IdRef {
                id: "tenant_q".into(),
            }),
            user: None,
        }));
        assert_eq!(outcome, SubmitOutcome::Queued);

        drop(queue);
        worker.await.unwrap();

        let tier = test_utils::tier_service(&db)
            .resolve_tier("tenant_q")
            .await
            .unwrap();
        assert_eq!(tier, Tier::Pro);
    }

    #[tokio::test]
    async fn test_full_queue_drops_event() {
        let (sender, _receiver) = mpsc::channel(1);
        let queue = WebhookQueue { sender };

        let billing = || CommerceEvent::Billing {
            event_type: "payment.succeeded".into(),
        };
        assert_eq!(queue.submit(billing()), SubmitOutcome::Queued);
        assert_eq!(queue.submit(billing()), SubmitOutcome::Dropped);
    }
}
