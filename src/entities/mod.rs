pub mod entries;
pub mod giveaways;
pub mod tenant_subscriptions;
pub mod winners;

pub use entries as entry_entity;
pub use giveaways as giveaway_entity;
pub use tenant_subscriptions as tenant_subscription_entity;
pub use winners as winner_entity;

pub use giveaways::{GiveawayStatus, PrizeDetails, WinnerSelectionMethod};
pub use tenant_subscriptions::{SubscriptionStatus, Tier};
