use serde::{Serialize, Serializer};
use utoipa::ToSchema;

use crate::entities::Tier;

/// A quota value. `Unlimited` is its own variant so no count can ever reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Limited(u64),
    Unlimited,
}

impl Limit {
    /// `true` once `current` usage leaves no room for one more.
    pub fn is_reached(self, current: u64) -> bool {
        match self {
            Limit::Limited(max) => current >= max,
            Limit::Unlimited => false,
        }
    }
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Limit::Limited(max) => write!(f, "{max}"),
            Limit::Unlimited => write!(f, "unlimited"),
        }
    }
}

/// Serialized as a number, or `null` for unlimited.
impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Limit::Limited(max) => serializer.serialize_u64(*max),
            Limit::Unlimited => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct TierLimits {
    #[schema(value_type = Option<u64>)]
    pub max_active_giveaways: Limit,
    #[schema(value_type = Option<u64>)]
    pub max_entries_per_giveaway: Limit,
    #[schema(value_type = Option<u64>)]
    pub max_winners_per_giveaway: Limit,
}

impl TierLimits {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Free => TierLimits {
                max_active_giveaways: Limit::Limited(1),
                max_entries_per_giveaway: Limit::Limited(100),
                max_winners_per_giveaway: Limit::Limited(1),
            },
            Tier::Pro => TierLimits {
                max_active_giveaways: Limit::Limited(5),
                max_entries_per_giveaway: Limit::Unlimited,
                max_winners_per_giveaway: Limit::Limited(10),
            },
            Tier::Business => TierLimits {
                max_active_giveaways: Limit::Unlimited,
                max_entries_per_giveaway: Limit::Unlimited,
                max_winners_per_giveaway: Limit::Unlimited,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TierDisplay {
    pub label: &'static str,
    pub price: &'static str,
}

impl TierDisplay {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Free => TierDisplay {
                label: "Free",
                price: "$0/mo",
            },
            Tier::Pro => TierDisplay {
                label: "Pro",
                price: "$14.99/mo",
            },
            Tier::Business => TierDisplay {
                label: "Business",
                price: "$39.99/mo",
            },
        }
    }
}

/// 仪表盘顶部展示的档位信息
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TierInfoResponse {
    pub tier: Tier,
    pub limits: TierLimits,
    pub display: TierDisplay,
    pub active_giveaways: u64,
}

/// "1 active giveaway" / "5 active giveaways"
pub fn pluralize(count: u64, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
