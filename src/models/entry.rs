use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::entry_entity;

/// 参与 giveaway 请求 (所有字段可选)
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct EnterGiveawayRequest {
    /// 推荐人的 referral code
    pub referral_code: Option<String>,
    pub email: Option<String>,
    pub membership_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EnterGiveawayResponse {
    pub entry_id: Uuid,
    pub referral_code: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntryResponse {
    pub id: Uuid,
    pub user_id: String,
    pub email: Option<String>,
    pub entry_count: i32,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub referral_count: i32,
    pub created_at: DateTime<Utc>,
}

impl From<entry_entity::Model> for EntryResponse {
    fn from(m: entry_entity::Model) -> Self {
        EntryResponse {
            id: m.id,
            user_id: m.user_id,
            email: m.email,
            entry_count: m.entry_count,
            referral_code: m.referral_code,
            referred_by: m.referred_by,
            referral_count: m.referral_count,
            created_at: m.created_at,
        }
    }
}

/// 当前用户在某个 giveaway 中的参与状态
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserEntryResponse {
    pub has_entered: bool,
    pub entry: Option<EntryResponse>,
}
