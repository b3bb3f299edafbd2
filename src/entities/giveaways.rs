use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum GiveawayStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "ended")]
    Ended,
}

impl GiveawayStatus {
    /// 状态只能 draft -> active -> ended 单向推进
    pub fn rank(self) -> u8 {
        match self {
            GiveawayStatus::Draft => 0,
            GiveawayStatus::Active => 1,
            GiveawayStatus::Ended => 2,
        }
    }
}

impl std::fmt::Display for GiveawayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GiveawayStatus::Draft => write!(f, "draft"),
            GiveawayStatus::Active => write!(f, "active"),
            GiveawayStatus::Ended => write!(f, "ended"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum WinnerSelectionMethod {
    #[sea_orm(string_value = "random_weighted")]
    RandomWeighted,
    #[sea_orm(string_value = "manual")]
    Manual,
    #[sea_orm(string_value = "milestone")]
    Milestone,
}

/// 奖品信息 (JSON 列)
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
pub struct PrizeDetails {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "giveaways")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: String,
    pub title: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub prize_details: PrizeDetails,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: GiveawayStatus,
    pub winner_selection_method: WinnerSelectionMethod,
    /// 目标中奖人数 (>= 1)
    pub winner_count: i32,
    pub bonus_entries_per_referral: i32,
    /// 单个 entry 可累计的 entry_count 上限 (NULL = 不限)
    pub max_entries_per_user: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// 当前时间是否处于 [start_date, end_date] 内
    pub fn accepts_entries_at(&self, now: DateTime<Utc>) -> bool {
        self.status == GiveawayStatus::Active && now >= self.start_date && now <= self.end_date
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::entries::Entity")]
    Entries,
    #[sea_orm(has_many = "super::winners::Entity")]
    Winners,
}

impl Related<super::entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl Related<super::winners::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Winners.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
