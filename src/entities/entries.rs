use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 参与记录实体
/// 说明:
/// - (giveaway_id, user_id) 唯一
/// - referral_code 全局唯一，用于分享
/// - entry_count 为抽奖权重，初始 1，推荐成功后增加
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub giveaway_id: Uuid,
    pub user_id: String,
    pub email: Option<String>,
    pub membership_id: Option<String>,
    pub entry_count: i32,
    pub referral_code: String,
    /// 推荐人的 referral_code
    pub referred_by: Option<String>,
    pub referral_count: i32,
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::giveaways::Entity",
        from = "Column::GiveawayId",
        to = "super::giveaways::Column::Id"
    )]
    Giveaway,
    #[sea_orm(has_many = "super::winners::Entity")]
    Winners,
}

impl Related<super::giveaways::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Giveaway.def()
    }
}

impl Related<super::winners::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Winners.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
