use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// 抽奖结果: 只暴露中奖用户, 不暴露 entry id
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PickWinnerResponse {
    pub winner_id: Uuid,
    pub user_id: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WinnerResponse {
    pub id: Uuid,
    pub user_id: String,
    pub email: Option<String>,
    pub position: i32,
    pub selected_at: DateTime<Utc>,
    pub notified: bool,
    pub prize_claimed: bool,
}
