use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{GiveawayStatus, PrizeDetails, WinnerSelectionMethod, giveaway_entity};
use crate::error::{AppError, AppResult};

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_WINNER_COUNT: i32 = 1000;
pub const MAX_BONUS_ENTRIES_PER_REFERRAL: i32 = 1000;

/// 创建 giveaway 请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateGiveawayRequest {
    /// 标题 (1-100 字符)
    pub title: String,
    pub description: Option<String>,
    /// 奖品标题 (1-100 字符)
    pub prize_title: String,
    pub prize_description: Option<String>,
    pub prize_value: Option<f64>,
    pub prize_currency: Option<String>,
    /// 奖品图片, 必须是绝对 URL
    pub prize_image_url: Option<String>,
    /// 结束时间, RFC3339 或 `YYYY-MM-DDTHH:MM[:SS]` (按 UTC 解析)
    pub end_date: String,
    pub winner_selection_method: Option<WinnerSelectionMethod>,
    /// 目标中奖人数 (默认 1)
    pub winner_count: Option<i32>,
    /// 每次成功推荐奖励的 entry 数 (默认 1)
    pub bonus_entries_per_referral: Option<i32>,
    pub max_entries_per_user: Option<i32>,
}

/// Input that passed validation, ready to be persisted.
#[derive(Debug, Clone)]
pub struct ValidatedGiveaway {
    pub title: String,
    pub description: Option<String>,
    pub prize: PrizeDetails,
    pub end_date: DateTime<Utc>,
    pub winner_selection_method: WinnerSelectionMethod,
    pub winner_count: i32,
    pub bonus_entries_per_referral: i32,
    pub max_entries_per_user: Option<i32>,
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn parse_end_date(raw: &str) -> AppResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        && let Some(naive) = date.and_hms_opt(23, 59, 59)
    {
        return Ok(naive.and_utc());
    }
    Err(AppError::ValidationError(format!(
        "Invalid end date: {raw}"
    )))
}

impl CreateGiveawayRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> AppResult<ValidatedGiveaway> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::ValidationError("Title is required".into()));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::ValidationError(format!(
                "Title must be at most {MAX_TITLE_LEN} characters"
            )));
        }

        let description = non_blank(self.description.as_ref());
        if let Some(d) = &description
            && d.chars().count() > MAX_DESCRIPTION_LEN
        {
            return Err(AppError::ValidationError(format!(
                "Description must be at most {MAX_DESCRIPTION_LEN} characters"
            )));
        }

        let prize_title = self.prize_title.trim();
        if prize_title.is_empty() {
            return Err(AppError::ValidationError("Prize title is required".into()));
        }
        if prize_title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::ValidationError(format!(
                "Prize title must be at most {MAX_TITLE_LEN} characters"
            )));
        }

        let image_url = non_blank(self.prize_image_url.as_ref());
        if let Some(u) = &image_url {
            url::Url::parse(u)
                .map_err(|_| AppError::ValidationError(format!("Invalid prize image URL: {u}")))?;
        }

        if let Some(v) = self.prize_value
            && (!v.is_finite() || v < 0.0)
        {
            return Err(AppError::ValidationError(
                "Prize value must be a non-negative number".into(),
            ));
        }

        let end_date = parse_end_date(&self.end_date)?;
        if end_date <= now {
            return Err(AppError::ValidationError(
                "End date must be in the future".into(),
            ));
        }

        let winner_count = self.winner_count.unwrap_or(1);
        if !(1..=MAX_WINNER_COUNT).contains(&winner_count) {
            return Err(AppError::ValidationError(format!(
                "Winner count must be between 1 and {MAX_WINNER_COUNT}"
            )));
        }

        let bonus_entries_per_referral = self.bonus_entries_per_referral.unwrap_or(1);
        if !(0..=MAX_BONUS_ENTRIES_PER_REFERRAL).contains(&bonus_entries_per_referral) {
            return Err(AppError::ValidationError(format!(
                "Bonus entries per referral must be between 0 and {MAX_BONUS_ENTRIES_PER_REFERRAL}"
            )));
        }

        if let Some(max) = self.max_entries_per_user
            && max < 1
        {
            return Err(AppError::ValidationError(
                "Max entries per user must be at least 1".into(),
            ));
        }

        Ok(ValidatedGiveaway {
            title: title.to_string(),
            description,
            prize: PrizeDetails {
                title: prize_title.to_string(),
                description: non_blank(self.prize_description.as_ref()),
                value: self.prize_value,
                currency: non_blank(self.prize_currency.as_ref()),
                image_url,
            },
            end_date,
            winner_selection_method: self
                .winner_selection_method
                .unwrap_or(WinnerSelectionMethod::RandomWeighted),
            winner_count,
            bonus_entries_per_referral,
            max_entries_per_user: self.max_entries_per_user,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateGiveawayResponse {
    pub giveaway_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: GiveawayStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GiveawayResponse {
    pub id: Uuid,
    pub tenant_id: String,
    pub title: String,
    pub description: Option<String>,
    pub prize: PrizeDetails,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: GiveawayStatus,
    pub winner_selection_method: WinnerSelectionMethod,
    pub winner_count: i32,
    pub bonus_entries_per_referral: i32,
    pub max_entries_per_user: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<giveaway_entity::Model> for GiveawayResponse {
    fn from(m: giveaway_entity::Model) -> Self {
        GiveawayResponse {
            id: m.id,
            tenant_id: m.tenant_id,
            title: m.title,
            description: m.description,
            prize: m.prize_details,
            start_date: m.start_date,
            end_date: m.end_date,
            status: m.status,
            winner_selection_method: m.winner_selection_method,
            winner_count: m.winner_count,
            bonus_entries_per_referral: m.bonus_entries_per_referral,
            max_entries_per_user: m.max_entries_per_user,
            created_at: m.created_at,
        }
    }
}

/// 列表项: giveaway 以及参与/中奖统计
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GiveawaySummary {
    pub giveaway: GiveawayResponse,
    pub total_entries: u64,
    pub total_winners: u64,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_giveaways: u64,
    pub active_giveaways: u64,
    pub total_entries: u64,
    pub total_winners: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(end_date: &str) -> CreateGiveawayRequest {
        CreateGiveawayRequest {
            title: "Summer drop".into(),
            description: None,
            prize_title: "Hoodie".into(),
            prize_description: None,
            prize_value: Some(59.0),
            prize_currency: Some("USD".into()),
            prize_image_url: None,
            end_date: end_date.into(),
            winner_selection_method: None,
            winner_count: None,
            bonus_entries_per_referral: None,
            max_entries_per_user: None,
        }
    }

    #[test]
    fn test_valid_request_applies_defaults() {
        let now = Utc::now();
        let end = (now + Duration::days(7)).to_rfc3339();
        let valid = request(&end).validate(now).unwrap();
        assert_eq!(valid.title, "Summer drop");
        assert_eq!(valid.winner_count, 1);
        assert_eq!(valid.bonus_entries_per_referral, 1);
        assert_eq!(valid.winner_selection_method, WinnerSelectionMethod::RandomWeighted);
        assert_eq!(valid.prize.title, "Hoodie");
        assert_eq!(valid.prize.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_rejects_blank_and_long_titles() {
        let now = Utc::now();
        let end = (now + Duration::days(1)).to_rfc3339();

        let mut req = request(&end);
        req.title = "   ".into();
        assert!(matches!(req.validate(now), Err(AppError::ValidationError(_))));

        let mut req = request(&end);
        req.title = "x".repeat(101);
        assert!(matches!(req.validate(now), Err(AppError::ValidationError(_))));

        let mut req = request(&end);
        req.prize_title = String::new();
        assert!(matches!(req.validate(now), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_end_date_must_be_in_future() {
        let now = Utc::now();
        let past = (now - Duration::minutes(1)).to_rfc3339();
        assert!(matches!(
            request(&past).validate(now),
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            request("not a date").validate(now),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_parse_end_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2030, 5, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap()
            .and_utc();
        assert_eq!(parse_end_date("2030-05-01T12:30:00Z").unwrap(), expected);
        assert_eq!(parse_end_date("2030-05-01T14:30:00+02:00").unwrap(), expected);
        assert_eq!(parse_end_date("2030-05-01T12:30").unwrap(), expected);
    }

    #[test]
    fn test_prize_image_url_must_be_absolute() {
        let now = Utc::now();
        let end = (now + Duration::days(1)).to_rfc3339();

        let mut req = request(&end);
        req.prize_image_url = Some("/images/prize.png".into());
        assert!(matches!(req.validate(now), Err(AppError::ValidationError(_))));

        req.prize_image_url = Some("https://cdn.example.com/prize.png".into());
        let valid = req.validate(now).unwrap();
        assert_eq!(
            valid.prize.image_url.as_deref(),
            Some("https://cdn.example.com/prize.png")
        );
    }

    #[test]
    fn test_rejects_invalid_counts() {
        let now = Utc::now();
        let end = (now + Duration::days(1)).to_rfc3339();

        let mut req = request(&end);
        req.winner_count = Some(0);
        assert!(req.validate(now).is_err());

        let mut req = request(&end);
        req.bonus_entries_per_referral = Some(-1);
        assert!(req.validate(now).is_err());

        let mut req = request(&end);
        req.max_entries_per_user = Some(0);
        assert!(req.validate(now).is_err());
    }

    #[test]
    fn test_counts_have_upper_bounds() {
        let now = Utc::now();
        let end = (now + Duration::days(1)).to_rfc3339();

        let mut req = request(&end);
        req.bonus_entries_per_referral = Some(i32::MAX);
        assert!(matches!(req.validate(now), Err(AppError::ValidationError(_))));

        let mut req = request(&end);
        req.winner_count = Some(MAX_WINNER_COUNT + 1);
        assert!(matches!(req.validate(now), Err(AppError::ValidationError(_))));

        let mut req = request(&end);
        req.winner_count = Some(MAX_WINNER_COUNT);
        req.bonus_entries_per_referral = Some(MAX_BONUS_ENTRIES_PER_REFERRAL);
        assert!(req.validate(now).is_ok());
    }
}
