use crate::entities::entry_entity as entries;
use crate::error::{AppError, AppResult};
use rand::Rng;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

/// 去掉易混淆字符 (0/O, 1/I) 的 32 个字符
pub const REFERRAL_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const REFERRAL_CODE_LEN: usize = 8;
pub const MAX_GENERATION_ATTEMPTS: usize = 5;

/// 生成 8 位推荐码 (不检查唯一性)
pub fn generate_referral_code() -> String {
    let mut rng = rand::thread_rng();
    (0..REFERRAL_CODE_LEN)
        .map(|_| REFERRAL_ALPHABET[rng.gen_range(0..REFERRAL_ALPHABET.len())] as char)
        .collect()
}

pub fn is_valid_referral_code(code: &str) -> bool {
    code.len() == REFERRAL_CODE_LEN && code.bytes().all(|b| REFERRAL_ALPHABET.contains(&b))
}

/// 生成全局唯一的推荐码, 最多尝试 5 次
pub async fn generate_unique_referral_code<C: ConnectionTrait>(conn: &C) -> AppResult<String> {
    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        let code = generate_referral_code();

        let exists = entries::Entity::find()
            .filter(entries::Column::ReferralCode.eq(code.as_str()))
            .count(conn)
            .await?;

        if exists == 0 {
            return Ok(code);
        }
        log::warn!("Referral code collision on attempt {attempt}");
    }

    Err(AppError::InternalError(format!(
        "Could not generate a unique referral code after {MAX_GENERATION_ATTEMPTS} attempts"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_referral_code_format() {
        let code = generate_referral_code();
        assert_eq!(code.len(), REFERRAL_CODE_LEN);
        assert!(is_valid_referral_code(&code));
        assert!(!code.contains('0') && !code.contains('O'));
        assert!(!code.contains('1') && !code.contains('I'));
    }

    #[test]
    fn test_ten_thousand_codes_do_not_collide() {
        let codes: HashSet<String> = (0..10_000).map(|_| generate_referral_code()).collect();
        assert_eq!(codes.len(), 10_000);
    }

    #[test]
    fn test_is_valid_referral_code() {
        assert!(is_valid_referral_code("ABCD2345"));
        assert!(!is_valid_referral_code("ABCD234"));
        assert!(!is_valid_referral_code("ABCD0345"));
        assert!(!is_valid_referral_code("abcd2345"));
    }

    #[tokio::test]
    async fn test_generate_unique_referral_code_against_empty_table() {
        let db = crate::test_utils::setup_db().await;
        let code = generate_unique_referral_code(&db).await.unwrap();
        assert!(is_valid_referral_code(&code));
    }
}
