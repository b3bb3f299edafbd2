use crate::error::{AppError, AppResult};
use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// 宿主平台的身份校验: 请求头 -> user id
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, headers: &HeaderMap) -> AppResult<String>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id on the host platform
    pub exp: i64,
    pub iat: i64,
}

/// HS256 JWT, 由宿主平台签发
#[derive(Clone)]
pub struct JwtIdentityVerifier {
    header_name: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtIdentityVerifier {
    pub fn new(secret: &str, header_name: &str) -> Self {
        Self {
            header_name: header_name.to_ascii_lowercase(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// 签发 token (宿主平台侧的行为, 用于本地调试和测试)
    pub fn issue_token(&self, user_id: &str, expires_in_secs: i64) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + Duration::seconds(expires_in_secs)).timestamp(),
            iat: now.timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    fn extract_token<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        if let Some(value) = headers.get(self.header_name.as_str())
            && let Ok(token) = value.to_str()
            && !token.trim().is_empty()
        {
            return Some(token.trim());
        }

        headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

impl IdentityVerifier for JwtIdentityVerifier {
    fn verify(&self, headers: &HeaderMap) -> AppResult<String> {
        let token = self
            .extract_token(headers)
            .ok_or_else(|| AppError::Unauthenticated("Missing user token".into()))?;

        let validation = Validation::new(Algorithm::HS256);
        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthenticated(format!("Invalid user token: {e}")))?;

        if claims.sub.is_empty() {
            return Err(AppError::Unauthenticated("Token has no subject".into()));
        }
        Ok(claims.sub)
    }
}
