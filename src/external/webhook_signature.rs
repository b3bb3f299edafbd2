use crate::error::{AppError, AppResult};
use actix_web::http::header::HeaderMap;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_ID: &str = "webhook-id";
pub const HEADER_TIMESTAMP: &str = "webhook-timestamp";
pub const HEADER_SIGNATURE: &str = "webhook-signature";

/// Standard Webhooks 签名校验 (`v1,<base64 hmac-sha256>`)
#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    /// 密钥可带 `whsec_` 前缀; 合法 base64 时解码, 否则按原始字节使用
    pub fn new(secret: &str, tolerance_secs: i64) -> Self {
        let raw = secret.strip_prefix("whsec_").unwrap_or(secret);
        let key = STANDARD
            .decode(raw)
            .unwrap_or_else(|_| raw.as_bytes().to_vec());
        Self {
            key,
            tolerance_secs,
        }
    }

    fn mac(&self, msg_id: &str, timestamp: i64, body: &[u8]) -> AppResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| AppError::ConfigError(format!("Invalid webhook secret: {e}")))?;
        mac.update(msg_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }

    /// 生成 `v1,<signature>` (测试和本地调试用)
    pub fn sign(&self, msg_id: &str, timestamp: i64, body: &[u8]) -> AppResult<String> {
        let tag = self.mac(msg_id, timestamp, body)?.finalize().into_bytes();
        Ok(format!("v1,{}", STANDARD.encode(tag)))
    }

    pub fn verify(&self, headers: &HeaderMap, body: &[u8], now: i64) -> AppResult<()> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| AppError::InvalidSignature(format!("Missing {name} header")))
        };

        let msg_id = header(HEADER_ID)?;
        let timestamp: i64 = header(HEADER_TIMESTAMP)?
            .trim()
            .parse()
            .map_err(|_| AppError::InvalidSignature("Malformed timestamp".into()))?;
        let signatures = header(HEADER_SIGNATURE)?;

        if now.abs_diff(timestamp) > self.tolerance_secs.max(0) as u64 {
            return Err(AppError::InvalidSignature(
                "Timestamp outside tolerance".into(),
            ));
        }

        let mac = self.mac(msg_id, timestamp, body)?;
        for candidate in signatures.split_whitespace() {
            let Some(encoded) = candidate.strip_prefix("v1,") else {
                continue;
            };
            let Ok(expected) = STANDARD.decode(encoded) else {
                continue;
            };
            if mac.clone().verify_slice(&expected).is_ok() {
                return Ok(());
            }
        }

        Err(AppError::InvalidSignature("No matching signature".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};

    fn signed_headers(id: &str, ts: i64, signature: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in [
            (HEADER_ID, id.to_string()),
            (HEADER_TIMESTAMP, ts.to_string()),
            (HEADER_SIGNATURE, signature.to_string()),
        ] {
            map.insert(
                HeaderName::from_static(name),
                HeaderValue::from_str(&value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_valid_signature_passes() {
        let verifier = WebhookVerifier::new("whsec_c2VjcmV0LWtleQ==", 300);
        let body = br#"{"type":"membership.activated"}"#;
        let ts = 1_700_000_000;
        let sig = verifier.sign("msg_1", ts, body).unwrap();
        let headers = signed_headers("msg_1", ts, &format!("v1,bogus {sig}"));
        assert!(verifier.verify(&headers, body, ts + 10).is_ok());
    }

    #[test]
    fn test_tampered_body_fails() {
        let verifier = WebhookVerifier::new("plain-secret", 300);
        let ts = 1_700_000_000;
        let sig = verifier.sign("msg_2", ts, b"original").unwrap();
        let headers = signed_headers("msg_2", ts, &sig);
        assert!(matches!(
            verifier.verify(&headers, b"tampered", ts),
            Err(AppError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_stale_timestamp_fails() {
        let verifier = WebhookVerifier::new("plain-secret", 300);
        let ts = 1_700_000_000;
        let sig = verifier.sign("msg_3", ts, b"body").unwrap();
        let headers = signed_headers("msg_3", ts, &sig);
        assert!(verifier.verify(&headers, b"body", ts + 301).is_err());
    }

    #[test]
    fn test_extreme_timestamps_are_rejected() {
        let verifier = WebhookVerifier::new("plain-secret", 300);
        let now = 1_700_000_000;
        for ts in [i64::MIN, i64::MAX] {
            let headers = signed_headers("msg_5", ts, "v1,Zm9vYmFy");
            assert!(matches!(
                verifier.verify(&headers, b"body", now),
                Err(AppError::InvalidSignature(_))
            ));
        }
    }

    #[test]
    fn test_missing_headers_fail() {
        let verifier = WebhookVerifier::new("plain-secret", 300);
        assert!(matches!(
            verifier.verify(&HeaderMap::new(), b"body", 0),
            Err(AppError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let signer = WebhookVerifier::new("whsec_b25l", 300);
        let verifier = WebhookVerifier::new("whsec_dHdv", 300);
        let ts = 1_700_000_000;
        let sig = signer.sign("msg_4", ts, b"body").unwrap();
        let headers = signed_headers("msg_4", ts, &sig);
        assert!(verifier.verify(&headers, b"body", ts).is_err());
    }
}
