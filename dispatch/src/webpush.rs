//! Web Push delivery with VAPID authorization.
//!
//! The gateway signs an ES256 JWT per push-service origin and posts a
//! zero-length notification; clients fetch alert content from the inbox
//! surface on wake.
//! TODO: RFC 8291 payload encryption once clients read inline payloads.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use store::PushSubscription;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Notification time-to-live at the push service.
const PUSH_TTL_SECS: u32 = 12 * 3600;

/// VAPID token lifetime; services reject anything over 24 h.
const VAPID_EXP_SECS: i64 = 12 * 3600;

#[derive(Debug, Error)]
pub enum PushSendError {
    /// Subscription is gone (404/410): deactivate it.
    #[error("subscription expired")]
    Gone,

    #[error("push send failed: {0}")]
    Other(String),
}

/// Per-subscription delivery seam; the worker fans out over these.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, sub: &PushSubscription) -> Result<(), PushSendError>;
}

#[derive(Serialize)]
struct VapidClaims {
    aud: String,
    exp: i64,
    sub: String,
}

pub struct VapidPushGateway {
    http: reqwest::Client,
    public_key: String,
    signing_key: EncodingKey,
    subject: String,
}

impl VapidPushGateway {
    /// `private_key_pem` is the ES256 (P-256) key the VAPID public key was
    /// derived from; `subject` is the mailto/https contact.
    pub fn new(
        http: reqwest::Client,
        public_key: String,
        private_key_pem: &str,
        subject: String,
    ) -> anyhow::Result<Self> {
        let signing_key = EncodingKey::from_ec_pem(private_key_pem.as_bytes())?;
        Ok(Self {
            http,
            public_key,
            signing_key,
            subject,
        })
    }

    fn vapid_token(&self, endpoint: &str, now_unix: i64) -> Result<String, PushSendError> {
        let origin = endpoint_origin(endpoint).ok_or_else(|| {
            PushSendError::Other(format!("endpoint has no origin: {endpoint}"))
        })?;

        let claims = VapidClaims {
            aud: origin,
            exp: now_unix + VAPID_EXP_SECS,
            sub: self.subject.clone(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::ES256), &claims, &self.signing_key)
            .map_err(|e| PushSendError::Other(format!("vapid signing: {e}")))
    }
}

fn endpoint_origin(endpoint: &str) -> Option<String> {
    let rest = endpoint.strip_prefix("https://")?;
    let host = rest.split('/').next()?;
    Some(format!("https://{host}"))
}

#[async_trait]
impl PushGateway for VapidPushGateway {
    #[instrument(skip(self, sub), fields(sub_id = %sub.sub_id))]
    async fn send(&self, sub: &PushSubscription) -> Result<(), PushSendError> {
        let token = self.vapid_token(&sub.endpoint, chrono::Utc::now().timestamp())?;

        let resp = self
            .http
            .post(&sub.endpoint)
            .header("TTL", PUSH_TTL_SECS.to_string())
            .header(
                "Authorization",
                format!("vapid t={token}, k={}", self.public_key),
            )
            .body(Vec::new())
            .send()
            .await
            .map_err(|e| PushSendError::Other(e.to_string()))?;

        match resp.status().as_u16() {
            200..=299 => {
                debug!("push accepted by service");
                Ok(())
            }
            404 | 410 => Err(PushSendError::Gone),
            status => {
                warn!(status, "push service rejected notification");
                Err(PushSendError::Other(format!("status {status}")))
            }
        }
    }
}

/// Validates that a stored subscription has usable key material before any
/// network round-trip.
pub fn subscription_keys_valid(sub: &PushSubscription) -> bool {
    URL_SAFE_NO_PAD.decode(&sub.p256dh).is_ok_and(|k| k.len() == 65)
        && URL_SAFE_NO_PAD.decode(&sub.auth).is_ok_and(|k| k.len() == 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_extraction() {
        assert_eq!(
            endpoint_origin("https://fcm.googleapis.com/fcm/send/abc123"),
            Some("https://fcm.googleapis.com".to_string())
        );
        assert_eq!(endpoint_origin("http://insecure.test/x"), None);
    }

    #[test]
    fn key_validation() {
        let sub = PushSubscription {
            sub_id: "s".into(),
            user_id: "u".into(),
            endpoint: "https://push.test/x".into(),
            p256dh: URL_SAFE_NO_PAD.encode([4u8; 65]),
            auth: URL_SAFE_NO_PAD.encode([1u8; 16]),
            active: true,
        };
        assert!(subscription_keys_valid(&sub));

        let bad = PushSubscription {
            p256dh: "not-base64!!".into(),
            ..sub
        };
        assert!(!subscription_keys_valid(&bad));
    }
}
