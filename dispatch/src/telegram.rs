//! Telegram delivery. The worker never sees HTTP: outcomes are the typed
//! send errors below, with "user blocked the bot" distinguished because it
//! permanently detaches the recipient.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::types::JobPayload;

#[derive(Debug, Error)]
pub enum ChatSendError {
    /// The recipient blocked the bot; do not retry, detach the handle.
    #[error("recipient blocked the bot")]
    Blocked,

    #[error("chat provider rate limit")]
    RateLimited,

    #[error("chat send failed: {0}")]
    Other(String),
}

#[async_trait]
pub trait ChatSender: Send + Sync {
    /// Raw text send; digest and alert paths both end up here.
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), ChatSendError>;

    /// Alert send. The default rendering is minimal; the real formatting
    /// layer lives outside the core, but the bot API needs *some* text.
    async fn send(&self, chat_id: &str, payload: &JobPayload) -> Result<(), ChatSendError> {
        self.send_text(chat_id, &render(payload)).await
    }
}

fn render(payload: &JobPayload) -> String {
    let a = &payload.alert;
    let estimate_marker = if a.is_estimate { " (~)" } else { "" };
    format!(
        "{}: {} for {:.2} EUR{} (target {:.2})\n{}",
        a.notification_reason,
        a.item_name.as_deref().unwrap_or(&a.item_ref.id),
        a.total,
        estimate_marker,
        a.target,
        a.listing_url,
    )
}

pub struct TelegramSender {
    http: reqwest::Client,
    bot_token: String,
}

impl TelegramSender {
    pub fn new(http: reqwest::Client, bot_token: String) -> Self {
        Self { http, bot_token }
    }
}

#[async_trait]
impl ChatSender for TelegramSender {
    #[instrument(skip(self, text))]
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), ChatSendError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": false,
        });

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatSendError::Other(e.to_string()))?;

        match resp.status().as_u16() {
            200..=299 => {
                debug!("chat message delivered");
                Ok(())
            }
            403 => Err(ChatSendError::Blocked),
            429 => Err(ChatSendError::RateLimited),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(ChatSendError::Other(format!("status {status}: {body}")))
            }
        }
    }
}
