use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use crate::models::{NotificationChannel, NotificationConfig};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notifications are not enabled")]
    NotEnabled,

    #[error("Telegram is not configured. Provide a bot token and at least one chat ID.")]
    NotConfigured,

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("delivery timed out")]
    Timeout,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Outbound messaging transport: deliver `text` to the recipients in `config`.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, config: &NotificationConfig, text: &str) -> Result<(), NotifyError>;
}

/// Telegram Bot API `sendMessage` with HTML parse mode.
#[derive(Debug, Clone)]
pub struct TelegramMessenger {
    http: reqwest::Client,
    api_base: String,
}

impl TelegramMessenger {
    pub fn new(timeout: Duration) -> Result<Self, NotifyError> {
        Self::with_api_base(TELEGRAM_API_BASE, timeout)
    }

    pub fn with_api_base(api_base: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.into(),
        })
    }

    async fn send_to_chat(&self, token: &str, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        // The request URL embeds the bot token; keep it out of the error.
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Delivery(format!("status {status}: {detail}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    /// Succeeds if at least one chat accepted the message.
    async fn send(&self, config: &NotificationConfig, text: &str) -> Result<(), NotifyError> {
        if config.channel != NotificationChannel::Telegram || config.telegram_bot_token.is_empty() {
            return Err(NotifyError::NotConfigured);
        }
        let recipients = config.recipients();
        if recipients.is_empty() {
            return Err(NotifyError::NotConfigured);
        }

        let mut delivered = 0usize;
        let mut last_err = None;
        for chat_id in &recipients {
            match self.send_to_chat(&config.telegram_bot_token, chat_id, text).await {
                Ok(()) => {
                    delivered += 1;
                    tracing::debug!(chat_id = %chat_id, "Telegram message sent");
                }
                Err(e) => {
                    tracing::warn!(chat_id = %chat_id, error = %e, "Failed to send Telegram message");
                    last_err = Some(e);
                }
            }
        }

        match (delivered, last_err) {
            (0, Some(e)) => Err(NotifyError::Delivery(format!(
                "no chat accepted the message: {e}"
            ))),
            _ => Ok(()),
        }
    }
}
