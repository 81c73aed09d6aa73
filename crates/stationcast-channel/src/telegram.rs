//! Telegram Bot API delivery channel.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stationcast_core::channel::{DeliveryChannel, DeliveryError};
use tracing::{debug, instrument};

use crate::error::TelegramError;

/// Default Bot API base URL.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Connection settings for [`TelegramChannel`].
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token issued by `BotFather`.
    pub token: String,
    /// Bot API base URL, without a trailing slash.
    pub api_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Optional `parse_mode` sent with every message (`HTML`, `MarkdownV2`).
    pub parse_mode: Option<String>,
}

impl TelegramConfig {
    /// Settings for the public Bot API with a 10 second timeout and plain
    /// text messages.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: DEFAULT_API_URL.to_owned(),
            timeout: Duration::from_secs(10),
            parse_mode: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Sends messages through the Telegram Bot API `sendMessage` method.
pub struct TelegramChannel {
    client: reqwest::Client,
    endpoint: String,
    parse_mode: Option<String>,
}

impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The endpoint embeds the bot token.
        f.debug_struct("TelegramChannel")
            .field("parse_mode", &self.parse_mode)
            .finish_non_exhaustive()
    }
}

impl TelegramChannel {
    /// Builds the channel.
    ///
    /// # Errors
    ///
    /// Returns `TelegramError::Setup` if the HTTP client cannot be built.
    pub fn new(config: TelegramConfig) -> Result<Self, TelegramError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| TelegramError::Setup(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_url.trim_end_matches('/'),
                config.token
            ),
            parse_mode: config.parse_mode,
        })
    }

    /// Calls `sendMessage` and returns the raw client error on failure.
    ///
    /// # Errors
    ///
    /// Returns `TelegramError::Timeout` or `TelegramError::Network` if the
    /// request fails, and `TelegramError::Api` if Telegram refuses it.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TelegramError> {
        let body = SendMessage {
            chat_id,
            text,
            parse_mode: self.parse_mode.as_deref(),
        };

        let resp = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = resp.status();
        let text = resp.text().await?;
        let parsed: Option<ApiResponse> = serde_json::from_str(&text).ok();
        if status.is_success() && parsed.as_ref().is_none_or(|r| r.ok) {
            return Ok(());
        }

        let (description, retry_after) = match parsed {
            Some(api) => (
                api.description.unwrap_or_default(),
                api.parameters.and_then(|p| p.retry_after),
            ),
            None => (text, None),
        };
        Err(TelegramError::Api {
            status: status.as_u16(),
            description,
            retry_after,
        })
    }
}

#[async_trait]
impl DeliveryChannel for TelegramChannel {
    #[instrument(skip(self, message), fields(chars = message.chars().count()))]
    async fn send(&self, recipient: &str, message: &str) -> Result<(), DeliveryError> {
        self.send_message(recipient, message).await.map_err(|err| {
            debug!(error = %err, "telegram send failed");
            err.classify()
        })
    }
}
