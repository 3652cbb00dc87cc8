//! Telegram Bot API delivery channel.
//!
//! Messages go through `sendMessage` with HTML parse mode. Failures are
//! classified so the dispatcher can decide whether to retry:
//!
//! | Response | [`DeliveryError`] | Dispatcher reaction |
//! |----------|-------------------|---------------------|
//! | 429 | `RateLimited` | wait `retry_after + 1` s, retry |
//! | other 4xx, `ok: false` | `Rejected` | give up on the message |
//! | 5xx, timeout, connection error | `Transient` | exponential backoff |

use crate::utils::truncate_for_log;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Public Bot API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Why a message was not delivered.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The API asked us to slow down.
    #[error("rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },
    /// The API refused the message; sending it again will not help.
    #[error("rejected with status {status}: {description}")]
    Rejected { status: u16, description: String },
    /// Network trouble or a server-side error.
    #[error("transient failure: {0}")]
    Transient(String),
}

/// Anything able to deliver a text message to the monitored chat.
pub trait DeliveryChannel {
    async fn send(&self, text: &str) -> Result<(), DeliveryError>;
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    ok: bool,
    description: Option<String>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

/// Sends messages to one chat through one bot.
#[derive(Clone)]
pub struct TelegramChannel {
    client: Client,
    api_url: String,
    token: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(
        client: Client,
        api_url: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_url.trim_end_matches('/'),
            self.token
        )
    }
}

// The token is a credential; keep it out of logs.
impl fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramChannel")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl DeliveryChannel for TelegramChannel {
    #[instrument(level = "debug", skip_all, fields(chat_id = %self.chat_id, len = text.len()))]
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: false,
        };

        let response = self
            .client
            .post(self.endpoint())
            .form(&payload)
            .send()
            .await
            // reqwest errors carry the URL, which embeds the token.
            .map_err(|e| DeliveryError::Transient(e.without_url().to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let result = classify(status, &body);
        match &result {
            Ok(()) => debug!(%status, "Telegram accepted message"),
            Err(e) => warn!(
                %status,
                error = %e,
                body = %truncate_for_log(&body, 300),
                "Telegram did not accept message"
            ),
        }
        result
    }
}

/// Map a Bot API response onto a delivery outcome.
fn classify(status: StatusCode, body: &str) -> Result<(), DeliveryError> {
    let parsed = serde_json::from_str::<ApiResponse>(body).ok();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = parsed
            .and_then(|r| r.parameters)
            .and_then(|p| p.retry_after);
        return Err(DeliveryError::RateLimited { retry_after });
    }

    if status.is_server_error() {
        return Err(DeliveryError::Transient(format!("server error {status}")));
    }

    let description = || {
        parsed
            .as_ref()
            .and_then(|r| r.description.clone())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string())
    };

    if !status.is_success() {
        return Err(DeliveryError::Rejected {
            status: status.as_u16(),
            description: description(),
        });
    }

    match &parsed {
        Some(r) if !r.ok => Err(DeliveryError::Rejected {
            status: status.as_u16(),
            description: description(),
        }),
        _ => Ok(()),
    }
}
