//! Message formatting and delivery with retry.
//!
//! [`Dispatcher`] wraps a [`DeliveryChannel`] the way a retry decorator wraps
//! a client: callers hand it a message and get back whether it was delivered.
//!
//! # Retry Strategy
//!
//! For attempt `n` in `1..=max_attempts`:
//! - success: done
//! - rate limited: sleep `retry_after + 1` s (30 s when the API gives no hint)
//! - rejected: stop immediately, the message is not retried
//! - transient: sleep `2^n` s

use crate::clock::Sleeper;
use crate::models::Publication;
use crate::telegram::{DeliveryChannel, DeliveryError};
use crate::utils::{escape_html, escape_url};
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// Wait used when a rate-limit response carries no `retry_after`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Default number of delivery attempts per message.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Render a publication as a Telegram HTML message.
///
/// The title is percent-decoded and loses a trailing `.pdf`; it becomes a
/// link when the publication has a URL.
///
/// # Examples
///
/// ```ignore
/// let p = Publication::new(Source::Fgv, "10/03/2025", "Edital%20123.pdf", Some(url));
/// assert!(format_message(&p).contains(r#">Edital 123</a>"#));
/// ```
pub fn format_message(publication: &Publication) -> String {
    let title = escape_html(&readable_title(&publication.title));
    let title = match &publication.url {
        Some(url) => format!(r#"<a href="{}">{}</a>"#, escape_url(url), title),
        None => title,
    };

    format!(
        "🆕 <b>Nova publicação no monitoramento!</b>\n\n\
         📌 <b>Título:</b> {}\n\
         📅 <b>Data:</b> {}\n\
         🏛️ <b>Fonte:</b> {}\n\n\
         🔔 Fique atento para novidades!",
        title,
        escape_html(&publication.date),
        publication.source,
    )
}

/// Decode percent escapes and drop a trailing `.pdf`.
fn readable_title(raw: &str) -> String {
    let decoded = urlencoding::decode_binary(raw.as_bytes());
    let decoded = String::from_utf8_lossy(&decoded);
    let trimmed = decoded.trim();
    let stem = match trimmed.len().checked_sub(4) {
        Some(cut)
            if trimmed.is_char_boundary(cut) && trimmed[cut..].eq_ignore_ascii_case(".pdf") =>
        {
            &trimmed[..cut]
        }
        _ => trimmed,
    };
    stem.trim_end().to_string()
}

/// Delivers messages through a channel, retrying per the module policy.
#[derive(Debug)]
pub struct Dispatcher<C, S> {
    channel: C,
    sleeper: S,
    max_attempts: u32,
}

impl<C, S> Dispatcher<C, S>
where
    C: DeliveryChannel,
    S: Sleeper,
{
    pub fn new(channel: C, sleeper: S, max_attempts: u32) -> Self {
        Self {
            channel,
            sleeper,
            max_attempts,
        }
    }

    /// The wrapped channel, for one-shot messages outside the retry policy.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Try to deliver `text`; `true` once the channel accepted it.
    #[instrument(level = "info", skip_all, fields(max = self.max_attempts))]
    pub async fn deliver_with_retry(&self, text: &str) -> bool {
        let total_t0 = Instant::now();

        for attempt in 1..=self.max_attempts {
            match self.channel.send(text).await {
                Ok(()) => {
                    info!(
                        attempt,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        "Message delivered"
                    );
                    return true;
                }
                Err(DeliveryError::RateLimited { retry_after }) => {
                    let wait = retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        wait_secs = wait,
                        "Rate limited; waiting"
                    );
                    self.sleeper.sleep(Duration::from_secs(wait.saturating_add(1))).await;
                }
                Err(e @ DeliveryError::Rejected { .. }) => {
                    error!(attempt, error = %e, "Message rejected; not retrying");
                    break;
                }
                Err(DeliveryError::Transient(e)) => {
                    let delay = Duration::from_secs(1u64 << attempt.min(16));
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        ?delay,
                        error = %e,
                        "Delivery attempt failed; backing off"
                    );
                    self.sleeper.sleep(delay).await;
                }
            }
        }

        error!(
            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
            "Giving up on message"
        );
        false
    }
}
