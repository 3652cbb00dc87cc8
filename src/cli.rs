//! Command-line interface definitions.
//!
//! Every option can also be given through an environment variable, and a
//! `.env` file in the working directory is loaded before parsing.

use crate::clock::secs_f64;
use crate::dispatch::DEFAULT_MAX_ATTEMPTS;
use crate::store::STATE_FILE_NAME;
use crate::telegram::DEFAULT_API_URL;
use clap::Parser;
use clap::builder::BoolishValueParser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Startup configuration problems; the only fatal errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set (flag or environment variable)")]
    MissingCredential(&'static str),
}

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Credentials from the environment or .env
/// TELEGRAM_BOT_TOKEN=123:abc TELEGRAM_CHAT_ID=-1001 oab_exam_monitor
///
/// # Single cycle, announce failures in the chat
/// oab_exam_monitor --once --silence-errors false
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Chat receiving the notifications
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub chat_id: Option<String>,

    /// Seconds between monitoring cycles
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 10)]
    pub interval_secs: u64,

    /// Delivery attempts per message
    #[arg(long, env = "MAX_RETRIES", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_retries: u32,

    /// Seconds to wait after each delivery
    #[arg(long, env = "SEND_DELAY_SECS", default_value_t = 1.0)]
    pub send_delay_secs: f64,

    /// Keep cycle failures out of the chat
    #[arg(
        long,
        env = "SILENCE_ERRORS",
        default_value_t = true,
        action = clap::ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub silence_errors: bool,

    /// History file (default: publicacoes.json next to the executable)
    #[arg(long, env = "STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Telegram Bot API base URL
    #[arg(long, env = "TELEGRAM_API_URL", default_value = DEFAULT_API_URL)]
    pub telegram_api: String,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,
}

impl Cli {
    /// Bot token and chat id, both required and non-blank.
    pub fn credentials(&self) -> Result<(String, String), ConfigError> {
        let token = non_blank(&self.bot_token)
            .ok_or(ConfigError::MissingCredential("TELEGRAM_BOT_TOKEN"))?;
        let chat_id = non_blank(&self.chat_id)
            .ok_or(ConfigError::MissingCredential("TELEGRAM_CHAT_ID"))?;
        Ok((token, chat_id))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn send_delay(&self) -> Duration {
        secs_f64(self.send_delay_secs)
    }

    /// Where the history lives.
    pub fn state_path(&self) -> PathBuf {
        if let Some(path) = &self.state_file {
            return path.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(STATE_FILE_NAME)))
            .unwrap_or_else(|| PathBuf::from(STATE_FILE_NAME))
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
