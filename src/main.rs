//! # OAB Exam Monitor
//!
//! Watches the pages where the Brazilian bar exam (Exame de Ordem) is
//! announced and forwards every new publication to a Telegram chat.
//!
//! ## Sources
//!
//! - **OAB**: the exam news page at `examedeordem.oab.org.br`
//! - **FGV**: the exam section of `oab.fgv.br`, where notices and results
//!   are published
//!
//! ## Usage
//!
//! ```sh
//! TELEGRAM_BOT_TOKEN=123:abc TELEGRAM_CHAT_ID=-1001 oab_exam_monitor
//! ```
//!
//! ## Architecture
//!
//! The monitor runs one cycle at a time, forever:
//! 1. **Fetching**: scrape both sources, OAB first
//! 2. **Deduping**: drop publications already in the history
//! 3. **Delivering**: send each new one to Telegram, with retries
//! 4. **Persisting**: save the history once if anything was delivered
//! 5. **Sleeping**: wait for the configured interval

use clap::Parser;
use std::error::Error;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod clock;
mod dispatch;
mod models;
mod monitor;
mod scrapers;
mod store;
mod telegram;
#[cfg(test)]
mod testing;
mod utils;

use cli::Cli;
use clock::TokioSleeper;
use dispatch::Dispatcher;
use models::SourceConfig;
use monitor::{Monitor, MonitorSettings, MonitorState};
use scrapers::{HttpScraper, build_client};
use store::{HistoryStore, JsonFileStore};
use telegram::TelegramChannel;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env is fine; variables may come from the environment.
    let dotenv = dotenvy::dotenv();

    let args = Cli::parse();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "oab_exam_monitor starting up");
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded .env");
    }

    let (token, chat_id) = match args.credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            error!(error = %e, "Missing Telegram credentials; refusing to start");
            return Err(e.into());
        }
    };

    let client = build_client()?;
    let store = JsonFileStore::new(args.state_path());
    info!(path = %store.path().display(), "Using history file");
    let history = store.load().await;

    let settings = MonitorSettings {
        sources: vec![SourceConfig::oab(), SourceConfig::fgv()],
        interval: args.interval(),
        send_delay: args.send_delay(),
        silence_errors: args.silence_errors,
    };
    let channel = TelegramChannel::new(client.clone(), args.telegram_api.clone(), token, chat_id);
    let dispatcher = Dispatcher::new(channel, TokioSleeper, args.max_retries);
    let monitor = Monitor::new(HttpScraper::new(client), dispatcher, store, settings);
    let mut state = MonitorState::new(history);

    if args.once {
        let report = monitor.tick(&mut state).await?;
        info!(
            fetched = report.fetched,
            delivered = report.delivered,
            failed = report.failed,
            persisted = report.persisted,
            "Single cycle finished"
        );
        return Ok(());
    }

    monitor.run(state).await;
    Ok(())
}
