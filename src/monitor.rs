//! The polling loop.
//!
//! Every cycle walks the same states:
//!
//! ```text
//! FETCHING -> DEDUPING -> DELIVERING -> PERSISTING -> SLEEPING -> FETCHING ...
//! ```
//!
//! [`Monitor::run_cycle`] holds the cycle logic and touches the outside world
//! only through the injected capabilities, so it can be driven by tests.
//! [`Monitor::tick`] wraps it with failure isolation and [`Monitor::run`]
//! repeats ticks forever.
//!
//! A publication enters the history only after its delivery succeeded, and
//! the history is written once per cycle when something new was delivered
//! (or when an earlier write failed).

use crate::clock::Sleeper;
use crate::dispatch::{Dispatcher, format_message};
use crate::models::{CycleReport, Publication, Source, SourceConfig};
use crate::scrapers::PublicationSource;
use crate::store::{HistoryStore, StoreError, contains};
use crate::telegram::DeliveryChannel;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// Sent to the chat when a cycle fails and errors are not silenced.
pub const ERROR_NOTICE: &str = "❌ Erro no monitoramento. Verifique os logs.";

/// What can abort a cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("could not persist history: {0}")]
    Persist(#[from] StoreError),
    #[error("cycle panicked: {0}")]
    Panicked(String),
}

/// Tunables of the loop.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Sources in polling order.
    pub sources: Vec<SourceConfig>,
    /// Pause between the end of a cycle and the start of the next.
    pub interval: Duration,
    /// Pause after each delivery.
    pub send_delay: Duration,
    /// Do not report cycle failures to the chat.
    pub silence_errors: bool,
}

/// State carried from one cycle to the next.
#[derive(Debug, Default)]
pub struct MonitorState {
    /// Every publication delivered so far, oldest first.
    pub history: Vec<Publication>,
    last_counts: HashMap<Source, usize>,
    /// The history holds deliveries not yet written out.
    unsaved: bool,
}

impl MonitorState {
    pub fn new(history: Vec<Publication>) -> Self {
        Self {
            history,
            last_counts: HashMap::new(),
            unsaved: false,
        }
    }

    /// Remember how many items `source` returned; true if that changed.
    fn observe_count(&mut self, source: Source, count: usize) -> bool {
        self.last_counts.insert(source, count) != Some(count)
    }
}

pub struct Monitor<P, C, H, S> {
    sources: P,
    dispatcher: Dispatcher<C, S>,
    store: H,
    settings: MonitorSettings,
}

impl<P, C, H, S> Monitor<P, C, H, S>
where
    P: PublicationSource,
    C: DeliveryChannel,
    H: HistoryStore,
    S: Sleeper,
{
    pub fn new(
        sources: P,
        dispatcher: Dispatcher<C, S>,
        store: H,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            sources,
            dispatcher,
            store,
            settings,
        }
    }

    /// Poll forever, one cycle at a time.
    pub async fn run(&self, mut state: MonitorState) {
        info!(
            interval_secs = self.settings.interval.as_secs_f64(),
            sources = self.settings.sources.len(),
            known = state.history.len(),
            "Monitoring active"
        );
        loop {
            let _ = self.tick(&mut state).await;
            self.dispatcher.sleeper().sleep(self.settings.interval).await;
        }
    }

    /// Run one cycle, containing any failure.
    ///
    /// Errors and panics are logged and, unless silenced, announced in the
    /// chat. They are returned for callers that want to know, but the state
    /// stays usable for the next cycle either way.
    pub async fn tick(&self, state: &mut MonitorState) -> Result<CycleReport, CycleError> {
        let outcome = AssertUnwindSafe(self.run_cycle(state)).catch_unwind().await;
        let err = match outcome {
            Ok(Ok(report)) => return Ok(report),
            Ok(Err(e)) => e,
            Err(panic) => CycleError::Panicked(panic_message(panic.as_ref())),
        };

        error!(error = %err, error_detail = ?err, "Monitoring cycle failed");
        if !self.settings.silence_errors {
            if let Err(e) = self.dispatcher.channel().send(ERROR_NOTICE).await {
                error!(error = %e, "Could not send failure notice");
            }
        }
        Err(err)
    }

    /// Fetch, deliver what is new, persist.
    #[instrument(level = "info", skip_all)]
    pub async fn run_cycle(&self, state: &mut MonitorState) -> Result<CycleReport, CycleError> {
        let t0 = Instant::now();
        info!("Starting monitoring cycle");

        let mut candidates = Vec::new();
        for source in &self.settings.sources {
            let found = self.sources.fetch_publications(source).await;
            if state.observe_count(source.source, found.len()) {
                info!(source = %source.source, count = found.len(), "Publications found");
            }
            candidates.extend(found);
        }

        let mut report = CycleReport {
            fetched: candidates.len(),
            ..CycleReport::default()
        };

        for candidate in candidates {
            if contains(&state.history, &candidate) {
                continue;
            }

            let message = format_message(&candidate);
            if self.dispatcher.deliver_with_retry(&message).await {
                info!(
                    source = %candidate.source,
                    date = %candidate.date,
                    title = %candidate.title,
                    "New publication delivered"
                );
                state.history.push(candidate);
                state.unsaved = true;
                report.delivered += 1;
            } else {
                warn!(
                    source = %candidate.source,
                    title = %candidate.title,
                    "Publication not delivered; will retry next cycle"
                );
                report.failed += 1;
            }

            self.dispatcher.sleeper().sleep(self.settings.send_delay).await;
        }

        if !state.unsaved {
            info!(failed = report.failed, "No novelty this cycle");
        } else {
            self.store.save(&state.history).await?;
            state.unsaved = false;
            report.persisted = true;
            info!(
                delivered = report.delivered,
                failed = report.failed,
                total = state.history.len(),
                "New publications delivered and saved"
            );
        }

        info!(elapsed_ms = t0.elapsed().as_millis() as u64, "Cycle complete");
        Ok(report)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
