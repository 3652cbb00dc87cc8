//! Source scrapers for the monitored exam pages.
//!
//! Each source has its own module with a pure `extract(html, base_url)`
//! function mapping a page into [`Publication`]s:
//!
//! | Source | Module | Page layout |
//! |--------|--------|-------------|
//! | OAB | [`oab`] | Parallel `noticia-data` / `noticia-resumo` blocks |
//! | FGV | [`fgv`] | Table rows of date + title cell |
//!
//! [`HttpScraper`] downloads a page and dispatches to the right extractor.
//! It implements [`PublicationSource`], the contract the monitor relies on:
//! a fetch never fails past its boundary, errors are logged and the source
//! simply contributes nothing to that cycle.

pub mod fgv;
pub mod oab;

use crate::models::{Publication, Source, SourceConfig};
use reqwest::Client;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

/// Bound on every outbound request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; oab_exam_monitor/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Build the HTTP client shared by the scrapers and the Telegram channel.
pub fn build_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
}

/// Why a page could not be scraped.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {status}")]
    Status { status: reqwest::StatusCode },
}

/// Anything able to produce the current publications of a source.
pub trait PublicationSource {
    /// Fetch and extract the publications listed by `source`.
    ///
    /// Never fails: problems are logged and yield an empty list.
    async fn fetch_publications(&self, source: &SourceConfig) -> Vec<Publication>;
}

/// Scrapes source pages over HTTP.
#[derive(Debug, Clone)]
pub struct HttpScraper {
    client: Client,
}

impl HttpScraper {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    #[instrument(level = "debug", skip_all, fields(url = %url))]
    async fn download(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status { status });
        }
        let body = response.text().await?;
        debug!(bytes = body.len(), %status, "Downloaded page");
        Ok(body)
    }
}

impl PublicationSource for HttpScraper {
    #[instrument(level = "info", skip_all, fields(source = %source.source))]
    async fn fetch_publications(&self, source: &SourceConfig) -> Vec<Publication> {
        let t0 = Instant::now();
        match self.download(&source.page_url).await {
            Ok(html) => {
                let publications = extract(source, &html);
                info!(
                    count = publications.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Scraped source page"
                );
                publications
            }
            Err(e) => {
                error!(
                    url = %source.page_url,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    error = %e,
                    error_detail = ?e,
                    "Scraping failed; source skipped this cycle"
                );
                Vec::new()
            }
        }
    }
}

/// Run the extraction rules matching `source` over a downloaded page.
pub fn extract(source: &SourceConfig, html: &str) -> Vec<Publication> {
    match source.source {
        Source::Oab => oab::extract(html, &source.base_url),
        Source::Fgv => fgv::extract(html, &source.base_url),
    }
}
