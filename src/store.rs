//! Durable history of delivered publications.
//!
//! The history is a JSON array written next to the executable (by default
//! `publicacoes.json`). It only ever contains publications whose delivery
//! succeeded, and it is rewritten as a whole:
//!
//! ```text
//! publicacoes.json.tmp   <- full new content, synced
//! publicacoes.json       <- replaced by rename
//! ```
//!
//! A crash at any point leaves either the old or the new file, never a mix.
//! Reading is forgiving: a missing, unreadable or corrupt file is an empty
//! history.

use crate::models::Publication;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, instrument, warn};

/// Default file name of the history.
pub const STATE_FILE_NAME: &str = "publicacoes.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not encode history: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persistence of the delivered-publication history.
pub trait HistoryStore {
    /// Read the history; problems are logged and yield an empty list.
    async fn load(&self) -> Vec<Publication>;

    /// Replace the persisted history with `history`.
    ///
    /// On error the previously persisted history is left untouched.
    async fn save(&self, history: &[Publication]) -> Result<(), StoreError>;
}

/// True if `history` already holds a publication with the same
/// source, date and title as `candidate`.
pub fn contains(history: &[Publication], candidate: &Publication) -> bool {
    history.iter().any(|p| p.same_as(candidate))
}

/// [`HistoryStore`] backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    async fn write_atomically(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let tmp = self.temp_path();
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| StoreError::Io { path, source }
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_err(parent))?;
        }

        let mut file = fs::File::create(&tmp).await.map_err(io_err(&tmp))?;
        file.write_all(bytes).await.map_err(io_err(&tmp))?;
        file.sync_all().await.map_err(io_err(&tmp))?;
        drop(file);

        fs::rename(&tmp, &self.path).await.map_err(io_err(&self.path))
    }
}

impl HistoryStore for JsonFileStore {
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    async fn load(&self) -> Vec<Publication> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No history file yet; starting empty");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "Could not read history; starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<Publication>>(&bytes) {
            Ok(history) => {
                info!(count = history.len(), "Loaded history");
                history
            }
            Err(e) => {
                warn!(error = %e, "History file is corrupt; starting empty");
                Vec::new()
            }
        }
    }

    #[instrument(
        level = "info",
        skip_all,
        fields(path = %self.path.display(), count = history.len())
    )]
    async fn save(&self, history: &[Publication]) -> Result<(), StoreError> {
        let result = match serde_json::to_vec_pretty(history) {
            Ok(bytes) => self.write_atomically(&bytes).await,
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(()) => info!("Saved history"),
            Err(e) => {
                error!(error = %e, error_detail = ?e, "Failed to save history; previous file kept");
                let _ = fs::remove_file(self.temp_path()).await;
            }
        }
        result
    }
}
