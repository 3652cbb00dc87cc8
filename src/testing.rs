//! In-memory doubles for the monitor's capabilities.

use crate::clock::Sleeper;
use crate::models::{Publication, Source, SourceConfig};
use crate::scrapers::PublicationSource;
use crate::store::{HistoryStore, StoreError};
use crate::telegram::{DeliveryChannel, DeliveryError};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Mutex;
use std::time::Duration;

/// Channel replaying scripted outcomes, then a fallback.
pub struct FakeChannel {
    script: Mutex<VecDeque<Result<(), DeliveryError>>>,
    fallback: Box<dyn Fn() -> Result<(), DeliveryError>>,
    sent: Mutex<Vec<String>>,
    panic_on_attempt: Option<usize>,
}

impl Default for FakeChannel {
    fn default() -> Self {
        Self::scripted(Vec::new())
    }
}

impl FakeChannel {
    /// Play `script` in order, then accept everything.
    pub fn scripted(script: Vec<Result<(), DeliveryError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Box::new(|| Ok(())),
            sent: Mutex::new(Vec::new()),
            panic_on_attempt: None,
        }
    }

    /// Fail every attempt with `error()`.
    pub fn failing(error: impl Fn() -> DeliveryError + 'static) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Box::new(move || Err(error())),
            sent: Mutex::new(Vec::new()),
            panic_on_attempt: None,
        }
    }

    /// Panic inside the `n`th call to `send`, counting from 1.
    pub fn panicking_on_attempt(mut self, n: usize) -> Self {
        self.panic_on_attempt = Some(n);
        self
    }

    /// Every text handed to `send`, successful or not.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl DeliveryChannel for FakeChannel {
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        let attempt = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(text.to_string());
            sent.len()
        };
        if self.panic_on_attempt == Some(attempt) {
            panic!("channel blew up on attempt {attempt}");
        }
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| (self.fallback)())
    }
}

/// Records requested sleeps and returns at once.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.slept().into_iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

/// Sources serving fixed publications per tag.
#[derive(Default)]
pub struct FakeSources {
    pages: Mutex<HashMap<Source, Vec<Publication>>>,
    panic_on: Option<Source>,
}

impl FakeSources {
    pub fn with(mut self, source: Source, publications: Vec<Publication>) -> Self {
        self.pages.get_mut().unwrap().insert(source, publications);
        self
    }

    pub fn panicking_on(mut self, source: Source) -> Self {
        self.panic_on = Some(source);
        self
    }

    pub fn set(&self, source: Source, publications: Vec<Publication>) {
        self.pages.lock().unwrap().insert(source, publications);
    }
}

impl PublicationSource for FakeSources {
    async fn fetch_publications(&self, source: &SourceConfig) -> Vec<Publication> {
        if self.panic_on == Some(source.source) {
            panic!("scraper blew up on {}", source.source);
        }
        self.pages
            .lock()
            .unwrap()
            .get(&source.source)
            .cloned()
            .unwrap_or_default()
    }
}

/// Keeps every saved snapshot in memory.
#[derive(Default)]
pub struct RecordingStore {
    saves: Mutex<Vec<Vec<Publication>>>,
    fail: bool,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            saves: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn saves(&self) -> Vec<Vec<Publication>> {
        self.saves.lock().unwrap().clone()
    }
}

impl HistoryStore for RecordingStore {
    async fn load(&self) -> Vec<Publication> {
        self.saves.lock().unwrap().last().cloned().unwrap_or_default()
    }

    async fn save(&self, history: &[Publication]) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Io {
                path: "publicacoes.json".into(),
                source: io::Error::other("disk full"),
            });
        }
        self.saves.lock().unwrap().push(history.to_vec());
        Ok(())
    }
}
