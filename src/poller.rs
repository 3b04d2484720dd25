//! Background market snapshot poller.
//!
//! One task fetches the backend's `{ "data": { SYMBOL: record } }` payload on a
//! fixed interval and swaps the result into a [`SnapshotStore`]. Failures never
//! leave this module: they only change the reported [`PollStatus`] and the
//! last good snapshot stays visible.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use crate::market::MarketSnapshot;
use crate::observability::{log_poll_outcome, log_poller_start, log_poller_stop};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 15_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("connection error: {0}")]
    Transport(String),
    #[error("data shape error: {0}")]
    Shape(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    Loading,
    Connected,
    DataError,
    ConnectionError,
}

impl PollStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Loading => "Loading...",
            Self::Connected => "✅ Connected",
            Self::DataError => "❌ Data Error",
            Self::ConnectionError => "❌ Connection Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollerState {
    pub snapshot: Arc<MarketSnapshot>,
    pub status: PollStatus,
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for PollerState {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(MarketSnapshot::default()),
            status: PollStatus::Loading,
            last_update: None,
        }
    }
}

/// Shared, last-known market state. Readers always see a complete snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<PollerState>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: MarketSnapshot) -> Self {
        let store = Self::new();
        store.apply_at(Ok(snapshot), Utc::now());
        store
    }

    pub fn state(&self) -> PollerState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn snapshot(&self) -> Arc<MarketSnapshot> {
        Arc::clone(
            &self
                .inner
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .snapshot,
        )
    }

    pub fn apply(&self, outcome: Result<MarketSnapshot, FetchError>) -> PollStatus {
        self.apply_at(outcome, Utc::now())
    }

    pub fn apply_at(
        &self,
        outcome: Result<MarketSnapshot, FetchError>,
        now: DateTime<Utc>,
    ) -> PollStatus {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(snapshot) => {
                guard.snapshot = Arc::new(snapshot);
                guard.last_update = Some(now);
                guard.status = PollStatus::Connected;
            }
            Err(FetchError::Transport(_)) => guard.status = PollStatus::ConnectionError,
            Err(FetchError::Shape(_)) => guard.status = PollStatus::DataError,
        }
        guard.status
    }
}

pub trait SnapshotFetcher: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<MarketSnapshot, FetchError>> + Send;
}

/// Validates an HTTP response from the data endpoint.
///
/// A body that is not JSON at all (an HTML error page from an intermediate
/// proxy, a truncated response) counts as a connection failure. Valid JSON
/// with a non-2xx status or without a usable `data` object is a shape error.
pub fn decode_payload(http_status: u16, body: &[u8]) -> Result<MarketSnapshot, FetchError> {
    let payload: serde_json::Value = serde_json::from_slice(body)
        .map_err(|err| FetchError::Transport(format!("response body is not JSON: {err}")))?;

    if !(200..300).contains(&http_status) {
        return Err(FetchError::Shape(format!(
            "unexpected HTTP status {http_status}"
        )));
    }

    let data = match payload.get("data") {
        Some(value) if !value.is_null() => value.clone(),
        _ => return Err(FetchError::Shape("missing `data` field".to_string())),
    };

    serde_json::from_value(data)
        .map_err(|err| FetchError::Shape(format!("`data` is not a market snapshot: {err}")))
}

pub struct ReqwestSnapshotFetcher {
    client: reqwest::Client,
    url: String,
}

impl ReqwestSnapshotFetcher {
    pub fn new(url: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sigdash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| FetchError::Transport(format!("HTTP client build failed: {err}")))?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SnapshotFetcher for ReqwestSnapshotFetcher {
    async fn fetch(&self) -> Result<MarketSnapshot, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        decode_payload(status.as_u16(), &body)
    }
}

/// Runs one fetch and records the outcome.
pub async fn poll_once<F: SnapshotFetcher + ?Sized>(
    fetcher: &F,
    store: &SnapshotStore,
) -> PollStatus {
    let outcome = fetcher.fetch().await;
    log_poll_outcome(&outcome);
    store.apply(outcome)
}

pub struct MarketPoller;

impl MarketPoller {
    /// Starts polling immediately, then once per `interval`. Must be called
    /// inside a tokio runtime.
    pub fn spawn<F: SnapshotFetcher>(
        fetcher: F,
        store: SnapshotStore,
        interval: Duration,
    ) -> PollerHandle {
        log_poller_start(interval);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                poll_once(&fetcher, &store).await;
            }
        });

        PollerHandle { task: Some(task) }
    }
}

/// Owns the polling task. Stopping (explicitly or by drop) cancels it once.
#[derive(Debug)]
pub struct PollerHandle {
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Returns `true` only for the call that actually cancelled the task.
    pub fn stop(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                log_poller_stop();
                true
            }
            None => false,
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
