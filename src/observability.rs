//! Logging setup and the structured events the dashboard emits.
//!
//! Every event carries a `component` and an `event` field so JSON output can
//! be filtered without parsing messages. Call sites go through the helpers
//! below rather than invoking `tracing` macros directly.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use axum::http::Method;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::DashboardConfig;
use crate::market::MarketSnapshot;
use crate::poller::FetchError;
use crate::view::ViewState;

const SERVER: &str = "dashboard_server";
const POLLER: &str = "poller";
const HTTP: &str = "dashboard_http";

pub const LOG_LEVEL_VAR: &str = "SIGDASH_LOG_LEVEL";
pub const LOG_FORMAT_VAR: &str = "SIGDASH_LOG_FORMAT";
pub const LOG_TARGET_VAR: &str = "SIGDASH_LOG_TARGET";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive string such as `info` or `sigdash=debug`.
    pub level: String,
    pub format: LogFormat,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank or unparseable values keep
    /// the default for that field.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let level = lookup(LOG_LEVEL_VAR)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .unwrap_or(defaults.level);
        let format = lookup(LOG_FORMAT_VAR)
            .and_then(|raw| LogFormat::parse(&raw))
            .unwrap_or(defaults.format);
        let include_target = lookup(LOG_TARGET_VAR)
            .and_then(|raw| parse_switch(&raw))
            .unwrap_or(defaults.include_target);

        Self {
            level,
            format,
            include_target,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_target(config.include_target)
        .with_ansi(config.format == LogFormat::Pretty);

    match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }

    Ok(())
}

fn parse_switch(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// Server lifecycle.

pub fn log_app_start(config: &LoggingConfig) {
    info!(
        component = SERVER,
        event = "app.start",
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        log_format = ?config.format
    );
}

pub fn log_backend_selected(config: &DashboardConfig) {
    info!(
        component = SERVER,
        event = "backend.selected",
        backend_api_url = %config.backend_api_url,
        data_url = %config.data_url(),
        poll_interval_ms = config.poll_interval_ms
    );

    if config.has_unenforced_access_settings() {
        warn!(
            component = SERVER,
            event = "auth.not_enforced",
            password_set = config.dashboard_password.is_some(),
            allowed_ips = config.allowed_ips.len()
        );
    }
}

pub fn log_app_bind(bound_addr: SocketAddr) {
    info!(
        component = SERVER,
        event = "app.bind",
        bind_addr = %bound_addr,
        route = "/dashboard"
    );
}

pub fn log_shutdown_signal_error(err: &std::io::Error) {
    warn!(component = SERVER, event = "app.signal.error", error = %err);
}

pub fn log_app_stop() {
    info!(component = SERVER, event = "app.stop");
}

// Poller.

pub(crate) fn log_poller_start(interval: Duration) {
    info!(
        component = POLLER,
        event = "poller.start",
        interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
    );
}

pub(crate) fn log_poller_stop() {
    info!(component = POLLER, event = "poller.stop");
}

/// Success is routine and logged at debug; both failure kinds warn.
pub(crate) fn log_poll_outcome(outcome: &Result<MarketSnapshot, FetchError>) {
    match outcome {
        Ok(snapshot) => debug!(
            component = POLLER,
            event = "poll.success",
            symbols = snapshot.len()
        ),
        Err(FetchError::Transport(err)) => warn!(
            component = POLLER,
            event = "poll.degraded.transport",
            error = %err
        ),
        Err(FetchError::Shape(err)) => warn!(
            component = POLLER,
            event = "poll.degraded.shape",
            error = %err
        ),
    }
}

// HTTP routes.

pub(crate) fn log_view_request(route: &'static str, view_state: &ViewState) {
    info!(
        component = HTTP,
        event = "http.view.request",
        route,
        filter = view_state.filter.as_str(),
        sort = view_state.sort_key.as_str(),
        page = view_state.current_page()
    );
}

pub(crate) fn log_proxy_data(symbols: usize) {
    info!(component = HTTP, event = "http.proxy.data", symbols);
}

pub(crate) fn log_proxy_backend(method: &Method, path: &str) {
    info!(
        component = HTTP,
        event = "http.proxy.backend",
        method = %method,
        path
    );
}

pub(crate) fn log_proxy_backend_error(url: &str, message: &str) {
    warn!(
        component = HTTP,
        event = "http.proxy.backend.error",
        url,
        error = message
    );
}

pub(crate) fn log_auth_stub() {
    debug!(component = HTTP, event = "http.auth.stub");
}
