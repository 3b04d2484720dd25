//! Signal dashboard crate.
//!
//! Current implemented scope:
//! - market snapshot model and signal style mapping
//! - background snapshot poller with connectivity status
//! - pure filter/sort/paginate view pipeline
//! - dashboard HTTP routes (HTML grid, JSON view, proxy path, auth placeholder)

mod auth;
mod config;
mod dashboard;
mod market;
mod observability;
mod poller;
mod view;

pub use auth::{AuthStubResponse, AUTH_STUB_MESSAGE};
pub use config::{
    ConfigError, DashboardConfig, DEFAULT_BACKEND_API_URL, DEFAULT_BIND_ADDR, DEFAULT_DATA_PATH,
};
pub use dashboard::{
    build_dashboard_view, dashboard_router, render_dashboard_html, view_href, BackendProxy,
    DashboardOptions, DashboardView, SnapshotSource,
};
pub use market::{signal_style, MarketSnapshot, Signal, SignalRecord, ALL_SIGNALS};
pub use observability::{
    init_logging, log_app_bind, log_app_start, log_app_stop, log_backend_selected,
    log_shutdown_signal_error, LogFormat, LoggingConfig, LoggingInitError, LOG_FORMAT_VAR,
    LOG_LEVEL_VAR, LOG_TARGET_VAR,
};
pub use poller::{
    decode_payload, poll_once, FetchError, MarketPoller, PollStatus, PollerHandle, PollerState,
    ReqwestSnapshotFetcher, SnapshotFetcher, SnapshotStore, DEFAULT_POLL_INTERVAL_MS,
};
pub use view::{
    build_view, filter_entries, format_change, format_fixed, format_price, format_row,
    page_slice, sort_entries, total_pages, DisplayRow, Entry, SignalFilter, SortKey, ViewPage,
    ViewQuery, ViewState, ALL_SORT_KEYS, NOT_AVAILABLE, PAGE_SIZE,
};
