//! Dashboard HTTP routes: server-rendered signal grid, JSON view model, the
//! snapshot proxy path, the auth placeholder and the backend pass-through.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::auth_stub;
use crate::market::{MarketSnapshot, ALL_SIGNALS};
use crate::observability::{
    log_proxy_backend, log_proxy_backend_error, log_proxy_data, log_view_request,
};
use crate::poller::{PollStatus, PollerState, SnapshotStore, DEFAULT_POLL_INTERVAL_MS};
use crate::view::{
    build_view, format_row, DisplayRow, SignalFilter, ViewPage, ViewQuery, ViewState,
    ALL_SORT_KEYS,
};

/// Read side of the poller as seen by the HTTP layer.
pub trait SnapshotSource: Send + Sync + 'static {
    fn state(&self) -> PollerState;
}

impl SnapshotSource for SnapshotStore {
    fn state(&self) -> PollerState {
        SnapshotStore::state(self)
    }
}

/// Forwards `/api/backend/{path}` to `{base_url}/api/{path}`.
#[derive(Debug, Clone)]
pub struct BackendProxy {
    client: reqwest::Client,
    base_url: String,
}

impl BackendProxy {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn target_url(&self, path: &str, query: Option<&str>) -> String {
        let mut url = format!("{}/api/{}", self.base_url, path.trim_start_matches('/'));
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    /// How often the rendered page reloads itself.
    pub refresh_interval_ms: u64,
    pub backend_proxy: Option<BackendProxy>,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            refresh_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            backend_proxy: None,
        }
    }
}

#[derive(Clone)]
struct DashboardAppState {
    source: Arc<dyn SnapshotSource>,
    refresh_interval_ms: u64,
}

pub fn dashboard_router(source: Arc<dyn SnapshotSource>, options: DashboardOptions) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let api = Router::new()
        .route("/api/proxy/data", get(get_proxy_data))
        .route("/api/auth", get(auth_stub).post(auth_stub))
        .route("/api/auth/check", get(auth_stub).post(auth_stub))
        .layer(cors.clone());

    let router = Router::new()
        .route("/", get(redirect_to_dashboard))
        .route("/dashboard", get(get_dashboard_html))
        .route("/dashboard/view", get(get_dashboard_view))
        .route("/health", get(health))
        .merge(api)
        .with_state(DashboardAppState {
            source,
            refresh_interval_ms: options.refresh_interval_ms,
        });

    // The pass-through only exists when a backend is configured.
    match options.backend_proxy {
        Some(proxy) => router.merge(
            Router::new()
                .route("/api/backend/{*path}", any(proxy_backend))
                .layer(cors)
                .with_state(proxy),
        ),
        None => router,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub status: PollStatus,
    pub status_label: String,
    pub last_update: Option<String>,
    pub filter: String,
    pub sort: String,
    pub page: usize,
    pub total_pages: usize,
    pub filtered_count: usize,
    pub shown_count: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub rows: Vec<DisplayRow>,
}

pub fn build_dashboard_view(state: &PollerState, view_state: &ViewState) -> DashboardView {
    let page = build_view(&state.snapshot, view_state);
    dashboard_view_from_page(state, view_state, &page)
}

fn dashboard_view_from_page(
    state: &PollerState,
    view_state: &ViewState,
    page: &ViewPage<'_>,
) -> DashboardView {
    DashboardView {
        status: state.status,
        status_label: state.status.label().to_string(),
        last_update: state.last_update.map(|ts| ts.to_rfc3339()),
        filter: view_state.filter.as_str().to_string(),
        sort: view_state.sort_key.as_str().to_string(),
        page: page.current_page,
        total_pages: page.total_pages,
        filtered_count: page.filtered_count,
        shown_count: page.rows.len(),
        has_previous: view_state.has_previous(),
        has_next: view_state.has_next(page.total_pages),
        rows: page
            .rows
            .iter()
            .map(|(symbol, record)| format_row(symbol, record))
            .collect(),
    }
}

pub fn view_href(view_state: &ViewState) -> String {
    format!(
        "/dashboard?filter={}&sort={}&page={}",
        view_state.filter.as_str(),
        view_state.sort_key.as_str(),
        view_state.current_page()
    )
}

pub fn render_dashboard_html(
    state: &PollerState,
    view_state: &ViewState,
    refresh_interval_ms: u64,
) -> String {
    let view = build_dashboard_view(state, view_state);
    let last_update = state
        .last_update
        .map(|ts| ts.format("%H:%M:%S UTC").to_string())
        .unwrap_or_default();

    let mut out = String::new();
    out.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str("<title>Signal Dashboard</title>\n");
    out.push_str("<style>:root{--bg:#0b1220;--card:#111a2e;--line:#1f2a44;--ink:#f3f6fb;--muted:#9aa4b5}*{box-sizing:border-box}body{margin:0;background:var(--bg);color:var(--ink);font-family:\"Inter\",\"Segoe UI\",sans-serif;padding:16px}.hero{text-align:center;margin-bottom:28px}.hero h1{font-size:2.2rem;margin:0 0 6px}.muted{color:var(--muted)}.panel{background:var(--card);border:1px solid var(--line);border-radius:10px;padding:16px;margin-bottom:20px}.status-bar{display:flex;justify-content:space-between;align-items:center}.controls{display:grid;grid-template-columns:repeat(4,1fr);gap:16px;align-items:end}.controls label{display:block;font-size:.85rem;margin-bottom:6px}.controls select{width:100%;background:var(--bg);color:var(--ink);border:1px solid var(--line);border-radius:6px;padding:8px 10px}.summary{grid-column:span 2;font-size:.85rem}.grid{display:grid;grid-template-columns:repeat(4,1fr);gap:16px;margin-bottom:20px}.card{background:var(--card);border:1px solid var(--line);border-radius:10px;padding:16px}.card .symbol{font-weight:700;font-size:1.1rem;margin-bottom:8px}.badge{display:inline-block;padding:4px 12px;border-radius:6px;font-size:.8rem;font-weight:600;margin-bottom:8px}.metrics div{font-size:.85rem;margin-top:4px}.signal-strong-buy{background:#22c55e;color:#000}.signal-buy{background:#86efac;color:#000}.signal-neutral{background:#facc15;color:#000}.signal-sell{background:#fb923c;color:#000}.signal-strong-sell{background:#ef4444;color:#fff}.signal-default{background:#9ca3af;color:#000}.pager{display:flex;justify-content:center;align-items:center;gap:8px}.pager-btn{padding:8px 16px;background:var(--card);color:var(--ink);border:1px solid var(--line);border-radius:6px;text-decoration:none}.pager-btn[disabled]{opacity:.5}footer{text-align:center;margin-top:32px;font-size:.85rem}@media (max-width:1100px){.grid{grid-template-columns:repeat(2,1fr)}}@media (max-width:700px){.grid,.controls{grid-template-columns:1fr}.summary{grid-column:auto}}</style>\n");
    out.push_str("</head><body>\n");
    out.push_str("<section class=\"hero\"><h1>Trading Signal Dashboard</h1>");
    out.push_str("<p class=\"muted\">Cryptocurrency Mean Reversion Signals</p></section>\n");

    out.push_str("<section class=\"panel status-bar\">");
    out.push_str(&format!(
        "<span id=\"status\" data-status=\"{}\">{}</span>",
        status_code(view.status),
        escape_html(&view.status_label)
    ));
    out.push_str(&format!(
        "<span class=\"muted\">Last Update: {}</span>",
        escape_html(&last_update)
    ));
    out.push_str("</section>\n");

    render_controls(&mut out, view_state, &view);
    render_cards(&mut out, &view.rows);
    render_pager(&mut out, view_state, &view);

    out.push_str("<footer class=\"muted\">Not Financial Advice</footer>\n");
    out.push_str(&format!(
        "<script>const form=document.getElementById('view-form');form.querySelectorAll('select').forEach(s=>s.addEventListener('change',()=>form.submit()));setInterval(()=>window.location.reload(),{refresh_interval_ms});</script>\n"
    ));
    out.push_str("</body></html>\n");
    out
}

fn render_controls(out: &mut String, view_state: &ViewState, view: &DashboardView) {
    out.push_str("<section class=\"panel\"><form id=\"view-form\" class=\"controls\" method=\"get\" action=\"/dashboard\">\n");

    out.push_str("<div><label for=\"filter\">Filter by Signal</label><select id=\"filter\" name=\"filter\">");
    push_option(
        out,
        SignalFilter::All.as_str(),
        "All Signals",
        view_state.filter == SignalFilter::All,
    );
    for signal in ALL_SIGNALS {
        push_option(
            out,
            signal.as_str(),
            signal.label(),
            view_state.filter == SignalFilter::Only(signal),
        );
    }
    out.push_str("</select></div>\n");

    out.push_str("<div><label for=\"sort\">Sort by</label><select id=\"sort\" name=\"sort\">");
    for key in ALL_SORT_KEYS {
        push_option(out, key.as_str(), key.label(), view_state.sort_key == key);
    }
    out.push_str("</select></div>\n");

    // Changing filter or sort keeps the current page.
    out.push_str(&format!(
        "<input type=\"hidden\" name=\"page\" value=\"{}\">",
        view.page
    ));
    out.push_str(&format!(
        "<div class=\"summary muted\">Showing {} of {} pairs (Page {} of {})</div>\n",
        view.shown_count, view.filtered_count, view.page, view.total_pages
    ));
    out.push_str("</form></section>\n");
}

fn render_cards(out: &mut String, rows: &[DisplayRow]) {
    out.push_str("<section class=\"grid\" id=\"signal-grid\">\n");
    for row in rows {
        out.push_str(&format!(
            "<div class=\"card\" data-symbol=\"{}\">",
            escape_html(&row.symbol)
        ));
        out.push_str(&format!(
            "<div class=\"symbol\">{}</div>",
            escape_html(&row.symbol)
        ));
        out.push_str(&format!(
            "<div class=\"badge {}\">{}</div>",
            row.style,
            escape_html(&row.signal)
        ));
        out.push_str("<div class=\"metrics\">");
        out.push_str(&format!("<div>Score: {}</div>", escape_html(&row.score)));
        out.push_str(&format!("<div>Price: {}</div>", escape_html(&row.price)));
        out.push_str(&format!("<div>24h: {}</div>", escape_html(&row.change_24h)));
        out.push_str(&format!("<div>RSI: {}</div>", escape_html(&row.rsi)));
        out.push_str("</div></div>\n");
    }
    out.push_str("</section>\n");
}

fn render_pager(out: &mut String, view_state: &ViewState, view: &DashboardView) {
    if view.total_pages <= 1 {
        return;
    }

    out.push_str("<nav class=\"pager\">");
    if view.has_previous {
        out.push_str(&format!(
            "<a id=\"pager-prev\" class=\"pager-btn\" href=\"{}\">&larr; Previous</a>",
            escape_html(&view_href(&view_state.previous_page(view.total_pages)))
        ));
    } else {
        out.push_str("<button id=\"pager-prev\" class=\"pager-btn\" disabled>&larr; Previous</button>");
    }

    out.push_str(&format!(
        "<span>Page {} of {}</span>",
        view.page, view.total_pages
    ));

    if view.has_next {
        out.push_str(&format!(
            "<a id=\"pager-next\" class=\"pager-btn\" href=\"{}\">Next &rarr;</a>",
            escape_html(&view_href(&view_state.next_page(view.total_pages)))
        ));
    } else {
        out.push_str("<button id=\"pager-next\" class=\"pager-btn\" disabled>Next &rarr;</button>");
    }
    out.push_str("</nav>\n");
}

fn push_option(out: &mut String, value: &str, label: &str, selected: bool) {
    out.push_str(&format!(
        "<option value=\"{}\"{}>{}</option>",
        escape_html(value),
        if selected { " selected" } else { "" },
        escape_html(label)
    ));
}

fn status_code(status: PollStatus) -> &'static str {
    match status {
        PollStatus::Loading => "loading",
        PollStatus::Connected => "connected",
        PollStatus::DataError => "data_error",
        PollStatus::ConnectionError => "connection_error",
    }
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[derive(Serialize)]
struct ProxyDataBody<'a> {
    data: &'a MarketSnapshot,
}

async fn get_dashboard_html(
    State(state): State<DashboardAppState>,
    Query(query): Query<ViewQuery>,
) -> impl IntoResponse {
    let view_state = ViewState::from_query(&query);
    log_view_request("/dashboard", &view_state);
    let snapshot = state.source.state();
    Html(render_dashboard_html(
        &snapshot,
        &view_state,
        state.refresh_interval_ms,
    ))
}

async fn get_dashboard_view(
    State(state): State<DashboardAppState>,
    Query(query): Query<ViewQuery>,
) -> impl IntoResponse {
    let view_state = ViewState::from_query(&query);
    log_view_request("/dashboard/view", &view_state);
    let snapshot = state.source.state();
    Json(build_dashboard_view(&snapshot, &view_state))
}

async fn get_proxy_data(State(state): State<DashboardAppState>) -> impl IntoResponse {
    let snapshot = state.source.state().snapshot;
    log_proxy_data(snapshot.len());
    Json(ProxyDataBody { data: &snapshot }).into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn redirect_to_dashboard() -> Redirect {
    Redirect::to("/dashboard")
}

async fn proxy_backend(
    State(proxy): State<BackendProxy>,
    Path(path): Path<String>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let url = proxy.target_url(&path, query.as_deref());
    log_proxy_backend(&method, &path);

    let mut request = proxy.client.request(method, &url).body(body);
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        request = request.header(header::CONTENT_TYPE, content_type.clone());
    }

    let upstream = match request.send().await {
        Ok(response) => response,
        Err(err) => return bad_gateway(&url, &err.to_string()),
    };

    let status = upstream.status();
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => return bad_gateway(&url, &err.to_string()),
    };

    let mut response = (status, bytes).into_response();
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }
    response
}

fn bad_gateway(url: &str, message: &str) -> Response {
    log_proxy_backend_error(url, message);
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "error": "backend unavailable" })),
    )
        .into_response()
}
