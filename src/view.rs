//! View pipeline: filter, sort and paginate a market snapshot for display.
//!
//! Everything here is a pure function of `(MarketSnapshot, ViewState)`, so it is
//! safe to recompute on every request.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::market::{signal_style, MarketSnapshot, Signal, SignalRecord};

pub const PAGE_SIZE: usize = 12;
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignalFilter {
    #[default]
    All,
    Only(Signal),
}

impl SignalFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Only(signal) => signal.as_str(),
        }
    }

    /// Parses a query value; anything outside `ALL` and the five canonical
    /// signals is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed == "ALL" {
            return Some(Self::All);
        }
        Signal::parse_canonical(trimmed).map(Self::Only)
    }

    pub fn matches(self, record: &SignalRecord) -> bool {
        match self {
            Self::All => true,
            Self::Only(signal) => record.signal == signal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    #[default]
    Symbol,
    Signal,
    Score,
    Change,
}

pub const ALL_SORT_KEYS: [SortKey; 4] = [
    SortKey::Symbol,
    SortKey::Signal,
    SortKey::Score,
    SortKey::Change,
];

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Symbol => "symbol",
            Self::Signal => "signal",
            Self::Score => "score",
            Self::Change => "change",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Symbol => "Symbol",
            Self::Signal => "Signal",
            Self::Score => "Score",
            Self::Change => "24h Change",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "symbol" => Some(Self::Symbol),
            "signal" => Some(Self::Signal),
            "score" => Some(Self::Score),
            "change" => Some(Self::Change),
            _ => None,
        }
    }
}

/// Raw query parameters accepted by the dashboard routes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ViewQuery {
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewState {
    pub filter: SignalFilter,
    pub sort_key: SortKey,
    current_page: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            filter: SignalFilter::All,
            sort_key: SortKey::Symbol,
            current_page: 1,
        }
    }
}

impl ViewState {
    pub fn new(filter: SignalFilter, sort_key: SortKey, current_page: usize) -> Self {
        Self {
            filter,
            sort_key,
            current_page: current_page.max(1),
        }
    }

    /// Unknown or malformed values fall back to the defaults. The page is not
    /// checked against the current snapshot: a page past the end renders empty.
    pub fn from_query(query: &ViewQuery) -> Self {
        let filter = query
            .filter
            .as_deref()
            .and_then(SignalFilter::parse)
            .unwrap_or_default();
        let sort_key = query
            .sort
            .as_deref()
            .and_then(SortKey::parse)
            .unwrap_or_default();
        let page = query
            .page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(1);

        Self::new(filter, sort_key, page)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn with_filter(self, filter: SignalFilter) -> Self {
        Self { filter, ..self }
    }

    pub fn with_sort_key(self, sort_key: SortKey) -> Self {
        Self { sort_key, ..self }
    }

    pub fn with_page(self, page: usize) -> Self {
        Self {
            current_page: page.max(1),
            ..self
        }
    }

    /// Steps back one page, landing on the last page when the current one is
    /// already past the end.
    pub fn previous_page(self, total_pages: usize) -> Self {
        self.with_page(self.current_page.saturating_sub(1).min(total_pages))
    }

    pub fn next_page(self, total_pages: usize) -> Self {
        self.with_page(total_pages.min(self.current_page.saturating_add(1)))
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self, total_pages: usize) -> bool {
        self.current_page < total_pages
    }
}

pub type Entry<'a> = (&'a str, &'a SignalRecord);

#[derive(Debug, Clone, PartialEq)]
pub struct ViewPage<'a> {
    pub rows: Vec<Entry<'a>>,
    pub current_page: usize,
    pub total_pages: usize,
    pub filtered_count: usize,
}

pub fn filter_entries(snapshot: &MarketSnapshot, filter: SignalFilter) -> Vec<Entry<'_>> {
    snapshot
        .iter()
        .filter(|(_, record)| filter.matches(record))
        .collect()
}

pub fn sort_entries(entries: &mut [Entry<'_>], key: SortKey) {
    match key {
        SortKey::Symbol => entries.sort_by(|(a, _), (b, _)| compare_text(a, b)),
        SortKey::Signal => {
            entries.sort_by(|(_, a), (_, b)| compare_text(a.signal.as_str(), b.signal.as_str()))
        }
        SortKey::Score => entries.sort_by(|(_, a), (_, b)| {
            a.score.unwrap_or(0.0).total_cmp(&b.score.unwrap_or(0.0))
        }),
        SortKey::Change => entries.sort_by(|(_, a), (_, b)| {
            b.change_24h
                .unwrap_or(0.0)
                .total_cmp(&a.change_24h.unwrap_or(0.0))
        }),
    }
}

pub fn total_pages(filtered_count: usize) -> usize {
    filtered_count.div_ceil(PAGE_SIZE)
}

/// Slice for a 1-based page. Out-of-range pages give an empty slice.
pub fn page_slice<'s, T>(entries: &'s [T], page: usize) -> &'s [T] {
    let start = page.saturating_sub(1).saturating_mul(PAGE_SIZE);
    if start >= entries.len() {
        return &[];
    }
    let end = start.saturating_add(PAGE_SIZE).min(entries.len());
    &entries[start..end]
}

pub fn build_view<'a>(snapshot: &'a MarketSnapshot, state: &ViewState) -> ViewPage<'a> {
    let mut entries = filter_entries(snapshot, state.filter);
    sort_entries(&mut entries, state.sort_key);

    let filtered_count = entries.len();
    let rows = page_slice(&entries, state.current_page).to_vec();

    ViewPage {
        rows,
        current_page: state.current_page,
        total_pages: total_pages(filtered_count),
        filtered_count,
    }
}

/// Approximates a locale-aware collation: case-insensitive first, exact
/// byte order as tie-break so the result is a total order.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub symbol: String,
    pub signal: String,
    pub style: String,
    pub score: String,
    pub price: String,
    pub change_24h: String,
    pub rsi: String,
}

pub fn format_row(symbol: &str, record: &SignalRecord) -> DisplayRow {
    DisplayRow {
        symbol: symbol.to_string(),
        signal: record.signal.as_str().to_string(),
        style: signal_style(record.signal).to_string(),
        score: format_fixed(record.score, 3),
        price: format_price(record.price),
        change_24h: format_change(record.change_24h),
        rsi: format_fixed(record.rsi, 1),
    }
}

pub fn format_fixed(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.decimals$}"),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_price(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("${v:.4}"),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_change(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.2}%"),
        _ => NOT_AVAILABLE.to_string(),
    }
}
