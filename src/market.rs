//! Market snapshot data model: per-symbol signal records as published by the backend.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signal {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
    #[default]
    Unknown,
}

pub const ALL_SIGNALS: [Signal; 5] = [
    Signal::StrongBuy,
    Signal::Buy,
    Signal::Neutral,
    Signal::Sell,
    Signal::StrongSell,
];

impl Signal {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrongBuy => "STRONG_BUY",
            Self::Buy => "BUY",
            Self::Neutral => "NEUTRAL",
            Self::Sell => "SELL",
            Self::StrongSell => "STRONG_SELL",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Human label used by the filter control.
    pub fn label(self) -> &'static str {
        match self {
            Self::StrongBuy => "Strong Buy",
            Self::Buy => "Buy",
            Self::Neutral => "Neutral",
            Self::Sell => "Sell",
            Self::StrongSell => "Strong Sell",
            Self::Unknown => "Unknown",
        }
    }

    /// Strict parse of one of the five canonical wire values.
    pub fn parse_canonical(raw: &str) -> Option<Self> {
        match raw {
            "STRONG_BUY" => Some(Self::StrongBuy),
            "BUY" => Some(Self::Buy),
            "NEUTRAL" => Some(Self::Neutral),
            "SELL" => Some(Self::Sell),
            "STRONG_SELL" => Some(Self::StrongSell),
            _ => None,
        }
    }

    /// Lenient parse: anything outside the canonical set is `Unknown`.
    pub fn from_wire(raw: &str) -> Self {
        Self::parse_canonical(raw).unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Signal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Signal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::from_wire).unwrap_or_default())
    }
}

/// Presentation style token for a signal badge.
///
/// Total over `Signal`: the five canonical values get their own token and
/// `Unknown` falls back to a neutral grey one.
pub fn signal_style(signal: Signal) -> &'static str {
    match signal {
        Signal::StrongBuy => "signal-strong-buy",
        Signal::Buy => "signal-buy",
        Signal::Neutral => "signal-neutral",
        Signal::Sell => "signal-sell",
        Signal::StrongSell => "signal-strong-sell",
        Signal::Unknown => "signal-default",
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalRecord {
    #[serde(default)]
    pub signal: Signal,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub change_24h: Option<f64>,
    #[serde(default)]
    pub rsi: Option<f64>,
}

impl SignalRecord {
    pub fn new(signal: Signal) -> Self {
        Self {
            signal,
            ..Self::default()
        }
    }
}

/// Complete set of per-symbol records from one successful poll.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketSnapshot {
    entries: BTreeMap<String, SignalRecord>,
}

impl MarketSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, record: SignalRecord) {
        self.entries.insert(symbol.into(), record);
    }

    pub fn get(&self, symbol: &str) -> Option<&SignalRecord> {
        self.entries.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SignalRecord)> {
        self.entries
            .iter()
            .map(|(symbol, record)| (symbol.as_str(), record))
    }
}

impl<S: Into<String>> FromIterator<(S, SignalRecord)> for MarketSnapshot {
    fn from_iter<I: IntoIterator<Item = (S, SignalRecord)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(symbol, record)| (symbol.into(), record))
                .collect(),
        }
    }
}
