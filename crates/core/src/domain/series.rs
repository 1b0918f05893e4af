use crate::domain::instrument::normalize_symbol;
use chrono::{DateTime, NaiveDate};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A point-in-time label as delivered by the series source: either an epoch-like
/// number or a free-form string (ISO date, RFC 3339 instant, or a label such as "Jan").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeKey {
    Number(f64),
    Text(String),
}

/// Hashable identity of a [`TimeKey`]. Numbers compare by bit pattern so that the
/// same value from two series always lands on the same row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum KeyId {
    Number(u64),
    Text(String),
}

impl TimeKey {
    pub(crate) fn id(&self) -> KeyId {
        match self {
            TimeKey::Number(n) => {
                // -0.0 and 0.0 are the same instant.
                let n = if *n == 0.0 { 0.0 } else { *n };
                KeyId::Number(n.to_bits())
            }
            TimeKey::Text(s) => KeyId::Text(s.trim().to_string()),
        }
    }

    /// Chronological sort value when the key is numeric or a parseable date.
    pub(crate) fn instant(&self) -> Option<f64> {
        match self {
            TimeKey::Number(n) if n.is_finite() => Some(*n),
            TimeKey::Number(_) => None,
            TimeKey::Text(s) => parse_text_instant(s.trim()),
        }
    }
}

fn parse_text_instant(s: &str) -> Option<f64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis() as f64);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(midnight.and_utc().timestamp_millis() as f64)
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeKey::Number(n) => write!(f, "{n}"),
            TimeKey::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for TimeKey {
    fn from(s: &str) -> Self {
        TimeKey::Text(s.to_string())
    }
}

impl From<i64> for TimeKey {
    fn from(n: i64) -> Self {
        TimeKey::Number(n as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub timestamp: TimeKey,
    pub value: f64,
}

impl TimePoint {
    pub fn new(timestamp: impl Into<TimeKey>, value: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            value,
        }
    }
}

/// Per-symbol series in chronological (insertion) order. Populated by an external
/// data collaborator and only read by the projector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesStore {
    series: BTreeMap<String, Vec<TimePoint>>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: &str, points: Vec<TimePoint>) {
        self.series.insert(normalize_symbol(symbol), points);
    }

    pub fn with_series(mut self, symbol: &str, points: Vec<TimePoint>) -> Self {
        self.insert(symbol, points);
        self
    }

    pub fn get(&self, symbol: &str) -> Option<&[TimePoint]> {
        self.series.get(&normalize_symbol(symbol)).map(Vec::as_slice)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Builds a store from the fixture shape `{ "NVDA": [{timestamp, value}, ...] }`,
    /// normalizing symbol keys.
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        use anyhow::Context;
        let raw: BTreeMap<String, Vec<TimePoint>> =
            serde_json::from_str(s).context("series fixture is not a symbol -> points map")?;
        let mut store = Self::new();
        for (symbol, points) in raw {
            store.insert(&symbol, points);
        }
        Ok(store)
    }
}

/// One timestamp of the aligned view. Only symbols with a point at `timestamp`
/// appear in `values`; a missing key is a gap, not zero.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    pub timestamp: TimeKey,
    pub values: Vec<(String, f64)>,
}

impl AlignedRow {
    pub fn value(&self, symbol: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, v)| *v)
    }
}

impl Serialize for AlignedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("timestamp", &self.timestamp)?;
        for (symbol, value) in &self.values {
            map.serialize_entry(symbol, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlignedSeries {
    /// Symbols that contributed a series, in selection (legend) order.
    pub series: Vec<String>,
    pub rows: Vec<AlignedRow>,
}

impl AlignedSeries {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, timestamp: &TimeKey) -> Option<&AlignedRow> {
        let id = timestamp.id();
        self.rows.iter().find(|r| r.timestamp.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn time_key_deserializes_numbers_and_strings() {
        let points: Vec<TimePoint> = serde_json::from_value(json!([
            {"timestamp": 1706313600000_i64, "value": 1.0},
            {"timestamp": "2026-01-27", "value": 2.0},
        ]))
        .unwrap();
        assert!(matches!(points[0].timestamp, TimeKey::Number(_)));
        assert_eq!(points[1].timestamp, TimeKey::Text("2026-01-27".to_string()));
    }

    #[test]
    fn dates_and_instants_have_sort_values() {
        let a = TimeKey::from("2026-01-27").instant().unwrap();
        let b = TimeKey::from("2026-01-27T09:00:00Z").instant().unwrap();
        assert!(a < b);
        assert_eq!(TimeKey::from("Jan").instant(), None);
        assert_eq!(TimeKey::Number(f64::NAN).instant(), None);
    }

    #[test]
    fn aligned_row_serializes_flat_for_charting() {
        let row = AlignedRow {
            timestamp: TimeKey::from("Jan"),
            values: vec![("NVDA".to_string(), 150.0), ("AAPL".to_string(), 180.0)],
        };
        let v = serde_json::to_value(&row).unwrap();
        assert_eq!(v, json!({"timestamp": "Jan", "NVDA": 150.0, "AAPL": 180.0}));
    }

    #[test]
    fn store_fixture_normalizes_symbols() {
        let store = SeriesStore::from_json_str(
            r#"{"nvda": [{"timestamp": "Jan", "value": 150}]}"#,
        )
        .unwrap();
        assert_eq!(store.get("NVDA").map(<[TimePoint]>::len), Some(1));
        assert!(SeriesStore::from_json_str("[1, 2]").is_err());
    }
}
