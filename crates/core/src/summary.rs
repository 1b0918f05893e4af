//! Per-ticker price metrics for the portfolio header: latest value, day-over-day
//! change and return over a fixed lookback.
//!
//! Every metric that would divide by zero or reach past the start of a series is
//! `None` rather than a sentinel number.

use crate::domain::series::{SeriesStore, TimePoint};
use serde::Serialize;

/// Periods between the latest point and the principle reference point.
pub const ROI_LOOKBACK: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerSummary {
    pub symbol: String,
    /// Latest value.
    pub value: f64,
    /// Latest vs previous point, in percent.
    pub percentage_change: Option<f64>,
    /// True when the latest point moved up.
    pub sign: bool,
    /// Latest vs the point `lookback` periods earlier, in percent.
    pub roi: Option<f64>,
    /// Relative move of `roi` since the previous point, in percent.
    pub roi_pct: Option<f64>,
    /// Value `lookback` periods before the latest point.
    pub principle: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverallSummary {
    pub roi: Option<f64>,
    pub principle: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub tickers: Vec<TickerSummary>,
    /// Means over the tickers that have the metric.
    pub overall: OverallSummary,
    /// Symbols without a usable series, in input order.
    pub missing: Vec<String>,
}

pub fn summarize(symbols: &[String], store: &SeriesStore) -> PortfolioSummary {
    summarize_with_lookback(symbols, store, ROI_LOOKBACK)
}

pub fn summarize_with_lookback(
    symbols: &[String],
    store: &SeriesStore,
    lookback: usize,
) -> PortfolioSummary {
    let lookback = lookback.max(1);
    let mut out = PortfolioSummary::default();
    for symbol in symbols {
        match store.get(symbol).and_then(|points| ticker(symbol, points, lookback)) {
            Some(t) => out.tickers.push(t),
            None => out.missing.push(symbol.clone()),
        }
    }

    out.overall = OverallSummary {
        roi: mean(out.tickers.iter().filter_map(|t| t.roi)),
        principle: mean(out.tickers.iter().filter_map(|t| t.principle)),
    };
    if !out.missing.is_empty() {
        tracing::debug!(missing = ?out.missing, "portfolio symbols without series data");
    }
    out
}

fn ticker(symbol: &str, points: &[TimePoint], lookback: usize) -> Option<TickerSummary> {
    let len = points.len();
    let last = points.last()?.value;
    if !last.is_finite() {
        return None;
    }
    let prev = len.checked_sub(2).map(|i| points[i].value);
    let base = len.checked_sub(lookback + 1).map(|i| points[i].value);

    let percentage_change = prev.and_then(|p| pct_change(last, p));
    let roi = base.and_then(|b| pct_change(last, b));
    let roi_prev = prev.zip(base).and_then(|(p, b)| pct_change(p, b));
    let roi_pct = roi.zip(roi_prev).and_then(|(r, rp)| pct_change(r, rp));

    Some(TickerSummary {
        symbol: symbol.to_string(),
        value: last,
        percentage_change,
        sign: percentage_change.is_some_and(|c| c > 0.0),
        roi,
        roi_pct,
        principle: base.filter(|b| b.is_finite()),
    })
}

/// `(now / then - 1) * 100`, or `None` when `then` is zero or either side is not finite.
fn pct_change(now: f64, then: f64) -> Option<f64> {
    if then == 0.0 || !then.is_finite() || !now.is_finite() {
        return None;
    }
    Some((now - then) / then * 100.0)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::TimeKey;

    fn series(values: &[f64]) -> Vec<TimePoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| TimePoint::new(TimeKey::from(i as i64), *v))
            .collect()
    }

    fn symbols(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn computes_change_roi_and_principle() {
        let store = SeriesStore::new().with_series("A", series(&[50.0, 80.0, 100.0]));
        let out = summarize_with_lookback(&symbols(&["A"]), &store, 2);

        let a = &out.tickers[0];
        assert_eq!(a.value, 100.0);
        assert_eq!(a.percentage_change, Some(25.0));
        assert!(a.sign);
        assert_eq!(a.principle, Some(50.0));
        assert_eq!(a.roi, Some(100.0));
        // roi_prev = 60%, so roi moved (100 - 60) / 60.
        let roi_pct = a.roi_pct.unwrap();
        assert!((roi_pct - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(out.overall.roi, Some(100.0));
    }

    #[test]
    fn single_point_has_value_but_no_change() {
        let store = SeriesStore::new().with_series("A", series(&[42.0]));
        let out = summarize(&symbols(&["A"]), &store);
        let a = &out.tickers[0];
        assert_eq!(a.value, 42.0);
        assert_eq!(a.percentage_change, None);
        assert!(!a.sign);
        assert_eq!(a.roi, None);
        assert_eq!(a.principle, None);
        assert_eq!(out.overall, OverallSummary::default());
    }

    #[test]
    fn zero_previous_value_does_not_divide() {
        let store = SeriesStore::new()
            .with_series("Z", series(&[0.0, 0.0, 5.0]))
            .with_series("D", series(&[10.0, 8.0]));
        let out = summarize_with_lookback(&symbols(&["Z", "D"]), &store, 2);

        let z = &out.tickers[0];
        assert_eq!(z.percentage_change, None);
        assert_eq!(z.roi, None);
        assert_eq!(z.roi_pct, None);
        assert_eq!(z.principle, Some(0.0));

        let d = &out.tickers[1];
        assert_eq!(d.percentage_change, Some(-20.0));
        assert!(!d.sign);
    }

    #[test]
    fn lookback_longer_than_series_leaves_roi_empty() {
        let store = SeriesStore::new()
            .with_series("SHORT", series(&[1.0; 30]))
            .with_series("LONG", series(&[2.0; 31]));
        let out = summarize(&symbols(&["SHORT", "LONG"]), &store);

        assert_eq!(out.tickers[0].roi, None);
        assert_eq!(out.tickers[0].percentage_change, Some(0.0));
        assert_eq!(out.tickers[1].roi, Some(0.0));
        assert_eq!(out.tickers[1].principle, Some(2.0));
        assert_eq!(out.overall.principle, Some(2.0));
    }

    #[test]
    fn unknown_and_empty_series_are_missing() {
        let store = SeriesStore::new()
            .with_series("A", series(&[1.0, 2.0]))
            .with_series("E", Vec::new());
        let out = summarize(&symbols(&["GHOST", "A", "E"]), &store);
        assert_eq!(out.tickers.len(), 1);
        assert_eq!(out.missing, vec!["GHOST", "E"]);
    }
}
