//! Aligns the series of every selected symbol onto one timestamp axis for charting.
//!
//! Sources do not share a timestamp grid, so rows are built from the union of all
//! timestamps rather than by zipping series index-by-index. A symbol without a
//! point at some timestamp is simply absent from that row. The output is rebuilt on
//! every call; nothing is cached across selection changes.

use crate::domain::series::{AlignedRow, AlignedSeries, KeyId, SeriesStore, TimeKey, TimePoint};
use crate::selection::SelectionSet;
use std::collections::{HashMap, HashSet};

const REBASE_TO: f64 = 100.0;

/// Symbols that were selected but produced no series, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionReport {
    pub missing: Vec<String>,
}

pub fn project(selection: &SelectionSet, store: &SeriesStore) -> AlignedSeries {
    project_with_report(selection, store).0
}

pub fn project_with_report(
    selection: &SelectionSet,
    store: &SeriesStore,
) -> (AlignedSeries, ProjectionReport) {
    let mut report = ProjectionReport::default();
    let mut series: Vec<(&str, Vec<TimePoint>)> = Vec::new();
    for symbol in selection.as_slice() {
        match store.get(symbol) {
            Some(points) if !points.is_empty() => series.push((symbol.as_str(), points.to_vec())),
            _ => report.missing.push(symbol.clone()),
        }
    }
    log_missing(&report);
    (align(series), report)
}

/// Same alignment, with each series rebased so its first point equals 100. Series
/// whose first value is zero or not finite cannot be rebased and are reported missing.
pub fn project_normalized(
    selection: &SelectionSet,
    store: &SeriesStore,
) -> (AlignedSeries, ProjectionReport) {
    let mut report = ProjectionReport::default();
    let mut series: Vec<(&str, Vec<TimePoint>)> = Vec::new();
    for symbol in selection.as_slice() {
        let Some(points) = store.get(symbol).filter(|p| !p.is_empty()) else {
            report.missing.push(symbol.clone());
            continue;
        };
        let base = points[0].value;
        if base == 0.0 || !base.is_finite() {
            tracing::warn!(%symbol, base, "cannot rebase series with a zero or non-finite first value");
            report.missing.push(symbol.clone());
            continue;
        }
        let rebased = points
            .iter()
            .map(|p| TimePoint {
                timestamp: p.timestamp.clone(),
                value: p.value / base * REBASE_TO,
            })
            .collect();
        series.push((symbol.as_str(), rebased));
    }
    log_missing(&report);
    (align(series), report)
}

fn log_missing(report: &ProjectionReport) {
    if !report.missing.is_empty() {
        tracing::debug!(missing = ?report.missing, "selected symbols without series data");
    }
}

fn align(series: Vec<(&str, Vec<TimePoint>)>) -> AlignedSeries {
    let axis = union_axis(&series);

    // First point wins when a series repeats a timestamp.
    let lookups: Vec<HashMap<KeyId, f64>> = series
        .iter()
        .map(|(_, points)| {
            let mut m = HashMap::with_capacity(points.len());
            for p in points {
                m.entry(p.timestamp.id()).or_insert(p.value);
            }
            m
        })
        .collect();

    let rows = axis
        .into_iter()
        .map(|(id, timestamp)| AlignedRow {
            timestamp,
            values: series
                .iter()
                .zip(&lookups)
                .filter_map(|((symbol, _), lookup)| {
                    lookup.get(&id).map(|v| (symbol.to_string(), *v))
                })
                .collect(),
        })
        .collect();

    AlignedSeries {
        series: series.iter().map(|(s, _)| s.to_string()).collect(),
        rows,
    }
}

/// Ordered union of timestamps. Numeric and date-like keys sort chronologically;
/// as soon as one key is a free label the order is merged from the series' own
/// orders instead.
fn union_axis(series: &[(&str, Vec<TimePoint>)]) -> Vec<(KeyId, TimeKey)> {
    let mut seen: HashSet<KeyId> = HashSet::new();
    let mut first_seen: Vec<(KeyId, TimeKey)> = Vec::new();
    for (_, points) in series {
        for p in points {
            let id = p.timestamp.id();
            if seen.insert(id.clone()) {
                first_seen.push((id, p.timestamp.clone()));
            }
        }
    }

    let instants: Option<Vec<f64>> = first_seen.iter().map(|(_, t)| t.instant()).collect();
    if let Some(instants) = instants {
        let mut order: Vec<usize> = (0..first_seen.len()).collect();
        // Stable: equal instants keep first-seen order.
        order.sort_by(|a, b| instants[*a].total_cmp(&instants[*b]));
        let mut slots: Vec<Option<(KeyId, TimeKey)>> = first_seen.into_iter().map(Some).collect();
        return order.into_iter().filter_map(|i| slots[i].take()).collect();
    }

    merge_orders(series, &first_seen)
}

fn merge_orders(
    series: &[(&str, Vec<TimePoint>)],
    first_seen: &[(KeyId, TimeKey)],
) -> Vec<(KeyId, TimeKey)> {
    let mut order = LinkedOrder::with_capacity(first_seen.len());

    for (_, points) in series {
        let ids: Vec<KeyId> = points.iter().map(|p| p.timestamp.id()).collect();
        let mut last: Option<usize> = None;
        for (i, id) in ids.iter().enumerate() {
            if let Some(slot) = order.slot(id) {
                last = Some(slot);
                continue;
            }
            let slot = match last {
                Some(prev) => order.insert_after(prev, id.clone()),
                // Nothing from this series is placed yet: go before its next known key.
                None => match ids[i + 1..].iter().find_map(|next| order.slot(next)) {
                    Some(next) => order.insert_before(next, id.clone()),
                    None => order.push_back(id.clone()),
                },
            };
            last = Some(slot);
        }
    }

    let labels: HashMap<&KeyId, &TimeKey> = first_seen.iter().map(|(id, t)| (id, t)).collect();
    order
        .into_ids()
        .into_iter()
        .filter_map(|id| {
            let label = labels.get(&id).map(|t| (*t).clone())?;
            Some((id, label))
        })
        .collect()
}

/// Doubly linked key order with a slot index, so lookups and inserts next to a
/// placed key are O(1).
struct LinkedOrder {
    nodes: Vec<Node>,
    index: HashMap<KeyId, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

struct Node {
    id: KeyId,
    prev: Option<usize>,
    next: Option<usize>,
}

impl LinkedOrder {
    fn with_capacity(n: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(n),
            index: HashMap::with_capacity(n),
            head: None,
            tail: None,
        }
    }

    fn slot(&self, id: &KeyId) -> Option<usize> {
        self.index.get(id).copied()
    }

    fn alloc(&mut self, id: KeyId, prev: Option<usize>, next: Option<usize>) -> usize {
        let slot = self.nodes.len();
        self.index.insert(id.clone(), slot);
        self.nodes.push(Node { id, prev, next });
        match prev {
            Some(p) => self.nodes[p].next = Some(slot),
            None => self.head = Some(slot),
        }
        match next {
            Some(n) => self.nodes[n].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        slot
    }

    fn insert_after(&mut self, prev: usize, id: KeyId) -> usize {
        let next = self.nodes[prev].next;
        self.alloc(id, Some(prev), next)
    }

    fn insert_before(&mut self, next: usize, id: KeyId) -> usize {
        let prev = self.nodes[next].prev;
        self.alloc(id, prev, Some(next))
    }

    fn push_back(&mut self, id: KeyId) -> usize {
        let prev = self.tail;
        self.alloc(id, prev, None)
    }

    fn into_ids(self) -> Vec<KeyId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut slots: Vec<Option<Node>> = self.nodes.into_iter().map(Some).collect();
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let Some(node) = slots[slot].take() else {
                break;
            };
            cursor = node.next;
            out.push(node.id);
        }
        out
    }
}
