//! One dashboard: the selection being compared, the portfolio strategies are
//! requested for, and the resolver holding the live strategy set.

use crate::advisory::{AdvisoryProvider, StrategyRequest};
use crate::domain::instrument::{normalize_symbol, Instrument};
use crate::domain::series::{AlignedSeries, SeriesStore};
use crate::error::Result;
use crate::projection::{self, ProjectionReport};
use crate::registry::InstrumentRegistry;
use crate::resolver::{CurrentStrategy, RecommendationResolver, ResolverStatus};
use crate::selection::SelectionSet;
use crate::summary::{self, PortfolioSummary};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Chart payload: the aligned rows plus the symbols that had nothing to plot.
#[derive(Debug, Clone, Serialize)]
pub struct ChartView {
    #[serde(flatten)]
    pub aligned: AlignedSeries,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategiesView {
    pub status: ResolverStatus,
    pub current: Option<CurrentStrategy>,
}

pub struct DashboardSession {
    registry: Arc<InstrumentRegistry>,
    store: Arc<SeriesStore>,
    selection: Mutex<SelectionSet>,
    // None means "whatever is selected".
    portfolio: Mutex<Option<Vec<String>>>,
    resolver: RecommendationResolver,
}

impl DashboardSession {
    pub fn new(
        registry: Arc<InstrumentRegistry>,
        store: Arc<SeriesStore>,
        provider: Arc<dyn AdvisoryProvider>,
    ) -> Self {
        Self {
            registry,
            store,
            selection: Mutex::new(SelectionSet::new()),
            portfolio: Mutex::new(None),
            resolver: RecommendationResolver::new(provider),
        }
    }

    pub fn search(&self, query: &str, limit: Option<usize>) -> Vec<Instrument> {
        self.registry
            .search(query, limit)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Adds a catalog symbol to the comparison. Returns the resulting selection.
    pub fn add(&self, symbol: &str) -> Result<Vec<String>> {
        let mut selection = self.selection.lock();
        if selection.add_checked(symbol, &self.registry)? {
            tracing::debug!(symbol = %normalize_symbol(symbol), "added to selection");
        }
        Ok(selection.snapshot())
    }

    pub fn remove(&self, symbol: &str) -> Vec<String> {
        let mut selection = self.selection.lock();
        selection.remove(symbol);
        selection.snapshot()
    }

    pub fn reorder(&self, from: usize, to: usize) -> Result<Vec<String>> {
        let mut selection = self.selection.lock();
        selection.reorder(from, to)?;
        Ok(selection.snapshot())
    }

    pub fn selection(&self) -> Vec<String> {
        self.selection.lock().snapshot()
    }

    /// Selected symbols resolved against the catalog, in selection order.
    pub fn selected_instruments(&self) -> Vec<Instrument> {
        self.selection()
            .iter()
            .map(|s| self.registry.resolve_or_unknown(s))
            .collect()
    }

    /// Projects a consistent snapshot of the selection; the lock is released before
    /// alignment starts.
    pub fn chart(&self, normalized: bool) -> ChartView {
        let selection = self.selection.lock().clone();
        let (aligned, ProjectionReport { missing }) = if normalized {
            projection::project_normalized(&selection, &self.store)
        } else {
            projection::project_with_report(&selection, &self.store)
        };
        ChartView { aligned, missing }
    }

    /// Pins the portfolio used for strategy requests. An empty list falls back to
    /// the selection again.
    pub fn set_portfolio<I, S>(&self, symbols: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleaned: Vec<String> = Vec::new();
        for s in symbols {
            let s = normalize_symbol(s.as_ref());
            if !s.is_empty() && !cleaned.contains(&s) {
                cleaned.push(s);
            }
        }
        *self.portfolio.lock() = if cleaned.is_empty() { None } else { Some(cleaned) };
        self.portfolio()
    }

    pub fn portfolio(&self) -> Vec<String> {
        match self.portfolio.lock().as_ref() {
            Some(symbols) => symbols.clone(),
            None => self.selection(),
        }
    }

    /// Price metrics for the portfolio the next strategy request would use.
    pub fn summary(&self) -> PortfolioSummary {
        summary::summarize(&self.portfolio(), &self.store)
    }

    pub fn strategy_request(&self, prompt: &str) -> Result<StrategyRequest> {
        StrategyRequest::build(self.portfolio(), prompt)
    }

    /// Requests strategies and waits for the outcome.
    pub async fn submit_prompt(&self, prompt: &str, pin: Option<usize>) -> Result<CurrentStrategy> {
        let request = self.strategy_request(prompt)?;
        match pin {
            Some(pin) => self.resolver.submit_pinned(request, pin).await,
            None => self.resolver.submit(request).await,
        }
    }

    /// Requests strategies in the background. Overlap and an empty portfolio are
    /// rejected before anything is spawned.
    pub fn spawn_prompt(
        &self,
        prompt: &str,
        pin: Option<usize>,
    ) -> Result<JoinHandle<Result<CurrentStrategy>>> {
        let request = self.strategy_request(prompt)?;
        self.resolver.spawn_submit(request, pin)
    }

    pub fn select_strategy(&self, index: usize) -> Result<CurrentStrategy> {
        self.resolver.select(index)
    }

    pub fn strategies(&self) -> StrategiesView {
        let (status, current) = self.resolver.view();
        StrategiesView { status, current }
    }

    pub fn acknowledge(&self) -> ResolverStatus {
        self.resolver.acknowledge()
    }
}
