//! Recommendation resolver: the single state machine of the dashboard core.
//!
//! `Idle -> Requesting -> {Succeeded, Failed} -> Idle`. At most one request is in
//! flight per resolver; a second `submit` while `Requesting` is rejected rather than
//! cancelling the first. A successful response replaces the live strategy set in one
//! step and resets the selection to the first alternative. A failed one leaves the
//! previous set and selection exactly as they were.

use crate::advisory::error::ProviderDiagnosticsError;
use crate::advisory::{AdvisoryProvider, StrategyRequest};
use crate::domain::contract::normalize_strategies;
use crate::domain::strategy::{Strategy, StrategySet};
use crate::error::{DashboardError, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResolverStatus {
    Idle,
    Requesting,
    Succeeded,
    Failed { reason: String },
}

impl ResolverStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResolverStatus::Succeeded | ResolverStatus::Failed { .. })
    }
}

/// A consistent view of the live set and the selected alternative. The index always
/// resolves within `strategies`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentStrategy {
    strategies: Arc<StrategySet>,
    selected: usize,
}

impl CurrentStrategy {
    pub fn strategies(&self) -> &StrategySet {
        &self.strategies
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> &Strategy {
        &self.strategies[self.selected]
    }
}

impl Serialize for CurrentStrategy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut st = serializer.serialize_struct("CurrentStrategy", 2)?;
        st.serialize_field("selected", &self.selected)?;
        st.serialize_field("strategies", &*self.strategies)?;
        st.end()
    }
}

#[derive(Debug)]
struct Inner {
    status: ResolverStatus,
    live: Option<Arc<StrategySet>>,
    selected: usize,
}

impl Inner {
    fn current(&self) -> Option<CurrentStrategy> {
        self.live.as_ref().map(|set| CurrentStrategy {
            strategies: set.clone(),
            selected: self.selected,
        })
    }
}

pub struct RecommendationResolver<P: AdvisoryProvider + ?Sized = dyn AdvisoryProvider> {
    provider: Arc<P>,
    inner: Arc<Mutex<Inner>>,
}

impl<P: AdvisoryProvider + ?Sized> Clone for RecommendationResolver<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<P: AdvisoryProvider + ?Sized> RecommendationResolver<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            inner: Arc::new(Mutex::new(Inner {
                status: ResolverStatus::Idle,
                live: None,
                selected: 0,
            })),
        }
    }

    pub fn status(&self) -> ResolverStatus {
        self.inner.lock().status.clone()
    }

    /// `None` until the first successful response.
    pub fn current(&self) -> Option<CurrentStrategy> {
        self.inner.lock().current()
    }

    /// Status and current view read under one lock.
    pub fn view(&self) -> (ResolverStatus, Option<CurrentStrategy>) {
        let inner = self.inner.lock();
        (inner.status.clone(), inner.current())
    }

    /// Consumes a terminal outcome and returns to `Idle`. Returns the status that was
    /// consumed; non-terminal states are returned unchanged.
    pub fn acknowledge(&self) -> ResolverStatus {
        let mut inner = self.inner.lock();
        if inner.status.is_terminal() {
            std::mem::replace(&mut inner.status, ResolverStatus::Idle)
        } else {
            inner.status.clone()
        }
    }

    /// Moves the selection within the live set. Does not touch the request state.
    pub fn select(&self, index: usize) -> Result<CurrentStrategy> {
        let mut inner = self.inner.lock();
        let len = inner.live.as_ref().map_or(0, |set| set.len());
        if index >= len {
            return Err(DashboardError::IndexOutOfRange { index, len });
        }
        inner.selected = index;
        inner
            .current()
            .ok_or(DashboardError::IndexOutOfRange { index, len })
    }

    pub async fn submit(&self, request: StrategyRequest) -> Result<CurrentStrategy> {
        self.run(request, None).await
    }

    /// Like [`RecommendationResolver::submit`], but selects alternative `pin` of the
    /// new set when it exists.
    pub async fn submit_pinned(&self, request: StrategyRequest, pin: usize) -> Result<CurrentStrategy> {
        self.run(request, Some(pin)).await
    }

    /// Starts a request on the runtime and returns its handle. `AlreadyInFlight` is
    /// reported here, before anything is spawned.
    pub fn spawn_submit(
        &self,
        request: StrategyRequest,
        pin: Option<usize>,
    ) -> Result<JoinHandle<Result<CurrentStrategy>>>
    where
        P: 'static,
    {
        let guard = self.begin()?;
        let resolver = self.clone();
        Ok(tokio::spawn(async move {
            resolver.resolve(guard, request, pin).await
        }))
    }

    async fn run(&self, request: StrategyRequest, pin: Option<usize>) -> Result<CurrentStrategy> {
        let guard = self.begin()?;
        self.resolve(guard, request, pin).await
    }

    async fn resolve(
        &self,
        guard: InFlightGuard,
        request: StrategyRequest,
        pin: Option<usize>,
    ) -> Result<CurrentStrategy> {
        tracing::info!(
            provider = self.provider.provider_name(),
            portfolio = ?request.portfolio(),
            default_objective = request.uses_default_objective(),
            "requesting strategies"
        );
        let fetched = self.provider.fetch_strategies(&request).await;
        guard.disarm();

        let strategies = match fetched {
            Ok(payload) => StrategySet::new(normalize_strategies(&payload)).ok_or_else(|| {
                tracing::debug!(%payload, "payload normalized to an empty strategy set");
                "provider returned no strategies".to_string()
            }),
            Err(err) => {
                if let Some(diag) = err.downcast_ref::<ProviderDiagnosticsError>() {
                    tracing::debug!(stage = diag.stage, raw_output = ?diag.raw_output, "advisory provider diagnostics");
                }
                Err(format!("{err:#}"))
            }
        };

        match strategies {
            Ok(set) => Ok(self.install(set, pin)),
            Err(reason) => {
                tracing::warn!(%reason, "strategy refresh failed; keeping previous strategies");
                self.inner.lock().status = ResolverStatus::Failed {
                    reason: reason.clone(),
                };
                Err(DashboardError::ProviderFailure(reason))
            }
        }
    }

    fn begin(&self) -> Result<InFlightGuard> {
        let mut inner = self.inner.lock();
        if inner.status == ResolverStatus::Requesting {
            return Err(DashboardError::AlreadyInFlight);
        }
        inner.status = ResolverStatus::Requesting;
        Ok(InFlightGuard {
            inner: self.inner.clone(),
            armed: true,
        })
    }

    fn install(&self, set: StrategySet, pin: Option<usize>) -> CurrentStrategy {
        let count = set.len();
        let selected = match pin {
            Some(idx) if idx < count => idx,
            Some(idx) => {
                tracing::warn!(pin = idx, count, "pinned alternative not returned; selecting the first");
                0
            }
            None => 0,
        };

        let set = Arc::new(set);
        let mut inner = self.inner.lock();
        inner.live = Some(set.clone());
        inner.selected = selected;
        inner.status = ResolverStatus::Succeeded;
        tracing::info!(count, selected, "installed new strategy set");
        CurrentStrategy {
            strategies: set,
            selected,
        }
    }
}

/// Marks the request failed if the submitting future is dropped mid-flight, so the
/// resolver can never stay `Requesting` forever.
struct InFlightGuard {
    inner: Arc<Mutex<Inner>>,
    armed: bool,
}

impl InFlightGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.armed {
            let mut inner = self.inner.lock();
            if inner.status == ResolverStatus::Requesting {
                tracing::warn!("strategy request dropped before completion");
                inner.status = ResolverStatus::Failed {
                    reason: "request cancelled".to_string(),
                };
            }
        }
    }
}
