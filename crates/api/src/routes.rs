use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use folio_core::advisory::AdvisoryProvider;
use folio_core::domain::instrument::Instrument;
use folio_core::domain::series::SeriesStore;
use folio_core::error::DashboardError;
use folio_core::quote::{Quote, QuoteClient};
use folio_core::registry::InstrumentRegistry;
use folio_core::resolver::{CurrentStrategy, ResolverStatus};
use folio_core::session::{ChartView, DashboardSession, StrategiesView};
use folio_core::summary::PortfolioSummary;

pub struct SessionEntry {
    session: Arc<DashboardSession>,
    touched: Instant,
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<DashMap<Uuid, SessionEntry>>,
    pub registry: Arc<InstrumentRegistry>,
    pub store: Arc<SeriesStore>,
    pub provider: Arc<dyn AdvisoryProvider>,
    pub quote: Option<QuoteClient>,
}

impl AppState {
    pub fn new(
        registry: InstrumentRegistry,
        store: SeriesStore,
        provider: Arc<dyn AdvisoryProvider>,
        quote: Option<QuoteClient>,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            registry: Arc::new(registry),
            store: Arc::new(store),
            provider,
            quote,
        }
    }

    /// Looks a session up and marks it as used.
    fn session(&self, id: Uuid) -> Result<Arc<DashboardSession>, ApiError> {
        let mut entry = self
            .sessions
            .get_mut(&id)
            .ok_or(ApiError::SessionNotFound(id))?;
        entry.touched = Instant::now();
        Ok(entry.session.clone())
    }

    /// Drops sessions untouched for at least `ttl`. Sessions with a request in
    /// flight are kept. Returns how many were dropped.
    pub fn sweep_idle(&self, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| {
            entry.touched.elapsed() < ttl
                || entry.session.strategies().status == ResolverStatus::Requesting
        });
        before.saturating_sub(self.sessions.len())
    }
}

/// Sweeps idle sessions every `every` until the runtime shuts down.
pub fn spawn_session_sweeper(state: AppState, ttl: Duration, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let dropped = state.sweep_idle(ttl);
            if dropped > 0 {
                tracing::info!(dropped, remaining = state.sessions.len(), "swept idle sessions");
            }
        }
    })
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/instruments", get(search_instruments))
        .route("/quote", get(get_quote))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", delete(close_session))
        .route("/sessions/:id/selection", get(get_selection).post(add_symbol))
        .route("/sessions/:id/selection/reorder", post(reorder_selection))
        .route("/sessions/:id/selection/:symbol", delete(remove_symbol))
        .route("/sessions/:id/chart", get(get_chart))
        .route("/sessions/:id/portfolio", get(get_portfolio).post(set_portfolio))
        .route(
            "/sessions/:id/strategies",
            get(get_strategies).post(submit_strategies),
        )
        .route("/sessions/:id/strategies/selected", put(select_strategy))
        .route("/sessions/:id/strategies/ack", post(acknowledge_strategies))
        .route("/sessions/:id/summary", get(get_summary))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[derive(Debug)]
pub enum ApiError {
    Dashboard(DashboardError),
    SessionNotFound(Uuid),
    Unavailable(&'static str),
    Upstream(anyhow::Error),
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        ApiError::Dashboard(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Dashboard(err) => {
                let status = match &err {
                    DashboardError::InvalidIndex { .. } | DashboardError::IndexOutOfRange { .. } => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    DashboardError::AlreadyInFlight => StatusCode::CONFLICT,
                    DashboardError::ProviderFailure(_) => StatusCode::BAD_GATEWAY,
                    DashboardError::UnknownInstrument(_) => StatusCode::NOT_FOUND,
                    DashboardError::EmptyPortfolio => StatusCode::BAD_REQUEST,
                };
                (status, err.to_string())
            }
            ApiError::SessionNotFound(id) => (StatusCode::NOT_FOUND, format!("session {id} not found")),
            ApiError::Unavailable(what) => {
                (StatusCode::SERVICE_UNAVAILABLE, format!("{what} is not configured"))
            }
            ApiError::Upstream(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "upstream request failed");
                (StatusCode::BAD_GATEWAY, format!("{err:#}"))
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

async fn search_instruments(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<Instrument>> {
    Json(
        state
            .registry
            .search(&params.q, params.limit)
            .into_iter()
            .cloned()
            .collect(),
    )
}

async fn get_quote(State(state): State<AppState>) -> Result<Json<Quote>, ApiError> {
    let Some(client) = &state.quote else {
        return Err(ApiError::Unavailable("QUOTE_URL"));
    };
    let quote = client.fetch().await.map_err(ApiError::Upstream)?;
    Ok(Json(quote))
}

#[derive(Debug, Serialize)]
struct CreatedSession {
    session_id: Uuid,
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<CreatedSession>) {
    let session_id = Uuid::new_v4();
    let session = DashboardSession::new(
        state.registry.clone(),
        state.store.clone(),
        state.provider.clone(),
    );
    state.sessions.insert(
        session_id,
        SessionEntry {
            session: Arc::new(session),
            touched: Instant::now(),
        },
    );
    tracing::info!(%session_id, sessions = state.sessions.len(), "session created");
    (StatusCode::CREATED, Json(CreatedSession { session_id }))
}

async fn close_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .remove(&id)
        .ok_or(ApiError::SessionNotFound(id))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct SelectionView {
    symbols: Vec<String>,
    instruments: Vec<Instrument>,
}

fn selection_view(session: &DashboardSession) -> SelectionView {
    let instruments = session.selected_instruments();
    SelectionView {
        symbols: instruments.iter().map(|i| i.symbol.clone()).collect(),
        instruments,
    }
}

async fn get_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SelectionView>, ApiError> {
    let session = state.session(id)?;
    Ok(Json(selection_view(&session)))
}

#[derive(Debug, Deserialize)]
struct AddSymbol {
    symbol: String,
}

async fn add_symbol(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AddSymbol>,
) -> Result<Json<SelectionView>, ApiError> {
    let session = state.session(id)?;
    session.add(&body.symbol)?;
    Ok(Json(selection_view(&session)))
}

async fn remove_symbol(
    State(state): State<AppState>,
    Path((id, symbol)): Path<(Uuid, String)>,
) -> Result<Json<SelectionView>, ApiError> {
    let session = state.session(id)?;
    session.remove(&symbol);
    Ok(Json(selection_view(&session)))
}

#[derive(Debug, Deserialize)]
struct Reorder {
    from: usize,
    to: usize,
}

async fn reorder_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<Reorder>,
) -> Result<Json<SelectionView>, ApiError> {
    let session = state.session(id)?;
    session.reorder(body.from, body.to)?;
    Ok(Json(selection_view(&session)))
}

#[derive(Debug, Deserialize)]
struct ChartParams {
    #[serde(default)]
    normalized: bool,
}

async fn get_chart(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ChartParams>,
) -> Result<Json<ChartView>, ApiError> {
    let session = state.session(id)?;
    Ok(Json(session.chart(params.normalized)))
}

#[derive(Debug, Serialize, Deserialize)]
struct Portfolio {
    symbols: Vec<String>,
}

async fn get_portfolio(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Portfolio>, ApiError> {
    let session = state.session(id)?;
    Ok(Json(Portfolio {
        symbols: session.portfolio(),
    }))
}

async fn set_portfolio(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<Portfolio>,
) -> Result<Json<Portfolio>, ApiError> {
    let session = state.session(id)?;
    Ok(Json(Portfolio {
        symbols: session.set_portfolio(&body.symbols),
    }))
}

#[derive(Debug, Deserialize)]
struct SubmitPrompt {
    #[serde(default)]
    prompt: String,
    pin: Option<usize>,
}

/// Accepted requests run in the background; poll `GET .../strategies` for the outcome.
async fn submit_strategies(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitPrompt>,
) -> Result<(StatusCode, Json<StrategiesView>), ApiError> {
    let session = state.session(id)?;
    // Dropping the handle detaches the task.
    let _handle = session.spawn_prompt(&body.prompt, body.pin)?;
    tracing::info!(session_id = %id, "strategy request accepted");
    Ok((StatusCode::ACCEPTED, Json(session.strategies())))
}

async fn get_strategies(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StrategiesView>, ApiError> {
    let session = state.session(id)?;
    Ok(Json(session.strategies()))
}

/// Consumes a finished outcome so the status returns to idle. The live set stays.
async fn acknowledge_strategies(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StrategiesView>, ApiError> {
    let session = state.session(id)?;
    let consumed = session.acknowledge();
    tracing::debug!(session_id = %id, ?consumed, "strategy outcome acknowledged");
    Ok(Json(session.strategies()))
}

async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PortfolioSummary>, ApiError> {
    let session = state.session(id)?;
    Ok(Json(session.summary()))
}

#[derive(Debug, Deserialize)]
struct SelectStrategy {
    index: usize,
}

async fn select_strategy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SelectStrategy>,
) -> Result<Json<CurrentStrategy>, ApiError> {
    let session = state.session(id)?;
    Ok(Json(session.select_strategy(body.index)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::demo_series;
    use folio_core::advisory::StrategyRequest;
    use serde_json::{json, Value};
    use tokio::sync::Notify;

    /// Holds every request until released, then answers with two strategies.
    struct GatedProvider {
        release: Notify,
    }

    #[async_trait::async_trait]
    impl AdvisoryProvider for GatedProvider {
        fn provider_name(&self) -> &'static str {
            "gated"
        }

        async fn fetch_strategies(&self, request: &StrategyRequest) -> anyhow::Result<Value> {
            self.release.notified().await;
            Ok(json!({"strategies": [
                {"name": "Growth", "commentary": request.objective(),
                 "recommendations": {"buy": [{"ticker": "NVDA", "reason": "AI demand"}]}},
                {"name": "Defensive"}
            ]}))
        }
    }

    fn state(provider: Arc<GatedProvider>) -> AppState {
        AppState::new(
            InstrumentRegistry::with_default_catalog(),
            demo_series(),
            provider,
            None,
        )
    }

    async fn serve(provider: Arc<GatedProvider>) -> (String, reqwest::Client) {
        serve_state(state(provider)).await
    }

    async fn serve_state(state: AppState) -> (String, reqwest::Client) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        (format!("http://{addr}"), reqwest::Client::new())
    }

    async fn new_session(base: &str, client: &reqwest::Client) -> String {
        let res = client.post(format!("{base}/sessions")).send().await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn selection_and_chart_flow() {
        let (base, client) = serve(Arc::new(GatedProvider { release: Notify::new() })).await;
        let sid = new_session(&base, &client).await;
        let sel = format!("{base}/sessions/{sid}/selection");

        for symbol in ["tsla", "AAPL"] {
            let res = client.post(&sel).json(&json!({"symbol": symbol})).send().await.unwrap();
            assert_eq!(res.status(), reqwest::StatusCode::OK);
        }
        let res = client.post(&sel).json(&json!({"symbol": "ZZZZ"})).send().await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

        let res = client
            .post(format!("{sel}/reorder"))
            .json(&json!({"from": 1, "to": 0}))
            .send()
            .await
            .unwrap();
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["symbols"], json!(["AAPL", "TSLA"]));

        let res = client
            .post(format!("{sel}/reorder"))
            .json(&json!({"from": 0, "to": 9}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);

        let chart: Value = client
            .get(format!("{base}/sessions/{sid}/chart"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(chart["series"], json!(["AAPL", "TSLA"]));
        assert_eq!(chart["rows"][0], json!({"timestamp": "Jan", "AAPL": 140.0, "TSLA": 20.0}));

        let res = client.delete(format!("{sel}/AAPL")).send().await.unwrap();
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["symbols"], json!(["TSLA"]));
    }

    #[tokio::test]
    async fn strategy_requests_run_in_the_background() {
        let provider = Arc::new(GatedProvider { release: Notify::new() });
        let (base, client) = serve(provider.clone()).await;
        let sid = new_session(&base, &client).await;
        let strategies = format!("{base}/sessions/{sid}/strategies");

        let res = client.post(&strategies).json(&json!({"prompt": ""})).send().await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

        client
            .post(format!("{base}/sessions/{sid}/portfolio"))
            .json(&json!({"symbols": ["NVDA", "KO"]}))
            .send()
            .await
            .unwrap();

        let res = client.post(&strategies).json(&json!({"prompt": "grow"})).send().await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::ACCEPTED);
        let res = client.post(&strategies).json(&json!({"prompt": "again"})).send().await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);

        provider.release.notify_one();
        let mut view = Value::Null;
        for _ in 0..100 {
            view = client.get(&strategies).send().await.unwrap().json().await.unwrap();
            if view["status"]["state"] != json!("requesting") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(view["status"]["state"], json!("succeeded"));
        assert_eq!(view["current"]["selected"], json!(0));
        assert_eq!(view["current"]["strategies"][0]["commentary"], json!("grow"));

        let acked: Value = client
            .post(format!("{strategies}/ack"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(acked["status"], json!({"state": "idle"}));
        assert_eq!(acked["current"]["strategies"][0]["name"], json!("Growth"));

        let selected = format!("{strategies}/selected");
        let res = client.put(&selected).json(&json!({"index": 1})).send().await.unwrap();
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["selected"], json!(1));
        let res = client.put(&selected).json(&json!({"index": 2})).send().await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unknown_session_and_missing_quote() {
        let (base, client) = serve(Arc::new(GatedProvider { release: Notify::new() })).await;
        let res = client
            .get(format!("{base}/sessions/{}/selection", Uuid::new_v4()))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

        let res = client.get(format!("{base}/quote")).send().await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

        let found: Value = client
            .get(format!("{base}/instruments?q=tes"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(found[0]["symbol"], json!("TSLA"));
    }

    #[tokio::test]
    async fn summary_reports_portfolio_metrics() {
        let (base, client) = serve(Arc::new(GatedProvider { release: Notify::new() })).await;
        let sid = new_session(&base, &client).await;
        client
            .post(format!("{base}/sessions/{sid}/portfolio"))
            .json(&json!({"symbols": ["TSLA", "NVDA"]}))
            .send()
            .await
            .unwrap();

        let summary: Value = client
            .get(format!("{base}/sessions/{sid}/summary"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(summary["tickers"][0]["symbol"], json!("TSLA"));
        assert_eq!(summary["tickers"][0]["value"], json!(180.0));
        assert_eq!(summary["tickers"][0]["sign"], json!(true));
        // Six demo months are shorter than the ROI lookback.
        assert_eq!(summary["tickers"][0]["roi"], Value::Null);
        assert_eq!(summary["missing"], json!(["NVDA"]));
    }

    #[tokio::test]
    async fn idle_sessions_are_swept() {
        let state = state(Arc::new(GatedProvider { release: Notify::new() }));
        let (base, client) = serve_state(state.clone()).await;
        let first = new_session(&base, &client).await;
        new_session(&base, &client).await;

        assert_eq!(state.sweep_idle(Duration::from_secs(3600)), 0);
        assert_eq!(state.sweep_idle(Duration::ZERO), 2);
        assert!(state.sessions.is_empty());

        let res = client
            .get(format!("{base}/sessions/{first}/selection"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn sessions_with_a_request_in_flight_survive_the_sweep() {
        let provider = Arc::new(GatedProvider { release: Notify::new() });
        let state = state(provider.clone());
        let (base, client) = serve_state(state.clone()).await;
        let sid = new_session(&base, &client).await;
        client
            .post(format!("{base}/sessions/{sid}/selection"))
            .json(&json!({"symbol": "KO"}))
            .send()
            .await
            .unwrap();
        let res = client
            .post(format!("{base}/sessions/{sid}/strategies"))
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::ACCEPTED);

        assert_eq!(state.sweep_idle(Duration::ZERO), 0);
        provider.release.notify_one();
    }
}
