mod fixtures;
mod routes;

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_core::advisory::http::HttpAdvisoryProvider;
use folio_core::advisory::{AdvisoryProvider, StrategyRequest};
use folio_core::quote::QuoteClient;
use folio_core::registry::InstrumentRegistry;

const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 30 * 60;
const SESSION_SWEEP_EVERY: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = folio_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let provider: Arc<dyn AdvisoryProvider> = match HttpAdvisoryProvider::from_settings(&settings) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "advisory provider unavailable; strategy requests will fail");
            Arc::new(UnconfiguredProvider)
        }
    };

    let quote = if settings.quote_url.is_some() {
        match QuoteClient::from_settings(&settings) {
            Ok(client) => Some(client),
            Err(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(error = %e, "quote client init failed; /quote disabled");
                None
            }
        }
    } else {
        None
    };

    let store = fixtures::load_series(&settings)?;
    tracing::info!(symbols = store.len(), "series loaded");

    let state = routes::AppState::new(
        InstrumentRegistry::with_default_catalog(),
        store,
        provider,
        quote,
    );
    let idle_ttl = Duration::from_secs(
        std::env::var("SESSION_IDLE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SESSION_IDLE_TTL_SECS),
    );
    let _sweeper = routes::spawn_session_sweeper(state.clone(), idle_ttl, SESSION_SWEEP_EVERY);

    let app = routes::router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Stands in when ADVISORY_BASE_URL is missing so the rest of the dashboard keeps working.
struct UnconfiguredProvider;

#[async_trait::async_trait]
impl AdvisoryProvider for UnconfiguredProvider {
    fn provider_name(&self) -> &'static str {
        "unconfigured"
    }

    async fn fetch_strategies(&self, _request: &StrategyRequest) -> anyhow::Result<serde_json::Value> {
        anyhow::bail!("ADVISORY_BASE_URL is not configured")
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &folio_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
