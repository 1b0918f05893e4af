use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_core::advisory::http::HttpAdvisoryProvider;
use folio_core::advisory::StrategyRequest;
use folio_core::resolver::RecommendationResolver;

mod render;

#[derive(Debug, Parser)]
#[command(name = "folio_cli")]
struct Args {
    /// Comma-separated tickers, e.g. AAPL,MSFT.
    #[arg(long, value_delimiter = ',', required = true)]
    portfolio: Vec<String>,

    /// Free-text objective. Empty means the default objective.
    #[arg(long, default_value = "")]
    prompt: String,

    /// Print the live strategy set as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Select this alternative of the returned set instead of the first.
    #[arg(long)]
    pin: Option<usize>,

    /// Print the request that would be sent and exit.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = folio_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let request = StrategyRequest::build(&args.portfolio, &args.prompt)?;

    if args.dry_run {
        tracing::info!(portfolio = ?request.portfolio(), dry_run = true, "strategy request (dry-run)");
        println!("{}", serde_json::to_string_pretty(&request)?);
        return Ok(());
    }

    let provider = HttpAdvisoryProvider::from_settings(&settings)?;
    let resolver = RecommendationResolver::new(Arc::new(provider));

    let outcome = match args.pin {
        Some(pin) => resolver.submit_pinned(request, pin).await,
        None => resolver.submit(request).await,
    };
    let current = match outcome {
        Ok(current) => current,
        Err(err) => {
            let err = anyhow::Error::new(err);
            sentry_anyhow::capture_anyhow(&err);
            return Err(err).context("strategy request failed");
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&current)?);
    } else {
        print!("{}", render::render_current(&current));
    }
    Ok(())
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
