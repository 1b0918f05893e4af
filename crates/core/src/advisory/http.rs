use crate::advisory::error::ProviderDiagnosticsError;
use crate::advisory::json;
use crate::advisory::{AdvisoryProvider, StrategyRequest};
use crate::config::{env_parse, Settings};
use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

const PROVIDER_NAME: &str = "http_advisory";
const DEFAULT_PATH: &str = "/api/analytics/strategies";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_RETRIES: u32 = 1;
const MAX_RETRIES: u32 = 10;

/// GETs strategies from the advisory endpoint with `portfolio` and `prompt` as
/// query parameters.
#[derive(Debug, Clone)]
pub struct HttpAdvisoryProvider {
    http: reqwest::Client,
    base_url: String,
    path: String,
    // Retries after the first attempt; 0 means a single attempt.
    retries: u32,
}

impl HttpAdvisoryProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_advisory_base_url()?.to_string();

        let timeout_secs = env_parse::<u64>("ADVISORY_TIMEOUT_SECS").unwrap_or(DEFAULT_TIMEOUT_SECS);
        let retries = env_parse::<u32>("ADVISORY_RETRIES").unwrap_or(DEFAULT_RETRIES);

        let path = std::env::var("ADVISORY_STRATEGIES_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PATH.to_string());

        Self::new(&base_url, &path, Duration::from_secs(timeout_secs), retries)
    }

    pub fn new(base_url: &str, path: &str, timeout: Duration, retries: u32) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build advisory http client")?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            path: path.to_string(),
            retries: retries.min(MAX_RETRIES),
        })
    }

    fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };

        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn fetch_once(&self, request: &StrategyRequest) -> Result<Value> {
        let res = self
            .http
            .get(self.url())
            .query(&request.query_pairs())
            .send()
            .await
            .context("advisory provider request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read advisory provider response")?;

        if !status.is_success() {
            return Err(ProviderDiagnosticsError {
                provider: PROVIDER_NAME,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
            }
            .into());
        }

        json::parse_payload(&text).map_err(|err| {
            ProviderDiagnosticsError {
                provider: PROVIDER_NAME,
                stage: "parse",
                detail: format!("{err:#}"),
                raw_output: Some(text),
            }
            .into()
        })
    }
}

#[async_trait::async_trait]
impl AdvisoryProvider for HttpAdvisoryProvider {
    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn fetch_strategies(&self, request: &StrategyRequest) -> Result<Value> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(request).await {
                Ok(payload) => return Ok(payload),
                Err(err) => {
                    if attempt > self.retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_millis(500 << (attempt - 1).min(6));
                    tracing::warn!(attempt, ?backoff, error = %err, "advisory fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
