//! One-line advisory quote for the dashboard header. Display text only.

use crate::advisory::error::ProviderDiagnosticsError;
use crate::config::{env_parse, Settings};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROVIDER_NAME: &str = "quote";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QuoteClient {
    http: reqwest::Client,
    url: String,
}

impl QuoteClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let url = settings.require_quote_url()?;
        let timeout_secs = env_parse::<u64>("QUOTE_TIMEOUT_SECS").unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::new(url, Duration::from_secs(timeout_secs))
    }

    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build quote http client")?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    pub async fn fetch(&self) -> Result<Quote> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("quote request failed")?;

        let http_status = res.status();
        let text = res.text().await.context("failed to read quote response")?;
        if !http_status.is_success() {
            return Err(ProviderDiagnosticsError {
                provider: PROVIDER_NAME,
                stage: "http",
                detail: format!("status={http_status}"),
                raw_output: Some(text),
            }
            .into());
        }

        let envelope = serde_json::from_str::<QuoteEnvelope>(&text)
            .with_context(|| format!("quote response is not a quote envelope: {text}"))?;
        // The envelope carries its own status; a 200 transport can still wrap a 500.
        let status = envelope.status.unwrap_or(http_status.as_u16());
        match envelope.body {
            Some(body) if (200..300).contains(&status) => Ok(Quote {
                status,
                body: body.trim().to_string(),
            }),
            _ => Err(ProviderDiagnosticsError {
                provider: PROVIDER_NAME,
                stage: "envelope",
                detail: envelope
                    .error
                    .unwrap_or_else(|| format!("status={status} without body")),
                raw_output: Some(text),
            }
            .into()),
        }
    }
}
