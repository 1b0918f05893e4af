pub mod error;
pub mod http;
pub mod json;

use crate::domain::instrument::normalize_symbol;
use crate::error::{DashboardError, Result};
use serde::Serialize;

/// Objective sent when the user leaves the prompt empty.
pub const DEFAULT_OBJECTIVE: &str = "Improve my strategies";

/// A portfolio plus a free-text objective. Built once per submission and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyRequest {
    portfolio: Vec<String>,
    prompt: String,
}

impl StrategyRequest {
    /// Symbols are normalized and deduplicated in first-seen order; blanks are
    /// dropped. The prompt is kept verbatim.
    pub fn build<I, S>(portfolio: I, prompt: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut symbols: Vec<String> = Vec::new();
        for s in portfolio {
            let s = normalize_symbol(s.as_ref());
            if !s.is_empty() && !symbols.contains(&s) {
                symbols.push(s);
            }
        }
        if symbols.is_empty() {
            return Err(DashboardError::EmptyPortfolio);
        }

        Ok(Self {
            portfolio: symbols,
            prompt: prompt.to_string(),
        })
    }

    pub fn portfolio(&self) -> &[String] {
        &self.portfolio
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn uses_default_objective(&self) -> bool {
        self.prompt.trim().is_empty()
    }

    pub fn objective(&self) -> &str {
        if self.uses_default_objective() {
            DEFAULT_OBJECTIVE
        } else {
            &self.prompt
        }
    }

    /// Wire query: `portfolio` comma-joined, `prompt` as free text.
    pub fn query_pairs(&self) -> [(&'static str, String); 2] {
        [
            ("portfolio", self.portfolio.join(",")),
            ("prompt", self.objective().to_string()),
        ]
    }
}

/// The external service that turns a request into strategy alternatives. Returns
/// the provider's JSON as-is; normalization is the resolver's job.
#[async_trait::async_trait]
pub trait AdvisoryProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_strategies(&self, request: &StrategyRequest) -> anyhow::Result<serde_json::Value>;
}
