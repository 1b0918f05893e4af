use serde::{Deserialize, Serialize};
use std::ops::Deref;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swot {
    pub strengths: String,
    pub weaknesses: String,
    pub opportunities: String,
    pub threats: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeIdea {
    pub ticker: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendations {
    pub buy: Vec<TradeIdea>,
    pub sell: Vec<TradeIdea>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub commentary: String,
    pub swot: Swot,
    pub recommendations: Recommendations,
    pub sectors: Vec<String>,
}

/// The alternatives returned for one request. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StrategySet(Vec<Strategy>);

impl StrategySet {
    pub fn new(strategies: Vec<Strategy>) -> Option<Self> {
        if strategies.is_empty() {
            return None;
        }
        Some(Self(strategies))
    }

    pub fn first(&self) -> &Strategy {
        &self.0[0]
    }

    pub fn into_inner(self) -> Vec<Strategy> {
        self.0
    }
}

impl Deref for StrategySet {
    type Target = [Strategy];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
