//! Ordered, deduplicated set of instruments a user is comparing.

use crate::domain::instrument::normalize_symbol;
use crate::error::{DashboardError, Result};
use crate::registry::InstrumentRegistry;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SelectionSet {
    symbols: Vec<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `symbol` unless it is already present. Returns whether the set changed.
    pub fn add(&mut self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() || self.symbols.contains(&symbol) {
            return false;
        }
        self.symbols.push(symbol);
        true
    }

    /// Like [`SelectionSet::add`], but only for symbols the registry knows.
    pub fn add_checked(&mut self, symbol: &str, registry: &InstrumentRegistry) -> Result<bool> {
        if !registry.contains(symbol) {
            return Err(DashboardError::UnknownInstrument(normalize_symbol(symbol)));
        }
        Ok(self.add(symbol))
    }

    /// Returns whether the set changed.
    pub fn remove(&mut self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        let before = self.symbols.len();
        self.symbols.retain(|s| *s != symbol);
        self.symbols.len() != before
    }

    /// Moves the element at `from` to `to`, shifting the ones in between. Either index
    /// outside `[0, len)` rejects the whole call and leaves the set untouched.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.symbols.len();
        if from >= len || to >= len {
            return Err(DashboardError::InvalidIndex { from, to, len });
        }
        let symbol = self.symbols.remove(from);
        self.symbols.insert(to, symbol);
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.symbols.clone()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.symbols
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(&normalize_symbol(symbol))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
    }
}

impl<S: AsRef<str>> FromIterator<S> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut out = Self::new();
        for s in iter {
            out.add(s.as_ref());
        }
        out
    }
}
