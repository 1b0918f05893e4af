//! Static catalog of tradable instruments, loaded once at startup.

use crate::domain::instrument::{normalize_symbol, Instrument};
use std::collections::HashMap;

const DEFAULT_SEARCH_LIMIT: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct InstrumentRegistry {
    instruments: Vec<Instrument>,
    by_symbol: HashMap<String, usize>,
}

impl InstrumentRegistry {
    /// Later duplicates of a symbol are ignored; the first entry wins.
    pub fn from_instruments(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        let mut out = Self::default();
        for instrument in instruments {
            if out.by_symbol.contains_key(&instrument.symbol) || instrument.symbol.is_empty() {
                tracing::debug!(symbol = %instrument.symbol, "skipping duplicate or blank catalog entry");
                continue;
            }
            out.by_symbol
                .insert(instrument.symbol.clone(), out.instruments.len());
            out.instruments.push(instrument);
        }
        out
    }

    pub fn with_default_catalog() -> Self {
        Self::from_instruments(default_catalog())
    }

    pub fn get(&self, symbol: &str) -> Option<&Instrument> {
        let idx = self.by_symbol.get(&normalize_symbol(symbol))?;
        self.instruments.get(*idx)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.by_symbol.contains_key(&normalize_symbol(symbol))
    }

    /// Explicit marker for symbols outside the catalog. Never substitutes another
    /// instrument.
    pub fn resolve_or_unknown(&self, symbol: &str) -> Instrument {
        match self.get(symbol) {
            Some(instrument) => instrument.clone(),
            None => Instrument::new(symbol, "Unknown instrument"),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Case-insensitive search over symbol and display name. Exact symbol matches
    /// rank first, then symbol prefixes, then name substrings; ties keep catalog order.
    pub fn search(&self, query: &str, limit: Option<usize>) -> Vec<&Instrument> {
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.instruments.iter().take(limit).collect();
        }

        let mut ranked: Vec<(u8, &Instrument)> = self
            .instruments
            .iter()
            .filter_map(|i| {
                let symbol = i.symbol.to_lowercase();
                let rank = if symbol == query {
                    0
                } else if symbol.starts_with(&query) {
                    1
                } else if i.display_name.to_lowercase().contains(&query) || symbol.contains(&query) {
                    2
                } else {
                    return None;
                };
                Some((rank, i))
            })
            .collect();

        ranked.sort_by_key(|(rank, _)| *rank);
        ranked.into_iter().take(limit).map(|(_, i)| i).collect()
    }
}

pub fn default_catalog() -> Vec<Instrument> {
    [
        ("NVDA", "NVIDIA", "Semiconductors"),
        ("META", "Meta", "Social Media"),
        ("TSLA", "Tesla Inc", "EV"),
        ("AAPL", "Apple Inc", "Technology"),
        ("AMD", "AMD", "Semiconductors"),
        ("AMZN", "Amazon", "E-commerce"),
        ("KO", "Coca-Cola", "Consumer Staples"),
        ("MSFT", "Microsoft", "Technology"),
        ("GOOGL", "Alphabet", "Technology"),
        ("DELL", "Dell", "Technology"),
        ("INTC", "Intel", "Semiconductors"),
        ("CRM", "Salesforce", "Cloud"),
        ("RIVN", "Rivian", "EV"),
        ("ENPH", "Enphase Energy", "Green Energy"),
        ("JPM", "JPMorgan Chase", "Finance"),
        ("XOM", "Exxon Mobil", "Energy"),
    ]
    .into_iter()
    .map(|(symbol, name, sector)| Instrument::new(symbol, name).with_sector(sector))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let reg = InstrumentRegistry::with_default_catalog();
        assert_eq!(reg.get("nvda").unwrap().display_name, "NVIDIA");
        assert!(reg.contains(" aapl "));
        assert!(reg.get("ZZZZ").is_none());
    }

    #[test]
    fn unknown_symbols_get_an_explicit_marker() {
        let reg = InstrumentRegistry::with_default_catalog();
        let unknown = reg.resolve_or_unknown("zzzz");
        assert_eq!(unknown.symbol, "ZZZZ");
        assert_eq!(unknown.display_name, "Unknown instrument");
    }

    #[test]
    fn first_duplicate_wins() {
        let reg = InstrumentRegistry::from_instruments(vec![
            Instrument::new("AAPL", "Apple Inc"),
            Instrument::new("aapl", "Other"),
        ]);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("AAPL").unwrap().display_name, "Apple Inc");
    }

    #[test]
    fn search_ranks_exact_then_prefix_then_name() {
        let reg = InstrumentRegistry::from_instruments(vec![
            Instrument::new("AMDX", "Amdex Holdings"),
            Instrument::new("XAMD", "Cross"),
            Instrument::new("AMD", "AMD"),
            Instrument::new("KO", "Coca-Cola"),
        ]);
        let hits: Vec<_> = reg.search("amd", None).iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(hits, vec!["AMD", "AMDX", "XAMD"]);

        let hits: Vec<_> = reg.search("cola", None).iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(hits, vec!["KO"]);
        assert_eq!(reg.search("", Some(2)).len(), 2);
    }
}
