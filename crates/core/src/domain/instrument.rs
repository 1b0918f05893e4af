use serde::{Deserialize, Serialize};

const AVATAR_BASE_URL: &str = "https://ui-avatars.com/api/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub display_name: String,
    pub logo_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

impl Instrument {
    pub fn new(symbol: &str, display_name: &str) -> Self {
        let symbol = normalize_symbol(symbol);
        let logo_ref = avatar_logo_ref(&symbol);
        Self {
            display_name: display_name.trim().to_string(),
            symbol,
            logo_ref,
            sector: None,
        }
    }

    pub fn with_logo(mut self, logo_ref: &str) -> Self {
        let logo_ref = logo_ref.trim();
        if !logo_ref.is_empty() {
            self.logo_ref = logo_ref.to_string();
        }
        self
    }

    pub fn with_sector(mut self, sector: &str) -> Self {
        self.sector = Some(sector.trim().to_string()).filter(|s| !s.is_empty());
        self
    }
}

/// Tickers are compared trimmed and uppercase everywhere in the crate.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

pub fn avatar_logo_ref(symbol: &str) -> String {
    format!("{AVATAR_BASE_URL}?name={symbol}&background=random")
}
