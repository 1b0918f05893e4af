//! Normalization of advisory provider payloads into [`Strategy`] values.
//!
//! The provider is best-effort: fields may be missing, null, or carry a different
//! shape than expected. Every accessor here falls back to an empty string or an
//! empty list instead of failing, so the only way a payload yields nothing is when
//! it contains no strategy objects at all.

use crate::domain::instrument::normalize_symbol;
use crate::domain::strategy::{Recommendations, Strategy, Swot, TradeIdea};
use serde_json::{Map, Value};

/// Keys that mark a bare object as a strategy rather than a status envelope such as
/// `{"error": ...}` or `{"message": ...}`.
const STRATEGY_KEYS: [&str; 6] = ["name", "title", "commentary", "description", "swot", "recommendations"];

/// Accepts, in order of preference: a JSON array of strategies, an object with a
/// `strategies` array, or a single strategy object.
pub fn normalize_strategies(payload: &Value) -> Vec<Strategy> {
    let items: &[Value] = match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => match obj.get("strategies") {
            Some(Value::Array(items)) => items.as_slice(),
            Some(_) => &[],
            None if looks_like_strategy(obj) => std::slice::from_ref(payload),
            None => &[],
        },
        _ => &[],
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(normalize_strategy)
        .collect()
}

fn looks_like_strategy(obj: &Map<String, Value>) -> bool {
    STRATEGY_KEYS
        .iter()
        .any(|k| obj.get(*k).is_some_and(|v| !v.is_null()))
}

fn normalize_strategy(obj: &Map<String, Value>) -> Strategy {
    Strategy {
        name: text_field(obj, &["name", "title"]),
        commentary: text_field(obj, &["commentary", "description"]),
        swot: normalize_swot(obj),
        recommendations: normalize_recommendations(obj.get("recommendations")),
        sectors: normalize_list(obj.get("sectors")),
    }
}

fn normalize_swot(obj: &Map<String, Value>) -> Swot {
    // Older payloads flatten the SWOT quadrants onto the strategy itself.
    let source = match obj.get("swot") {
        Some(Value::Object(swot)) => swot,
        _ => obj,
    };

    Swot {
        strengths: text_field(source, &["strengths", "strength"]),
        weaknesses: text_field(source, &["weaknesses", "weakness"]),
        opportunities: text_field(source, &["opportunities", "opportunity"]),
        threats: text_field(source, &["threats", "threat"]),
    }
}

fn normalize_recommendations(value: Option<&Value>) -> Recommendations {
    match value {
        Some(Value::Object(obj)) => Recommendations {
            buy: normalize_ideas(obj.get("buy")),
            sell: normalize_ideas(obj.get("sell")),
        },
        // A bare list carries no direction; it is a list of names to buy.
        Some(list @ Value::Array(_)) => Recommendations {
            buy: normalize_ideas(Some(list)),
            sell: Vec::new(),
        },
        _ => Recommendations::default(),
    }
}

fn normalize_ideas(value: Option<&Value>) -> Vec<TradeIdea> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(ticker) => Some(TradeIdea {
                ticker: normalize_symbol(ticker),
                reason: String::new(),
            }),
            Value::Object(obj) => Some(TradeIdea {
                ticker: normalize_symbol(&text_field(obj, &["ticker", "symbol"])),
                reason: text_field(obj, &["reason", "rationale"]),
            }),
            _ => None,
        })
        .filter(|idea| !idea.ticker.is_empty())
        .collect()
}

fn normalize_list(value: Option<&Value>) -> Vec<String> {
    let out: Vec<String> = match value {
        Some(Value::Array(items)) => items.iter().map(text).collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    out.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .map(text)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_full_strategy() {
        let payload = json!([{
            "name": "EV Transition",
            "commentary": "Rotate into EV names.",
            "swot": {
                "strengths": "s", "weaknesses": "w",
                "opportunities": "o", "threats": "t"
            },
            "sectors": ["EV", "Technology"],
            "recommendations": {
                "buy": [{"ticker": "tsla", "reason": "+3.2% uptrend"}],
                "sell": [{"ticker": "XOM", "reason": "-1.8% with ESG concerns"}]
            }
        }]);

        let out = normalize_strategies(&payload);
        assert_eq!(out.len(), 1);
        let s = &out[0];
        assert_eq!(s.name, "EV Transition");
        assert_eq!(s.swot.threats, "t");
        assert_eq!(s.sectors, vec!["EV", "Technology"]);
        assert_eq!(s.recommendations.buy[0].ticker, "TSLA");
        assert_eq!(s.recommendations.sell[0].reason, "-1.8% with ESG concerns");
    }

    #[test]
    fn missing_fields_default_to_empty_never_null() {
        let out = normalize_strategies(&json!([{"name": "Bare", "swot": null}]));
        assert_eq!(out.len(), 1);
        let s = &out[0];
        assert_eq!(s.commentary, "");
        assert_eq!(s.swot, Swot::default());
        assert!(s.recommendations.buy.is_empty());
        assert!(s.recommendations.sell.is_empty());
        assert!(s.sectors.is_empty());

        let v = serde_json::to_value(s).unwrap();
        assert_eq!(v["swot"]["strengths"], json!(""));
        assert_eq!(v["recommendations"]["buy"], json!([]));
    }

    #[test]
    fn accepts_wrapped_and_single_object_payloads() {
        let wrapped = json!({"strategies": [{"name": "A"}, {"name": "B"}]});
        assert_eq!(normalize_strategies(&wrapped).len(), 2);

        let single = json!({"name": "Only"});
        let out = normalize_strategies(&single);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Only");
    }

    #[test]
    fn status_envelopes_are_not_strategies() {
        assert!(normalize_strategies(&json!({"error": "rate limited"})).is_empty());
        assert!(normalize_strategies(&json!({"message": "No data found"})).is_empty());
        assert!(normalize_strategies(&json!({"strategies": "oops"})).is_empty());
        assert!(normalize_strategies(&json!({"strategies": null, "name": "x"})).is_empty());
        assert!(normalize_strategies(&json!({"name": null})).is_empty());

        let titled = normalize_strategies(&json!({"title": "Value tilt", "error": "partial"}));
        assert_eq!(titled.len(), 1);
        assert_eq!(titled[0].name, "Value tilt");
    }

    #[test]
    fn scalars_and_non_object_items_yield_nothing() {
        assert!(normalize_strategies(&json!("AI analysis temporarily unavailable")).is_empty());
        assert!(normalize_strategies(&json!([1, "two", null])).is_empty());
    }

    #[test]
    fn flat_ui_shape_is_understood() {
        let payload = json!([{
            "id": 1,
            "name": "Strategy 1",
            "description": "Focus on the EV market.",
            "strength": "Strong market position",
            "weakness": "Volatile sectors",
            "opportunity": "EV growth",
            "threat": "Regulation",
            "recommendations": ["NVDA", "TSLA"]
        }]);

        let s = &normalize_strategies(&payload)[0];
        assert_eq!(s.commentary, "Focus on the EV market.");
        assert_eq!(s.swot.strengths, "Strong market position");
        assert_eq!(s.swot.threats, "Regulation");
        let buys: Vec<_> = s.recommendations.buy.iter().map(|i| i.ticker.as_str()).collect();
        assert_eq!(buys, vec!["NVDA", "TSLA"]);
        assert!(s.recommendations.sell.is_empty());
    }

    #[test]
    fn wrong_typed_fields_and_tickerless_ideas_are_tolerated() {
        let payload = json!([{
            "name": 42,
            "commentary": ["not", "text"],
            "sectors": "AI, Cloud ,",
            "recommendations": {
                "buy": [{"reason": "no ticker"}, {"symbol": "amd"}, 7],
                "sell": "META"
            }
        }]);

        let s = &normalize_strategies(&payload)[0];
        assert_eq!(s.name, "42");
        assert_eq!(s.commentary, "");
        assert_eq!(s.sectors, vec!["AI", "Cloud"]);
        assert_eq!(s.recommendations.buy.len(), 1);
        assert_eq!(s.recommendations.buy[0].ticker, "AMD");
        assert!(s.recommendations.sell.is_empty());
    }
}
