use anyhow::Context;
use serde_json::Value;

/// Pulls the JSON document out of a provider body that may be wrapped in Markdown
/// fences or surrounded by prose.
pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Remove Markdown fences (```json ... ``` or ``` ... ```).
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    // Best-effort extraction: whichever of '[' or '{' opens first, up to its last closer.
    let start = trimmed.find(['[', '{'])?;
    let closer = if trimmed[start..].starts_with('[') { ']' } else { '}' };
    let end = trimmed.rfind(closer)?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

pub fn parse_payload(text: &str) -> anyhow::Result<Value> {
    if let Ok(v) = serde_json::from_str::<Value>(text) {
        return Ok(v);
    }
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    serde_json::from_str::<Value>(&json_str)
        .with_context(|| format!("provider output is not valid JSON: {json_str}"))
}
