//! JSON extraction from model responses.
//!
//! Models are instructed to respond with JSON only, but frequently wrap the
//! object in a fenced code block anyway. Anything unparseable after fence
//! stripping counts as a service failure for the calling engine.

/// Extract the JSON payload from a model response, stripping an optional
/// ```` ``` ````/```` ```json ```` fence.
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(rest) = trimmed.strip_prefix("```json") {
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
    }

    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_passes_through() {
        let raw = r#"{"category": "payment"}"#;
        assert_eq!(extract_json(raw), raw);
    }

    #[test]
    fn json_fence_is_stripped() {
        let raw = "```json\n{\"category\": \"payment\"}\n```";
        assert_eq!(extract_json(raw), "{\"category\": \"payment\"}");
    }

    #[test]
    fn bare_fence_is_stripped() {
        let raw = "```\n{\"similarity\": 0.4}\n```";
        assert_eq!(extract_json(raw), "{\"similarity\": 0.4}");
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let raw = "  \n```json\n{\"a\": 1}\n```\n  ";
        assert_eq!(extract_json(raw), "{\"a\": 1}");
    }
}
