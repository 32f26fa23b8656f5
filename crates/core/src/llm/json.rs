use crate::domain::contract::LlmDecision;
use crate::domain::decision::Decision;
use crate::llm::error::UpstreamError;

/// Best-effort normalization of model output into a JSON string.
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

    // Fallback: first '{' to last '}'.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

/// Parse model output into a validated [`Decision`]. Syntax failures and
/// contract failures are distinct error kinds; callers map them to
/// different responses.
pub fn parse_decision(text: &str) -> Result<Decision, UpstreamError> {
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());

    let value =
        serde_json::from_str::<serde_json::Value>(&json_str).map_err(|_| UpstreamError::Parse {
            raw: text.to_string(),
        })?;

    let parsed =
        serde_json::from_value::<LlmDecision>(value).map_err(|err| UpstreamError::Structure {
            detail: err.to_string(),
        })?;

    parsed
        .validate_and_into_decision()
        .map_err(|err| UpstreamError::Structure {
            detail: format!("{err:#}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision::Verdict;
    use serde_json::json;

    fn valid_decision_json() -> String {
        json!({
            "decision": "BUY",
            "confidence": 75,
            "reasoning": ["a", "b", "c"],
            "suggestion": "Go for it"
        })
        .to_string()
    }

    #[test]
    fn extract_json_handles_fenced_blocks() {
        let body = "{\"a\":1}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract_json(&fenced), Some(body.to_string()));

        let bare_fence = format!("```\n{body}\n```");
        assert_eq!(extract_json(&bare_fence), Some(body.to_string()));
    }

    #[test]
    fn extract_json_falls_back_to_braces() {
        let s = "prefix {\"a\":1} suffix";
        assert_eq!(extract_json(s), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn extract_json_gives_up_without_braces() {
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn parses_plain_decision() {
        let decision = parse_decision(&valid_decision_json()).unwrap();
        assert_eq!(decision.decision, Verdict::Buy);
        assert_eq!(decision.confidence, 75);
    }

    #[test]
    fn parses_fenced_decision() {
        let fenced = format!("```json\n{}\n```", valid_decision_json());
        let decision = parse_decision(&fenced).unwrap();
        assert_eq!(decision.decision, Verdict::Buy);
        assert_eq!(decision.suggestion, "Go for it");
    }

    #[test]
    fn malformed_output_is_a_parse_error() {
        let err = parse_decision("I think you should buy it!").unwrap_err();
        assert!(matches!(err, UpstreamError::Parse { .. }));

        let err = parse_decision("{\"decision\": \"BUY\",").unwrap_err();
        assert!(matches!(err, UpstreamError::Parse { .. }));
    }

    #[test]
    fn invalid_enum_is_a_structure_error() {
        let text = json!({
            "decision": "MAYBE",
            "confidence": 50,
            "reasoning": ["a", "b", "c"],
            "suggestion": "hm"
        })
        .to_string();
        let err = parse_decision(&text).unwrap_err();
        assert!(matches!(err, UpstreamError::Structure { .. }));
    }

    #[test]
    fn non_sequence_reasoning_is_a_structure_error() {
        let text = json!({
            "decision": "BUY",
            "confidence": 75,
            "reasoning": "not a list",
            "suggestion": "Go for it"
        })
        .to_string();
        let err = parse_decision(&text).unwrap_err();
        assert!(matches!(err, UpstreamError::Structure { .. }));
    }

    #[test]
    fn missing_suggestion_is_a_structure_error() {
        let text = json!({
            "decision": "BUY",
            "confidence": 75,
            "reasoning": ["a", "b", "c"]
        })
        .to_string();
        let err = parse_decision(&text).unwrap_err();
        assert!(matches!(err, UpstreamError::Structure { .. }));
    }
}
