//! Response parsing
//!
//! LLM completions are free-form text. We look for a single JSON array in it
//! and hand back its object elements.

use serde_json::Value;

use super::OracleError;
use crate::models::{DraftProposal, OracleSuggestion, SuggestionEntry};

/// Finds the JSON array in a completion.
///
/// Tries the whole text first. Otherwise scans each `[` in turn and takes the
/// first array that decodes from there, ignoring whatever follows it. This
/// covers answers wrapped in markdown fences or surrounded by prose.
pub fn extract_json_array(text: &str) -> Result<Vec<Value>, OracleError> {
    let trimmed = text.trim();

    if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
        return match parsed {
            Value::Array(items) => Ok(items),
            other => Err(OracleError::MalformedResponse(format!(
                "expected a JSON array, got {}",
                json_kind(&other)
            ))),
        };
    }

    trimmed
        .match_indices('[')
        .find_map(|(offset, _)| first_array_at(&trimmed[offset..]))
        .ok_or_else(|| OracleError::MalformedResponse("no JSON array in response".to_string()))
}

/// Decodes one leading JSON value and keeps it only if it is an array
fn first_array_at(text: &str) -> Option<Vec<Value>> {
    match serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .next()?
    {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Parses a schedule completion into allow-listed entries
pub fn parse_schedule_response(text: &str) -> Result<OracleSuggestion, OracleError> {
    let entries = extract_json_array(text)?
        .iter()
        .filter_map(Value::as_object)
        .map(SuggestionEntry::from_object)
        .collect();
    Ok(OracleSuggestion::new(entries))
}

/// Parses a suggestion completion into raw draft objects
pub fn parse_suggestion_response(text: &str) -> Result<Vec<DraftProposal>, OracleError> {
    Ok(extract_json_array(text)?
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_array() {
        let items = extract_json_array(r#"[{"id": 1}, {"id": 2}]"#).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_array_inside_prose_and_fences() {
        let text = "Here is the optimized schedule:\n```json\n[{\"id\": 1, \"priority\": \"high\"}]\n```\nLet me know!";
        let suggestion = parse_schedule_response(text).unwrap();
        assert_eq!(suggestion.entries.len(), 1);
        assert_eq!(suggestion.entries[0].priority, Some(json!("high")));
    }

    #[test]
    fn test_brackets_in_trailing_prose() {
        let text = "[{\"id\": 1, \"priority\": \"high\"}]\nNote: I kept priorities in [low, high].";
        let suggestion = parse_schedule_response(text).unwrap();
        assert_eq!(suggestion.entries.len(), 1);
        assert_eq!(suggestion.entries[0].priority, Some(json!("high")));
    }

    #[test]
    fn test_brackets_in_leading_prose() {
        let text = "Tasks [updated]:\n[{\"id\": 2, \"due_date\": \"2024-07-01\"}]";
        let suggestion = parse_schedule_response(text).unwrap();
        assert_eq!(suggestion.entries.len(), 1);
        assert_eq!(suggestion.entries[0].due_date, Some(json!("2024-07-01")));
    }

    #[test]
    fn test_object_is_malformed() {
        let err = extract_json_array(r#"{"id": 1}"#).unwrap_err();
        assert!(matches!(err, OracleError::MalformedResponse(_)));
    }

    #[test]
    fn test_no_json_is_malformed() {
        let err = extract_json_array("I cannot help with that.").unwrap_err();
        assert!(matches!(err, OracleError::MalformedResponse(_)));

        let err = extract_json_array("[not json]").unwrap_err();
        assert!(matches!(err, OracleError::MalformedResponse(_)));
    }

    #[test]
    fn test_non_object_elements_dropped() {
        let drafts = parse_suggestion_response(r#"[1, "two", {"title": "Three"}, null]"#).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].get("title"), Some(&json!("Three")));
    }
}
