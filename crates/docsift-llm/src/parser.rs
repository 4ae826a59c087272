//! Parse LLM output into field values

use crate::LlmError;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Parse a model response into a field → value map
///
/// Only `fields` are kept; unknown keys are ignored and missing keys are
/// left out (the caller treats them as null). Strings are trimmed and blank
/// strings become null; numbers and booleans are rendered as text.
///
/// # Errors
/// Returns error if the response holds no JSON object
pub fn parse_field_values(
    response: &str,
    fields: &[&str],
) -> Result<HashMap<String, Option<String>>, LlmError> {
    let json_str = extract_json(response)?;

    let json: Value = serde_json::from_str(json_str)
        .map_err(|e| LlmError::InvalidResponse(format!("JSON parse error: {}", e)))?;

    let object = json
        .as_object()
        .ok_or_else(|| LlmError::InvalidResponse("Expected JSON object".to_string()))?;

    let mut values = HashMap::with_capacity(fields.len());
    for field in fields {
        let Some(raw) = object.get(*field) else {
            continue;
        };
        values.insert(field.to_string(), render(raw));
    }

    let ignored = object.keys().filter(|k| !fields.contains(&k.as_str())).count();
    if ignored > 0 {
        debug!(ignored, "response carried keys outside the requested fields");
    }

    Ok(values)
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            let blank = trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null");
            (!blank).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(render).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Extract the JSON object from a response, handling markdown code blocks
/// and chatter around the object
fn extract_json(response: &str) -> Result<&str, LlmError> {
    let trimmed = response.trim();

    let body = if let Some(rest) = trimmed.strip_prefix("```") {
        // Skip the fence line (``` or ```json) and the closing fence
        let after_fence = rest.split_once('\n').map_or("", |(_, body)| body);
        after_fence.trim_end().trim_end_matches("```")
    } else {
        trimmed
    };

    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&body[start..=end]),
        _ => Err(LlmError::InvalidResponse(
            "No JSON object in response".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_object() {
        let values = parse_field_values(
            r#"{"cpf": "123.456.789-00", "nome": null, "extra": "x"}"#,
            &["cpf", "nome", "email"],
        )
        .unwrap();

        assert_eq!(values.len(), 2);
        assert_eq!(values["cpf"].as_deref(), Some("123.456.789-00"));
        assert_eq!(values["nome"], None);
        assert!(!values.contains_key("email"));
        assert!(!values.contains_key("extra"));
    }

    #[test]
    fn test_parse_json_with_markdown_wrapper() {
        let response = "```json\n{\"data\": \"01/02/2024\"}\n```";
        let values = parse_field_values(response, &["data"]).unwrap();
        assert_eq!(values["data"].as_deref(), Some("01/02/2024"));
    }

    #[test]
    fn test_parse_with_surrounding_chatter() {
        let response = "Here you go: {\"total\": 1234.5} hope this helps";
        let values = parse_field_values(response, &["total"]).unwrap();
        assert_eq!(values["total"].as_deref(), Some("1234.5"));
    }

    #[test]
    fn test_blank_strings_become_null() {
        let values = parse_field_values(r#"{"a": "  ", "b": "null", "c": []}"#, &["a", "b", "c"]).unwrap();
        assert_eq!(values["a"], None);
        assert_eq!(values["b"], None);
        assert_eq!(values["c"], None);
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            parse_field_values("[1, 2]", &["a"]),
            Err(LlmError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_field_values("no json here", &["a"]),
            Err(LlmError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_field_values("{not valid}", &["a"]),
            Err(LlmError::InvalidResponse(_))
        ));
    }
}
