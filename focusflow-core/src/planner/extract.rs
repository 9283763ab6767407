//! Tolerant JSON extraction from free-text model output.
//!
//! Models often wrap the requested object in prose or markdown fences, and
//! sometimes add brace-laden text after it. The extracted object is the
//! first `{` that starts a complete JSON object, ending where that object
//! ends.

use crate::error::{Error, Result};
use serde_json::{Deserializer, Value};

/// Slice of `raw` holding the first complete JSON object.
pub fn extract_json_object(raw: &str) -> Result<&str> {
    let mut first_error = None;

    for (start, _) in raw.match_indices('{') {
        let mut stream = Deserializer::from_str(&raw[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(_))) => {
                let end = start + stream.byte_offset();
                return Ok(&raw[start..end]);
            }
            Some(Err(e)) if first_error.is_none() => first_error = Some(e),
            _ => {}
        }
    }

    Err(match first_error {
        Some(e) => Error::Llm(format!("model response JSON is malformed: {e}")),
        None => Error::Llm("model response did not contain a JSON object".to_string()),
    })
}

/// Parse a JSON object out of a model response.
///
/// The whole response is tried first, then the first embedded object.
/// Anything that is not a JSON object is an [`Error::Llm`].
pub fn parse_json_object(raw: &str) -> Result<Value> {
    let parsed = match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value) => value,
        Err(_) => {
            let extracted = extract_json_object(raw)?;
            serde_json::from_str::<Value>(extracted)
                .map_err(|e| Error::Llm(format!("model response JSON is malformed: {e}")))?
        }
    };

    if !parsed.is_object() {
        return Err(Error::Llm(
            "model response must be a JSON object".to_string(),
        ));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_json() {
        let value = parse_json_object(r#"{"projectName":"Spanish","tasks":[]}"#).unwrap();
        assert_eq!(value["projectName"], "Spanish");
    }

    #[test]
    fn test_json_wrapped_in_prose_and_fences() {
        let raw = "Sure! Here is your plan:\n```json\n{\"projectName\": \"Marathon\", \"tasks\": [{\"title\": \"Run\"}]}\n```\nGood luck!";
        let value = parse_json_object(raw).unwrap();
        assert_eq!(value["projectName"], "Marathon");
        assert_eq!(value["tasks"][0]["title"], "Run");
    }

    #[test]
    fn test_no_json_present() {
        let err = parse_json_object("I cannot help with that.").unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_json_object("plan: {\"projectName\": \"Broken\", tasks: [}").unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }

    #[test]
    fn test_reversed_braces() {
        assert!(extract_json_object("} nothing {").is_err());
    }

    #[test]
    fn test_top_level_array_rejected() {
        assert!(matches!(parse_json_object("[1, 2, 3]"), Err(Error::Llm(_))));
    }

    #[test]
    fn test_trailing_prose_with_braces_is_ignored() {
        let raw = "Here is the plan: {\"projectName\":\"Spanish\",\"tasks\":[{\"title\":\"Verbs\"}]}\nTip: reply with {\"more\": true} for more.";
        let value = parse_json_object(raw).unwrap();
        assert_eq!(value["projectName"], "Spanish");
        assert_eq!(value["tasks"][0]["title"], "Verbs");
        assert!(value.get("more").is_none());
    }

    #[test]
    fn test_braces_inside_strings() {
        let raw = "ok {\"projectName\": \"Use {curly} \\\"quotes\\\"\", \"tasks\": []} } trailing";
        let extracted = extract_json_object(raw).unwrap();
        assert!(extracted.starts_with('{') && extracted.ends_with("[]}"));
        let value = parse_json_object(raw).unwrap();
        assert_eq!(value["projectName"], "Use {curly} \"quotes\"");
    }

    #[test]
    fn test_brace_prose_before_the_object() {
        let raw = "Replace {goal} below:\n{\"projectName\": \"Run\", \"tasks\": []}";
        assert_eq!(parse_json_object(raw).unwrap()["projectName"], "Run");
    }
}
