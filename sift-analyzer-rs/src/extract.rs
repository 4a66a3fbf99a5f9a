// sift-analyzer-rs/src/extract.rs
//
// JSON recovery for model output
// The remote model is asked for bare JSON but routinely wraps it in
// markdown fences, prose, or stray markup. One extraction strategy is
// chosen per response, then markup is stripped and the result parsed.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::AnalyzerError;

// Greedy brace match so nested objects stay intact.
static JSON_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

static MARKUP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Pull a JSON object out of a model response.
///
/// Tries a strict parse first, then falls back to the best candidate
/// snippet: a ```json fence, a bare ``` fence, or the outermost braced
/// region. Markup tags are stripped before the final parse.
pub fn extract_json(response: &str) -> Result<Value, AnalyzerError> {
    if let Ok(value) = serde_json::from_str::<Value>(response) {
        return Ok(value);
    }

    let snippet = if response.contains("```json") {
        fence_body(response, "```json")
    } else if response.contains("```") {
        fence_body(response, "```")
    } else if let Some(found) = JSON_OBJECT.find(response) {
        found.as_str()
    } else {
        response
    };

    let cleaned = MARKUP_TAG.replace_all(snippet, "");
    let cleaned = cleaned.trim();

    serde_json::from_str(cleaned)
        .map_err(|err| AnalyzerError::Extraction(err.to_string()))
}

/// Text between the opening fence and the next closing fence, or
/// everything after the opening fence if it is never closed.
fn fence_body<'a>(text: &'a str, fence: &str) -> &'a str {
    match text.split_once(fence) {
        Some((_, after)) => match after.split_once("```") {
            Some((body, _)) => body,
            None => after,
        },
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_json_passes_through() {
        let value = extract_json(r#"{"toxicity": {"score": 0.1}}"#).unwrap();
        assert_eq!(value["toxicity"]["score"], 0.1);
    }

    #[test]
    fn json_fence_is_unwrapped() {
        let response = "Here you go:\n```json\n{\"score\": 1}\n```\nDone.";
        let value = extract_json(response).unwrap();
        assert_eq!(value["score"], 1);
    }

    #[test]
    fn bare_fence_is_unwrapped() {
        let response = "```\n{\"score\": 2}\n```";
        let value = extract_json(response).unwrap();
        assert_eq!(value["score"], 2);
    }

    #[test]
    fn unterminated_fence_still_parses() {
        let response = "```json\n{\"score\": 3}";
        let value = extract_json(response).unwrap();
        assert_eq!(value["score"], 3);
    }

    #[test]
    fn braced_region_is_found_in_prose() {
        let response = "The analysis follows. {\"score\": 4} Hope that helps!";
        let value = extract_json(response).unwrap();
        assert_eq!(value["score"], 4);
    }

    #[test]
    fn nested_objects_survive_greedy_match() {
        let response = "result: {\"outer\": {\"inner\": true}} trailing";
        let value = extract_json(response).unwrap();
        assert_eq!(value["outer"]["inner"], true);
    }

    #[test]
    fn markup_tags_are_stripped() {
        let response = "<response>{\"score\": 5}</response>";
        let value = extract_json(response).unwrap();
        assert_eq!(value["score"], 5);
    }

    #[test]
    fn hopeless_output_is_an_error() {
        let err = extract_json("I cannot analyze that text.").unwrap_err();
        assert!(matches!(err, AnalyzerError::Extraction(_)));
    }

    #[test]
    fn fence_takes_priority_over_braces() {
        // A fenced block with broken JSON fails even though valid JSON
        // appears later; only one strategy is applied per response.
        let response = "```json\n{broken\n```\n{\"score\": 6}";
        assert!(extract_json(response).is_err());
    }
}
