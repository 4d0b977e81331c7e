use serde_json::Value;

use super::types::ModelPageOutput;

/// Turn a raw model response into a page output. Never fails: a response
/// without a JSON object becomes `RawText`.
pub fn parse_model_response(response: &str) -> ModelPageOutput {
    extract_json_candidate(response)
        .and_then(|candidate| serde_json::from_str::<Value>(candidate).ok())
        .filter(Value::is_object)
        .map(ModelPageOutput::Json)
        .unwrap_or_else(|| ModelPageOutput::RawText(response.to_string()))
}

/// A fenced ```json block if present, else the outermost `{ … }` span.
fn extract_json_candidate(response: &str) -> Option<&str> {
    if let Some(fenced) = extract_fenced_json(response) {
        return Some(fenced);
    }
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

fn extract_fenced_json(response: &str) -> Option<&str> {
    let json_start = response.find("```json")?;
    let content_start = json_start + "```json".len();
    let content_end = response[content_start..].find("```")?;
    Some(response[content_start..content_start + content_end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_block() {
        let response = "Here is the page:\n```json\n{\"holdings\": []}\n```\nDone.";
        assert_eq!(parse_model_response(response), ModelPageOutput::Json(json!({"holdings": []})));
    }

    #[test]
    fn bare_object_with_chatter() {
        let response = "Sure! {\"summary\": {\"currency\": \"CHF\"}} Hope this helps.";
        assert_eq!(
            parse_model_response(response),
            ModelPageOutput::Json(json!({"summary": {"currency": "CHF"}}))
        );
    }

    #[test]
    fn prose_is_raw_text() {
        let response = "This page only contains legal disclaimers.";
        assert_eq!(
            parse_model_response(response),
            ModelPageOutput::RawText(response.to_string())
        );
    }

    #[test]
    fn truncated_json_is_raw_text() {
        let response = "```json\n{\"holdings\": [{\"isin\": \"CH00\n```";
        assert!(!parse_model_response(response).is_structured());
    }

    #[test]
    fn unclosed_fence_falls_back_to_braces() {
        let response = "```json\n{\"holdings\": []}";
        assert_eq!(parse_model_response(response), ModelPageOutput::Json(json!({"holdings": []})));
    }

    #[test]
    fn top_level_array_is_not_a_statement() {
        let response = "```json\n[1, 2, 3]\n```";
        assert!(!parse_model_response(response).is_structured());
    }

    #[test]
    fn empty_response_is_raw_text() {
        assert_eq!(parse_model_response(""), ModelPageOutput::RawText(String::new()));
        assert!(!parse_model_response("} {").is_structured());
    }
}
