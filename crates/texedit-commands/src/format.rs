//! Display formatting for backend replies.

use serde_json::Value;
use texedit_link::JsonObject;

const SUMMARISE: &str = "summarise";

/// Renders a backend reply to `command` for display.
///
/// `summarise` replies become the summary followed by word-count statistics
/// and, when present, a timing breakdown; an `error` field short-circuits to
/// `Error: <message>`. Other commands show `result`, else `output`, else a
/// generic confirmation.
#[must_use]
pub fn format_response(command: &str, response: &JsonObject) -> String {
    if command == SUMMARISE {
        format_summary(response)
    } else {
        text_field(response, "result")
            .or_else(|| text_field(response, "output"))
            .map_or_else(
                || format!("Command '{command}' executed successfully"),
                str::to_owned,
            )
    }
}

fn text_field<'a>(object: &'a JsonObject, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

fn number_field(object: &JsonObject, key: &str) -> f64 {
    object.get(key).and_then(Value::as_f64).unwrap_or_default()
}

fn count_field(object: &JsonObject, key: &str) -> u64 {
    object.get(key).and_then(Value::as_u64).unwrap_or_default()
}

#[expect(
    clippy::float_arithmetic,
    reason = "compression ratio is shown as a percentage"
)]
fn format_summary(response: &JsonObject) -> String {
    if let Some(error) = response.get("error") {
        let message = error.as_str().map_or_else(|| error.to_string(), str::to_owned);
        return format!("Error: {message}");
    }

    let summary = text_field(response, "summary").unwrap_or_default();
    let mut text = String::from(summary);
    text.push_str(&format!(
        "\n\nSummary stats:\n- Original: {} words\n- Summary: {} words ({:.1}%)",
        count_field(response, "original_length"),
        count_field(response, "summary_length"),
        number_field(response, "compression_ratio") * 100.0,
    ));

    if let Some(performance) = response.get("performance").and_then(Value::as_object) {
        text.push_str(&format!(
            "\n\nPerformance:\n- Total time: {:.2}s\n- Tokenization: {:.2}s\n\
             - Generation: {:.2}s\n- Decoding: {:.2}s",
            number_field(performance, "total_time"),
            number_field(performance, "tokenization_time"),
            number_field(performance, "generation_time"),
            number_field(performance, "decoding_time"),
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[rstest]
    #[case::result(json!({"result": "Formal text", "output": "ignored"}), "Formal text")]
    #[case::output(json!({"output": "alpha, beta"}), "alpha, beta")]
    #[case::empty_result(json!({"result": "", "output": "fallback"}), "fallback")]
    #[case::nothing(json!({}), "Command 'tone' executed successfully")]
    fn generic_replies(#[case] reply: Value, #[case] expected: &str) {
        assert_eq!(format_response("tone", &object(reply)), expected);
    }

    #[test]
    fn summary_with_statistics() {
        let reply = object(json!({
            "summary": "Short.",
            "original_length": 120,
            "summary_length": 30,
            "compression_ratio": 0.25,
        }));
        assert_eq!(
            format_response("summarise", &reply),
            "Short.\n\nSummary stats:\n- Original: 120 words\n- Summary: 30 words (25.0%)"
        );
    }

    #[test]
    fn summary_with_performance() {
        let reply = object(json!({
            "summary": "Short.",
            "original_length": 10,
            "summary_length": 3,
            "compression_ratio": 0.333,
            "performance": {
                "total_time": 1.234,
                "tokenization_time": 0.01,
                "generation_time": 1.2,
                "decoding_time": 0.024,
            },
        }));
        let text = format_response("summarise", &reply);
        assert!(text.contains("3 words (33.3%)"), "{text}");
        assert!(text.ends_with(
            "Performance:\n- Total time: 1.23s\n- Tokenization: 0.01s\n\
             - Generation: 1.20s\n- Decoding: 0.02s"
        ));
    }

    #[test]
    fn summary_error_short_circuits() {
        let reply = object(json!({"error": "text too short", "summary": "ignored"}));
        assert_eq!(format_response("summarise", &reply), "Error: text too short");
    }
}
