//! Helpers shared by the outbound vendor clients.

use serde_json::Value;

const MAX_ERROR_BODY: usize = 512;

/// Pulls a human readable message out of a vendor error body.
///
/// Understands `{"message": ..}`, `{"errors": [..]}`, `{"error": ".."}` and
/// `{"error": {"message": ..}}`. Non-JSON bodies are returned truncated;
/// blank bodies yield `None`.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Ok(payload) = serde_json::from_str::<Value>(trimmed) else {
        return Some(truncate_text(trimmed, MAX_ERROR_BODY));
    };

    let nested = payload
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str);
    let flat = payload
        .get("message")
        .or_else(|| payload.get("error"))
        .and_then(Value::as_str);
    let listed = payload.get("errors").and_then(Value::as_array).map(|rows| {
        rows.iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("; ")
    });

    nested
        .or(flat)
        .map(str::to_string)
        .or(listed)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .or_else(|| Some(truncate_text(trimmed, MAX_ERROR_BODY)))
}

pub(crate) fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
