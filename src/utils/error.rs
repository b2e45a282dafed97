/// Tails that carry nothing useful in a log line: response payloads and
/// captured backtraces.
const ELIDED_TAILS: [(&str, &str); 2] = [(" text: ", " text=<omitted>"), ("Stack backtrace:", "")];

/// Flatten a transport error for logs: hides explorer api keys, drops
/// elided tails, collapses whitespace and caps the length in characters.
pub fn compact_error_message(message: &str, max_len: usize) -> String {
    let mut head = redact_api_key(message);
    for (marker, replacement) in ELIDED_TAILS {
        if let Some(at) = head.find(marker) {
            head.truncate(at);
            head.push_str(replacement);
        }
    }
    let flat = head.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}...(truncated)", &flat[..cut]),
        None => flat,
    }
}

/// Replace the value of any `apikey=` query parameter with `***`.
pub fn redact_api_key(message: &str) -> String {
    const NEEDLE: &str = "apikey=";
    let mut out = String::with_capacity(message.len());
    let mut rest = message;
    while let Some(idx) = rest.to_ascii_lowercase().find(NEEDLE) {
        let value_start = idx + NEEDLE.len();
        out.push_str(&rest[..value_start]);
        out.push_str("***");
        let tail = &rest[value_start..];
        let value_end = tail
            .find(|c: char| c == '&' || c == ' ' || c == ')' || c == '"')
            .unwrap_or(tail.len());
        rest = &tail[value_end..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::{compact_error_message, redact_api_key};

    #[test]
    fn test_compact_error_message_elides_payload_and_backtrace() {
        let raw = "error sending request text: \"{...huge...}\"\nStack backtrace:\n 0: frame";
        let compact = compact_error_message(raw, 260);
        assert!(compact.contains("text=<omitted>"));
        assert!(!compact.contains("Stack backtrace"));
    }

    #[test]
    fn test_api_key_is_never_logged() {
        let raw = "HTTP 502 for https://api.etherscan.io/api?module=account&apikey=SECRET123&page=1";
        let redacted = redact_api_key(raw);
        assert!(!redacted.contains("SECRET123"));
        assert!(redacted.contains("apikey=***&page=1"));
    }

    #[test]
    fn test_compact_error_message_caps_length() {
        let raw = "x".repeat(1_000);
        let compact = compact_error_message(&raw, 32);
        assert!(compact.starts_with(&"x".repeat(32)));
        assert!(compact.ends_with("...(truncated)"));
    }

    #[test]
    fn test_truncation_respects_multibyte_text() {
        let compact = compact_error_message("réverté réverté", 4);
        assert_eq!(compact, "réve...(truncated)");
    }
}
