//! Recovery of a JSON array from free-form model output
//!
//! Model replies are asked to be a bare JSON array but routinely arrive
//! wrapped in a code fence, surrounded by prose, or with every escape
//! doubled. [`sanitize_response`] undoes those three failure modes.
//!
//! Valid input takes the fast path and is returned byte-for-byte (after
//! trimming, fence stripping and slicing). Only text that fails to parse is
//! rewritten, and the rewrite is not re-verified: the caller's parse is the
//! authoritative one.

use serde::de::IgnoredAny;

/// Normalize a raw model reply into JSON array text
///
/// Beyond un-escaping and dropping control characters, the repair pass also
/// escapes raw tab/LF/CR found inside string literals, both before and after
/// the un-escape.
pub fn sanitize_response(raw: &str) -> String {
    let text = slice_array(strip_code_fence(raw.trim()));

    if parses(text) {
        return text.to_string();
    }

    tracing::warn!("Model reply is not valid JSON, attempting repair ({} chars)", text.len());

    // Raw newlines inside string values are the most common defect; try the
    // minimal fix before touching escapes.
    let escaped = escape_controls_in_strings(text);
    if parses(&escaped) {
        return escaped;
    }

    let unescaped = unescape_once(text);
    let filtered = drop_control_chars(&unescaped);
    escape_controls_in_strings(&filtered).trim().to_string()
}

fn parses(text: &str) -> bool {
    serde_json::from_str::<IgnoredAny>(text).is_ok()
}

/// Remove a surrounding ```` ``` ```` or ```` ```json ```` fence
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    let rest = rest
        .strip_suffix("\r\n")
        .or_else(|| rest.strip_suffix('\n'))
        .unwrap_or(rest);
    rest.trim()
}

/// Narrow to the span between the first `[` and the last `]`
fn slice_array(text: &str) -> &str {
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

/// Undo one level of string escaping: `\"`, `\\`, `\n`, `\r`, `\t`
fn unescape_once(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let replacement = match chars.peek() {
            Some('n') => Some('\n'),
            Some('r') => Some('\r'),
            Some('t') => Some('\t'),
            Some('\\') => Some('\\'),
            Some('"') => Some('"'),
            _ => None,
        };
        match replacement {
            Some(r) => {
                out.push(r);
                chars.next();
            }
            None => out.push(c),
        }
    }

    out
}

/// Drop control characters other than tab, line feed and carriage return
fn drop_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| (*c as u32) >= 32 || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

/// Escape raw tab/LF/CR that sit inside string literals
fn escape_controls_in_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escape_next = false;

    for c in text.chars() {
        if escape_next {
            escape_next = false;
            out.push(c);
            continue;
        }
        match c {
            '\\' if in_string => {
                escape_next = true;
                out.push(c);
            }
            '"' => {
                in_string = !in_string;
                out.push(c);
            }
            '\n' if in_string => out.push_str("\\n"),
            '\r' if in_string => out.push_str("\\r"),
            '\t' if in_string => out.push_str("\\t"),
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_valid_array_unchanged() {
        let input = r###"[{"title":"Auth","description":"## Overview\n\n- **Login**"}]"###;
        assert_eq!(sanitize_response(input), input);
    }

    #[test]
    fn test_strips_json_fence() {
        assert_eq!(sanitize_response("```json\n[{\"a\":1}]\n```"), r#"[{"a":1}]"#);
    }

    #[test]
    fn test_strips_bare_fence() {
        assert_eq!(sanitize_response("```\n[1, 2]\n```\n"), "[1, 2]");
    }

    #[test]
    fn test_slices_surrounding_prose() {
        assert_eq!(sanitize_response("Here you go: [1,2,3] thanks"), "[1,2,3]");
    }

    #[test]
    fn test_fence_and_prose() {
        let input = "Sure! Here are the epics:\n```json\n[{\"title\":\"A\"}]\n```\nLet me know.";
        assert_eq!(sanitize_response(input), r#"[{"title":"A"}]"#);
    }

    #[test]
    fn test_repairs_over_escaped_array() {
        let input = r#"[{\"a\":\"line1\\nline2\"}]"#;
        let repaired = sanitize_response(input);

        let parsed: Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(parsed[0]["a"], "line1\nline2");
    }

    #[test]
    fn test_repairs_raw_newlines_in_strings() {
        let input = "[{\"description\": \"## Overview\n\n- item\"}]";
        let repaired = sanitize_response(input);

        let parsed: Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(parsed[0]["description"], "## Overview\n\n- item");
    }

    #[test]
    fn test_drops_stray_control_chars() {
        let input = "[{\\\"a\\\":\\\"x\u{0007}y\\\"}]";
        let repaired = sanitize_response(input);

        assert!(!repaired.contains('\u{0007}'));
        let parsed: Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(parsed[0]["a"], "xy");
    }

    #[test]
    fn test_prose_without_brackets_is_trimmed_only() {
        let input = "  I cannot help with that request.  ";
        assert_eq!(sanitize_response(input), "I cannot help with that request.");
    }

    #[test]
    fn test_reversed_brackets_not_sliced() {
        assert_eq!(sanitize_response("] nothing ["), "] nothing [");
    }

    #[test]
    fn test_unescape_once() {
        assert_eq!(unescape_once(r#"a\\nb"#), r#"a\nb"#);
        assert_eq!(unescape_once(r#"\"q\""#), r#""q""#);
        assert_eq!(unescape_once(r#"a\nb"#), "a\nb");
        assert_eq!(unescape_once(r#"é"#), r#"é"#);
    }
}
