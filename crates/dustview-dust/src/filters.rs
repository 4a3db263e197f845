//! Reference filters: `{value|h}`, `{value|s}`, `{value|j}`, `{value|u}`,
//! `{value|uc}` and `{value|js}`.
//!
//! References are HTML-escaped unless `|s` is present. An explicit `|h`
//! replaces the automatic escape rather than doubling it. Unknown filter
//! names are ignored.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

/// Formats a value the way a script runtime would stringify it.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Renders `value` through the filter chain.
pub fn apply(value: &Value, filters: &[String]) -> String {
    let mut text = if filters.iter().any(|f| f == "js") {
        value.to_string()
    } else {
        display(value)
    };

    let mut auto_escape = true;
    for filter in filters {
        match filter.as_str() {
            "s" => auto_escape = false,
            "h" => {
                text = escape_html(&text);
                auto_escape = false;
            }
            "j" => text = escape_js(&text),
            "u" => text = encode_uri(&text),
            "uc" => text = encode_uri_component(&text),
            _ => {}
        }
    }

    if auto_escape {
        escape_html(&text)
    } else {
        text
    }
}

pub fn escape_html(input: &str) -> String {
    html_escape::encode_quoted_attribute(input).into_owned()
}

pub fn escape_js(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}

/// Everything `encodeURIComponent` escapes: all but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// `encodeURI` additionally keeps the reserved characters.
const URI: &AsciiSet = &URI_COMPONENT
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'#');

pub fn encode_uri(input: &str) -> String {
    utf8_percent_encode(input, URI).to_string()
}

pub fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filters(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_display_values() {
        assert_eq!(display(&json!(null)), "");
        assert_eq!(display(&json!(true)), "true");
        assert_eq!(display(&json!(42)), "42");
        assert_eq!(display(&json!(2.0)), "2");
        assert_eq!(display(&json!(19.99)), "19.99");
        assert_eq!(display(&json!([1, "a", null])), "1,a,");
        assert_eq!(display(&json!({"a": 1})), "[object Object]");
    }

    #[test]
    fn test_default_escapes_html() {
        let escaped = apply(&json!("<b>\"x\" & 'y'</b>"), &[]);
        assert!(escaped.starts_with("&lt;b&gt;&quot;x&quot; &amp; "));
        assert!(escaped.ends_with("&lt;/b&gt;"));
        assert!(!escaped.contains('\''));
    }

    #[test]
    fn test_s_disables_escape() {
        assert_eq!(apply(&json!("<b>"), &filters(&["s"])), "<b>");
    }

    #[test]
    fn test_explicit_h_escapes_once() {
        assert_eq!(apply(&json!("a&b"), &filters(&["h"])), "a&amp;b");
    }

    #[test]
    fn test_js_escape() {
        assert_eq!(
            apply(&json!("say \"hi\"\n"), &filters(&["j", "s"])),
            "say \\\"hi\\\"\\n"
        );
    }

    #[test]
    fn test_json_stringify() {
        assert_eq!(apply(&json!({"a": [1]}), &filters(&["js", "s"])), r#"{"a":[1]}"#);
    }

    #[test]
    fn test_uri_encoding() {
        assert_eq!(encode_uri("a b/c?d=é"), "a%20b/c?d=%C3%A9");
        assert_eq!(encode_uri_component("a b/c?d"), "a%20b%2Fc%3Fd");
        assert_eq!(encode_uri("it's (ok)!~*"), "it's%20(ok)!~*");
        assert_eq!(encode_uri_component("x=1&y=#"), "x%3D1%26y%3D%23");
    }

    #[test]
    fn test_unknown_filter_ignored() {
        assert_eq!(apply(&json!("x"), &filters(&["nope"])), "x");
    }
}
