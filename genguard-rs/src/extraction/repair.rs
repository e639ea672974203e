//! Syntactic repairs for almost-JSON replies
//!
//! Rules run once each, in a fixed order. A rule is reported as applied only
//! when it changed the text. Key and value rules never touch text inside a
//! double-quoted string.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

/// A repair rule that rewrote part of a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairKind {
    /// `'` replaced with `"`
    SingleQuotes,

    /// Unquoted object keys wrapped in quotes
    BareKeys,

    /// Unquoted non-literal values wrapped in quotes
    BareValues,
}

static BARE_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([\{,]\s*)([A-Za-z_][A-Za-z0-9_]*)(\s*:)"#).expect("bare key pattern is valid")
});

static BARE_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(:\s*)([^\s"\[\{\}\]][^,\}\]"]*?)(\s*[,\}\]])"#).expect("bare value pattern is valid")
});

/// Apply every rule in order, returning the rewritten text and the rules that fired
pub fn apply(candidate: &str) -> (String, Vec<RepairKind>) {
    let mut repairs = Vec::new();
    let mut text = candidate.to_string();

    for (kind, rule) in [
        (RepairKind::SingleQuotes, normalize_quotes as fn(&str) -> String),
        (RepairKind::BareKeys, quote_bare_keys),
        (RepairKind::BareValues, quote_bare_values),
    ] {
        let rewritten = rule(&text);
        if rewritten != text {
            repairs.push(kind);
            text = rewritten;
        }
    }

    (text, repairs)
}

fn normalize_quotes(text: &str) -> String {
    text.replace('\'', "\"")
}

fn quote_bare_keys(text: &str) -> String {
    outside_strings(text, |segment| {
        BARE_KEY.replace_all(segment, "$1\"$2\"$3").into_owned()
    })
}

fn quote_bare_values(text: &str) -> String {
    outside_strings(text, |segment| {
        BARE_VALUE
            .replace_all(segment, |caps: &Captures| {
                let value = caps[2].trim_end();
                if is_json_scalar(value) {
                    caps[0].to_string()
                } else {
                    format!("{}\"{}\"{}", &caps[1], value, &caps[3])
                }
            })
            .into_owned()
    })
}

/// Run `rewrite` over each stretch of text between double-quoted strings.
/// String contents, escapes included, are copied through unchanged. An
/// unterminated string runs to the end of the text.
fn outside_strings(text: &str, rewrite: impl Fn(&str) -> String) -> String {
    let mut output = String::with_capacity(text.len());
    let mut segment_start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                output.push_str(&text[segment_start..=index]);
                segment_start = index + 1;
                in_string = false;
            }
        } else if ch == '"' {
            output.push_str(&rewrite(&text[segment_start..index]));
            segment_start = index;
            in_string = true;
        }
    }

    let tail = &text[segment_start..];
    if in_string {
        output.push_str(tail);
    } else {
        output.push_str(&rewrite(tail));
    }
    output
}

/// `true`, `false`, `null` and numbers stay unquoted
fn is_json_scalar(value: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(value).is_ok()
}
