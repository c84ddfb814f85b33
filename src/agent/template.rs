//! Placeholder substitution for instructions and queries
//!
//! `<<key>>` is replaced with the value stored under `key`. Strings are inserted as-is,
//! other JSON values as their JSON text. Values are trimmed.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

/// Replacement for keys missing from the data
pub const DEFAULT_FALLBACK: &str = "(Not Available)";

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<<(.*?)>>").unwrap());

/// Substitute every `<<key>>` in `template`; unknown keys become `fallback`.
pub fn render(template: &str, data: &Map<String, Value>, fallback: &str) -> String {
    PLACEHOLDER_PATTERN
        .replace_all(template, |caps: &Captures| {
            let value: Cow<'_, str> = match data.get(&caps[1]) {
                Some(Value::String(s)) => Cow::Borrowed(s.as_str()),
                Some(other) => Cow::Owned(other.to_string()),
                None => Cow::Borrowed(fallback),
            };
            value.trim().to_string()
        })
        .into_owned()
}
