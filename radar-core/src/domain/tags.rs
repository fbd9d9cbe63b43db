//! Tag maps and truthy evaluation
//!
//! Tags are stored as JSON objects mapping a tag name to a flag. Flags arrive
//! in several encodings (booleans from the classifier, strings or numbers from
//! older rows and hand-written subscriptions), so every membership check goes
//! through [`is_truthy`].

use serde_json::Value;

/// Tag name to flag value
pub type TagMap = serde_json::Map<String, Value>;

/// Returns whether a tag flag counts as set
///
/// Booleans are taken as-is, the string `"true"` (any case, surrounding
/// whitespace ignored) is set while other strings are not, numbers are set
/// when non-zero and any other non-null value is set.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => text.trim().eq_ignore_ascii_case("true"),
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Returns whether `tag` is present and truthy in `tags`
pub fn has_tag(tags: &TagMap, tag: &str) -> bool {
    tags.get(tag).is_some_and(is_truthy)
}

/// Builds a tag map with every name flagged `true`
pub fn flag_all<I, S>(names: I) -> TagMap
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names
        .into_iter()
        .map(|name| (name.into(), Value::Bool(true)))
        .collect()
}
