use super::rules::{first_match, Rule};
use serde_json::Value;

pub const TITLE_MAX_CHARS: usize = 50;
pub const AUTHOR_MAX_CHARS: usize = 15;
pub const UNKNOWN_AUTHOR: &str = "Unknown";
pub const DEFAULT_SOURCE: &str = "Academic Database";

/// Coerce a JSON value to text: strings as-is, numbers stringified, lists by
/// their first usable element. Whitespace is collapsed; blank yields `None`.
#[must_use]
pub fn text(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => return items.iter().find_map(text),
        _ => return None,
    };
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Truncate to at most `max` characters without splitting a code point
#[must_use]
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

const TITLE_RULES: &[Rule<String>] = &[
    Rule::key("title", text),
    Rule::key("name", text),
    Rule::key("displayName", text),
    Rule::key("display_name", text),
    Rule::key("dc:title", text),
    Rule::path(&["bibjson", "title"], text),
];

const SOURCE_RULES: &[Rule<String>] = &[
    Rule::key("publisher", text),
    Rule::key("source", text),
    Rule::key("displayLink", text),
];

const ABSTRACT_RULES: &[Rule<String>] = &[
    Rule::key("abstract", text),
    Rule::key("abstractText", text),
    Rule::key("description", text),
    Rule::key("snippet", text),
];

/// Full, uncapped title text if the record carries one
#[must_use]
pub fn title(raw: &Value) -> Option<String> {
    first_match(TITLE_RULES, raw, |s| !s.is_empty())
}

/// Placeholder title naming where the record came from
#[must_use]
pub fn synthesized_title(raw: &Value, adapter: Option<&str>) -> String {
    let source = first_match(SOURCE_RULES, raw, |s| !s.is_empty())
        .or_else(|| adapter.map(str::trim).filter(|a| !a.is_empty()).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_SOURCE.to_string());
    truncate_chars(&format!("Research Paper from {source}"), TITLE_MAX_CHARS)
}

#[must_use]
pub fn abstract_text(raw: &Value) -> String {
    first_match(ABSTRACT_RULES, raw, |s| !s.is_empty()).unwrap_or_default()
}

const AUTHOR_RULES: &[Rule<String>] = &[
    Rule::key("authors", author_container),
    Rule::key("author", author_container),
    Rule::key("creator", author_container),
    Rule::key("contributors", author_container),
];

const AUTHOR_ENTRY_RULES: &[Rule<String>] = &[
    Rule::whole(given_and_family),
    Rule::key("family", text),
    Rule::key("name", text),
    Rule::key("displayName", text),
    Rule::key("fullName", text),
];

/// A container may be a list of entries, a single entry object, or a plain
/// string listing names separated by commas or semicolons
fn author_container(value: &Value) -> Option<String> {
    match value {
        Value::Array(entries) => entries.first().and_then(author_entry),
        Value::String(names) => names
            .split([',', ';'])
            .map(str::trim)
            .find(|name| !name.is_empty())
            .and_then(surname),
        other => author_entry(other),
    }
}

fn author_entry(entry: &Value) -> Option<String> {
    let name = match entry {
        Value::Object(_) => first_match(AUTHOR_ENTRY_RULES, entry, |s| !s.is_empty()),
        other => text(other),
    }?;
    surname(&name)
}

fn given_and_family(entry: &Value) -> Option<String> {
    let given = entry.get("given").and_then(text)?;
    let family = entry.get("family").and_then(text)?;
    Some(format!("{given} {family}"))
}

/// Reduce a display name to something surname-like, at most 15 chars.
///
/// `"Surname, Given"` keeps the part before the comma, multi-word names keep
/// the last word, a single word is kept as-is.
#[must_use]
pub fn surname(name: &str) -> Option<String> {
    let name = name.trim();
    let picked = match name.split_once(',') {
        Some((before, _)) if !before.trim().is_empty() => before.trim(),
        _ => name.split_whitespace().last()?,
    };
    let picked = truncate_chars(picked, AUTHOR_MAX_CHARS);
    (!picked.is_empty()).then_some(picked)
}

/// First author's surname, or `"Unknown"`
#[must_use]
pub fn first_author(raw: &Value) -> String {
    first_match(AUTHOR_RULES, raw, |s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
}

const JOURNAL_RULES: &[Rule<String>] = &[
    Rule::path(&["journal", "name"], text),
    Rule::path(&["journal", "title"], text),
    Rule::key("journal", scalar_text),
    Rule::key("container-title", text),
    Rule::key("journal_name", text),
    Rule::key("venue", text),
];

/// `journal` may be an object (handled by the path rules above) or a string
fn scalar_text(value: &Value) -> Option<String> {
    value.is_string().then(|| text(value)).flatten()
}

/// Journal or venue name; empty when the record has none
#[must_use]
pub fn journal_name(raw: &Value) -> String {
    first_match(JOURNAL_RULES, raw, |s| !s.is_empty()).unwrap_or_default()
}

const CITATION_RULES: &[Rule<u64>] = &[
    Rule::key("citationCount", count),
    Rule::key("citation_count", count),
    Rule::key("is-referenced-by-count", count),
    Rule::key("citedByCount", count),
];

fn count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Citation count when the provider reports one (S2, CORE, Crossref)
#[must_use]
pub fn citation_count(raw: &Value) -> Option<u64> {
    first_match(CITATION_RULES, raw, |_| true)
}
