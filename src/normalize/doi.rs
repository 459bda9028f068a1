use super::fields::text;
use super::rules::{first_match, Rule};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

static DOI_SHAPE: OnceLock<Regex> = OnceLock::new();

fn doi_shape() -> &'static Regex {
    DOI_SHAPE.get_or_init(|| Regex::new(r"^10\.[^/]+/.+$").expect("doi regex must compile"))
}

/// Reduce a DOI, `doi:` URI or `doi.org` link to the bare `10.x/y` form.
///
/// Query strings and fragments are dropped. Anything that does not end up
/// looking like a DOI yields `None`.
#[must_use]
pub fn clean_doi(candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    let lower = candidate.to_ascii_lowercase();

    let bare = if let Some(at) = lower.find("doi.org/") {
        &candidate[at + "doi.org/".len()..]
    } else if lower.starts_with("doi:") {
        candidate[4..].trim_start()
    } else {
        candidate
    };

    let bare = bare.split(['?', '#']).next().unwrap_or_default().trim();
    let valid = bare.starts_with("10.")
        && bare.contains('/')
        && bare.len() > 7
        && doi_shape().is_match(bare);
    valid.then(|| bare.to_string())
}

fn doi_text(value: &Value) -> Option<String> {
    text(value).and_then(|s| clean_doi(&s))
}

/// `identifiers` is either a map with a `doi` key or a list of strings and
/// `{type, identifier}` objects
fn doi_in_identifiers(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map.get("doi").and_then(doi_text),
        Value::Array(entries) => entries.iter().find_map(|entry| match entry {
            Value::Object(map) => {
                let is_doi = map
                    .get("type")
                    .and_then(Value::as_str)
                    .is_some_and(|t| t.eq_ignore_ascii_case("doi"));
                if is_doi {
                    map.get("identifier").or_else(|| map.get("value")).and_then(doi_text)
                } else {
                    None
                }
            }
            other => doi_text(other),
        }),
        other => doi_text(other),
    }
}

const DOI_RULES: &[Rule<String>] = &[
    Rule::key("doi", doi_text),
    Rule::key("DOI", doi_text),
    Rule::path(&["externalIds", "DOI"], doi_text),
    Rule::key("identifiers", doi_in_identifiers),
    Rule::key("url", doi_text),
    Rule::key("link", doi_text),
    Rule::key("URL", doi_text),
];

#[must_use]
pub fn doi(raw: &Value) -> Option<String> {
    first_match(DOI_RULES, raw, |_| true)
}
