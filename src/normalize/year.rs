use super::rules::{first_match, Rule};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub const MIN_YEAR: i32 = 1900;

static YEAR_IN_TEXT: OnceLock<Regex> = OnceLock::new();

fn year_in_text() -> &'static Regex {
    YEAR_IN_TEXT.get_or_init(|| Regex::new(r"\b(19|20)\d{2}\b").expect("year regex must compile"))
}

/// A number, or the leading four characters of a string parsed as one
fn leading_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().get(..4).and_then(|head| head.parse().ok()),
        _ => None,
    }
}

const YEAR_RULES: &[Rule<i32>] = &[
    Rule::key("year", leading_year),
    Rule::key("yearPublished", leading_year),
    Rule::key("publicationYear", leading_year),
    Rule::key("datePublished", leading_year),
    Rule::key("publishedDate", leading_year),
    Rule::key("publicationDate", leading_year),
    Rule::key("published_date", leading_year),
    Rule::path(&["published-print", "date-parts", "0", "0"], leading_year),
    Rule::path(&["published-online", "date-parts", "0", "0"], leading_year),
    Rule::path(&["issued", "date-parts", "0", "0"], leading_year),
    Rule::path(&["published", "date-parts", "0", "0"], leading_year),
    Rule::path(&["created", "date-parts", "0", "0"], leading_year),
    Rule::path(&["deposited", "date-parts", "0", "0"], leading_year),
];

/// Publication year within `[1900, current_year]`, if one can be recovered.
///
/// Known date fields are tried first; failing those, every string in the
/// record is scanned for something that looks like a year.
#[must_use]
pub fn published_year(raw: &Value, current_year: i32) -> Option<i32> {
    let in_range = |year: &i32| (MIN_YEAR..=current_year).contains(year);
    first_match(YEAR_RULES, raw, &in_range).or_else(|| scan(raw, &in_range))
}

fn scan(value: &Value, in_range: &impl Fn(&i32) -> bool) -> Option<i32> {
    match value {
        Value::String(s) => year_in_text()
            .find_iter(s)
            .filter_map(|m| m.as_str().parse().ok())
            .find(|year| in_range(year)),
        Value::Array(items) => items.iter().find_map(|item| scan(item, in_range)),
        Value::Object(map) => map.values().find_map(|item| scan(item, in_range)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i32 = 2025;

    #[test]
    fn test_direct_fields() {
        assert_eq!(published_year(&json!({"year": 2019}), NOW), Some(2019));
        assert_eq!(published_year(&json!({"yearPublished": "2018"}), NOW), Some(2018));
        assert_eq!(
            published_year(&json!({"publishedDate": "2016-04-01T00:00:00"}), NOW),
            Some(2016)
        );
    }

    #[test]
    fn test_crossref_date_parts() {
        let raw = json!({"issued": {"date-parts": [[2014, 3, 2]]}});
        assert_eq!(published_year(&raw, NOW), Some(2014));

        // published-print wins over deposited
        let raw = json!({
            "deposited": {"date-parts": [[2022, 1, 1]]},
            "published-print": {"date-parts": [[2012]]}
        });
        assert_eq!(published_year(&raw, NOW), Some(2012));
    }

    #[test]
    fn test_out_of_range_candidates_are_skipped() {
        let raw = json!({"year": 3021, "publicationDate": "2020-02-02"});
        assert_eq!(published_year(&raw, NOW), Some(2020));

        let raw = json!({"year": 1850});
        assert_eq!(published_year(&raw, NOW), None);
    }

    #[test]
    fn test_scan_fallback() {
        let raw = json!({"notes": ["Presented at ICML 2017 in Sydney"]});
        assert_eq!(published_year(&raw, NOW), Some(2017));

        // 2099 is a year-shaped token but in the future
        let raw = json!({"snippet": "Roadmap 2099, revised 2003"});
        assert_eq!(published_year(&raw, NOW), Some(2003));

        assert_eq!(published_year(&json!({"id": "W123"}), NOW), None);
        assert_eq!(published_year(&json!(null), NOW), None);
    }
}
