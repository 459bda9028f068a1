//! Declarative field-extraction rules.
//!
//! A field is described by an ordered slice of [`Rule`]s. Each rule names where
//! to look ([`Locator`]) and how to turn what it finds into a value; the first
//! rule whose value passes the caller's acceptance test wins. Supporting a new
//! provider schema means adding a rule, not another branch.

use serde_json::Value;

/// Where in a record a rule looks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// A top-level key
    Key(&'static str),
    /// Nested keys; numeric segments index into arrays
    Path(&'static [&'static str]),
    /// The record itself
    Whole,
}

impl Locator {
    /// Resolve against a record. JSON `null` counts as absent.
    #[must_use]
    pub fn locate<'a>(&self, raw: &'a Value) -> Option<&'a Value> {
        let found = match self {
            Self::Key(key) => raw.get(*key),
            Self::Path(segments) => segments
                .iter()
                .try_fold(raw, |node, segment| step(node, segment)),
            Self::Whole => Some(raw),
        };
        found.filter(|value| !value.is_null())
    }
}

fn step<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// One way of extracting a `T` from a record
pub struct Rule<T> {
    pub locator: Locator,
    pub extract: fn(&Value) -> Option<T>,
}

impl<T> Rule<T> {
    pub const fn key(key: &'static str, extract: fn(&Value) -> Option<T>) -> Self {
        Self {
            locator: Locator::Key(key),
            extract,
        }
    }

    pub const fn path(segments: &'static [&'static str], extract: fn(&Value) -> Option<T>) -> Self {
        Self {
            locator: Locator::Path(segments),
            extract,
        }
    }

    pub const fn whole(extract: fn(&Value) -> Option<T>) -> Self {
        Self {
            locator: Locator::Whole,
            extract,
        }
    }

    /// Whether the record has anything at this rule's location
    #[must_use]
    pub fn applies(&self, raw: &Value) -> bool {
        self.locator.locate(raw).is_some()
    }

    #[must_use]
    pub fn apply(&self, raw: &Value) -> Option<T> {
        self.locator.locate(raw).and_then(self.extract)
    }
}

/// Evaluate `rules` in order and return the first extracted value that `accept` allows
pub fn first_match<T>(rules: &[Rule<T>], raw: &Value, accept: impl Fn(&T) -> bool) -> Option<T> {
    rules
        .iter()
        .filter(|rule| rule.applies(raw))
        .filter_map(|rule| rule.apply(raw))
        .find(|value| accept(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn string(value: &Value) -> Option<String> {
        value.as_str().map(str::to_string)
    }

    #[test]
    fn test_locators() {
        let raw = json!({
            "title": "A",
            "externalIds": {"DOI": "10.1/x"},
            "issued": {"date-parts": [[2020, 5]]},
            "gone": null
        });

        assert_eq!(Locator::Key("title").locate(&raw), Some(&json!("A")));
        assert_eq!(
            Locator::Path(&["externalIds", "DOI"]).locate(&raw),
            Some(&json!("10.1/x"))
        );
        assert_eq!(
            Locator::Path(&["issued", "date-parts", "0", "0"]).locate(&raw),
            Some(&json!(2020))
        );
        assert_eq!(Locator::Key("gone").locate(&raw), None);
        assert_eq!(Locator::Path(&["title", "0"]).locate(&raw), None);
        assert_eq!(Locator::Whole.locate(&json!(42)), Some(&json!(42)));
    }

    #[test]
    fn test_first_match_order_and_acceptance() {
        const RULES: &[Rule<String>] = &[
            Rule::key("title", string),
            Rule::key("name", string),
            Rule::path(&["bibjson", "title"], string),
        ];

        let raw = json!({"title": "   ", "name": "Named", "bibjson": {"title": "Nested"}});
        let found = first_match(RULES, &raw, |s| !s.trim().is_empty());
        assert_eq!(found.as_deref(), Some("Named"));

        let raw = json!({"bibjson": {"title": "Nested"}});
        assert_eq!(
            first_match(RULES, &raw, |_| true).as_deref(),
            Some("Nested")
        );

        assert!(first_match(RULES, &json!("not an object"), |_| true).is_none());
    }
}
