use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Open key/value bag attached to knowledge-store updates.
///
/// Values arrive loosely typed (numbers are sometimes serialized as strings),
/// so reads go through fallible accessors instead of raw `Value` access.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateMetadata(BTreeMap<String, Value>);

impl UpdateMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String view of a value; numbers and booleans are rendered, other
    /// shapes are rejected.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    /// Numeric view of a value stored either as a JSON number or as a numeric
    /// string. Non-finite results are treated as absent.
    #[must_use]
    pub fn try_get_number(&self, key: &str) -> Option<f64> {
        let parsed = match self.0.get(key)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        parsed.is_finite().then_some(parsed)
    }

    /// True when every filter entry is present with an equal string view.
    #[must_use]
    pub fn matches(&self, filter: &BTreeMap<String, String>) -> bool {
        filter
            .iter()
            .all(|(key, expected)| self.get_str(key).as_deref() == Some(expected.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for UpdateMetadata {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::UpdateMetadata;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn numeric_strings_and_numbers_both_parse() {
        let mut metadata = UpdateMetadata::new();
        metadata.insert("elapsed", json!("12.5"));
        metadata.insert("count", json!(3));
        metadata.insert("label", json!("soon"));

        assert_eq!(metadata.try_get_number("elapsed"), Some(12.5));
        assert_eq!(metadata.try_get_number("count"), Some(3.0));
        assert_eq!(metadata.try_get_number("label"), None);
        assert_eq!(metadata.try_get_number("missing"), None);
    }

    #[test]
    fn non_finite_strings_are_rejected() {
        let mut metadata = UpdateMetadata::new();
        metadata.insert("elapsed", json!("NaN"));
        assert_eq!(metadata.try_get_number("elapsed"), None);
    }

    #[test]
    fn filter_compares_string_views() {
        let mut metadata = UpdateMetadata::new();
        metadata.insert("runId", json!("run-1"));
        metadata.insert("step", json!(4));

        let mut filter = BTreeMap::new();
        filter.insert("runId".to_owned(), "run-1".to_owned());
        filter.insert("step".to_owned(), "4".to_owned());
        assert!(metadata.matches(&filter));

        filter.insert("runId".to_owned(), "run-2".to_owned());
        assert!(!metadata.matches(&filter));
    }
}
