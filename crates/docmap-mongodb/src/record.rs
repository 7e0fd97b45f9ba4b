//! Immutable field snapshots
//!
//! A [`Record`] maps field names to [`Value`]s. Updates never touch the
//! receiver: they return a new record that shares nothing mutable with the
//! old one. Storage is reference counted, so cloning a record is cheap and an
//! update copies the map only when the storage is shared.

use docmap_validation::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Immutable, structurally comparable field snapshot
#[derive(Clone, Default)]
pub struct Record {
    fields: Arc<BTreeMap<String, Value>>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// New record with `name` set to `value`
    pub fn with(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut next = self.clone();
        Arc::make_mut(&mut next.fields).insert(name.into(), value.into());
        next
    }

    /// New record without `name`
    pub fn without(&self, name: &str) -> Self {
        if !self.contains(name) {
            return self.clone();
        }
        let mut next = self.clone();
        Arc::make_mut(&mut next.fields).remove(name);
        next
    }

    /// New record with every given field set, later entries winning
    pub fn merge<I, K, V>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut next = self.clone();
        let map = Arc::make_mut(&mut next.fields);
        for (name, value) in fields {
            map.insert(name.into(), value.into());
        }
        next
    }

    /// The record as an object value, fields in name order
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields) || self.fields == other.fields
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.fields.iter()).finish()
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self {
            fields: Arc::new(fields),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect::<BTreeMap<_, _>>(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> Record {
        Record::from_iter([("title", Value::from("Hello")), ("views", Value::Int(1))])
    }

    #[test]
    fn test_with_leaves_original_untouched() {
        let original = article();
        let updated = original.with("views", 2);

        assert_eq!(original.get("views"), Some(&Value::Int(1)));
        assert_eq!(updated.get("views"), Some(&Value::Int(2)));
        assert_ne!(original, updated);
    }

    #[test]
    fn test_structural_equality() {
        let a = article();
        let b = Record::new().with("views", 1).with("title", "Hello");
        assert_eq!(a, b);
    }

    #[test]
    fn test_nested_values_compare_deeply() {
        let a = Record::new().with("tags", vec!["x", "y"]);
        let b = Record::new().with("tags", vec!["x", "y"]);
        let c = Record::new().with("tags", vec!["y", "x"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_without() {
        let record = article();
        let trimmed = record.without("views");
        assert!(!trimmed.contains("views"));
        assert!(record.contains("views"));
        assert_eq!(trimmed.without("missing"), trimmed);
    }

    #[test]
    fn test_merge_later_wins() {
        let merged = article().merge([("views", Value::Int(5)), ("views", Value::Int(6))]);
        assert_eq!(merged.get("views"), Some(&Value::Int(6)));
        assert_eq!(merged.get("title"), Some(&Value::from("Hello")));
    }

    #[test]
    fn test_to_value_orders_by_name() {
        let value = article().to_value();
        assert_eq!(
            value,
            Value::Object(vec![
                ("title".to_string(), Value::from("Hello")),
                ("views".to_string(), Value::Int(1)),
            ])
        );
    }
}
