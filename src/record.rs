use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Raw clinical values keyed by field name.
///
/// Categorical fields hold whole numbers, continuous fields any real. Nothing is checked here,
/// validation happens when the record gets encoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientRecord(BTreeMap<String, f64>);

impl PatientRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record with `name` set to `value`.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for PatientRecord {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_a_flat_object() {
        let record = PatientRecord::new().with("age", 70.).with("gender", 0.);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"age":70.0,"gender":0.0}"#);

        let back: PatientRecord = serde_json::from_str(r#"{"age":70,"gender":0}"#).unwrap();
        assert_eq!(back, record);
    }
}
