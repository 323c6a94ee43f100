//! Metadata index: `(field, value) → record positions`
//!
//! Only scalar fields are indexed. Values are keyed by their canonical JSON
//! text, so `"10-K"` and `10` never collide.

use crate::models::Chunk;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Equality or set-membership condition on one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Many(Vec<Value>),
    One(Value),
}

impl FilterValue {
    fn options(&self) -> &[Value] {
        match self {
            FilterValue::One(value) => std::slice::from_ref(value),
            FilterValue::Many(options) => options,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::One(Value::String(value.to_string()))
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::One(Value::String(value))
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        FilterValue::Many(values.into_iter().map(Value::String).collect())
    }
}

/// Conditions ANDed across fields
pub type Filters = BTreeMap<String, FilterValue>;

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// Index key for a scalar. Floats are keyed at f32 precision, which is how
/// scores are stored, so a filter on `0.6` finds a stored `0.6f32`.
fn value_key(value: &Value) -> String {
    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) => (f as f32).to_string(),
            None => n.to_string(),
        },
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataIndex {
    fields: BTreeMap<String, BTreeMap<String, Vec<usize>>>,
}

impl MetadataIndex {
    /// Rebuild from records in insertion order
    pub fn build<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> Self {
        let mut index = Self::default();
        for (position, chunk) in chunks.into_iter().enumerate() {
            index.insert(position, &chunk.metadata.fields());
        }
        index
    }

    pub fn insert(&mut self, position: usize, fields: &Map<String, Value>) {
        for (key, value) in fields {
            if is_scalar(value) {
                self.fields
                    .entry(key.clone())
                    .or_default()
                    .entry(value_key(value))
                    .or_default()
                    .push(position);
            }
        }
    }

    /// Positions whose `key` equals `value`, ascending
    pub fn lookup(&self, key: &str, value: &Value) -> &[usize] {
        self.fields
            .get(key)
            .and_then(|values| values.get(&value_key(value)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Positions satisfying every filter, ascending. Unindexed keys match nothing.
    pub fn candidates(&self, filters: &Filters) -> Vec<usize> {
        let mut result: Option<Vec<usize>> = None;

        for (key, filter) in filters {
            let mut matched: Vec<usize> = filter
                .options()
                .iter()
                .flat_map(|value| self.lookup(key, value).iter().copied())
                .collect();
            matched.sort_unstable();
            matched.dedup();

            result = Some(match result {
                None => matched,
                Some(current) => intersect(&current, &matched),
            });

            if result.as_ref().map(Vec::is_empty).unwrap_or(false) {
                break;
            }
        }

        result.unwrap_or_default()
    }
}

/// Intersection of two ascending position lists
fn intersect(a: &[usize], b: &[usize]) -> Vec<usize> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::new();
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}
