use std::cmp::Ordering;

use indexmap::IndexMap;
use tracing::warn;

/// Field names starting with this prefix never become columns.
pub const PRIVATE_PREFIX: &str = "_";

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }

    /// Plain representation used for clipboard copies.
    pub fn raw(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

/// A flat, schema-less row. Field order follows the source document.
pub type Record = IndexMap<String, Value>;

pub fn is_private(key: &str) -> bool {
    key.starts_with(PRIVATE_PREFIX)
}

/// Ascending order for sort keys: numbers by value, then text lexicographically,
/// missing values last.
pub fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x.total_cmp(y),
        (Some(Value::Text(x)), Some(Value::Text(y))) => x.cmp(y),
        (Some(Value::Number(_)), Some(Value::Text(_))) => Ordering::Less,
        (Some(Value::Text(_)), Some(Value::Number(_))) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Converts one decoded JSON entry into a record. Non-object entries yield `None`.
pub fn from_json(entry: serde_json::Value) -> Option<Record> {
    let fields = match entry {
        serde_json::Value::Object(fields) => fields,
        other => {
            warn!("Skipping non-object entry: {other}");
            return None;
        }
    };
    let mut record = Record::with_capacity(fields.len());
    for (key, value) in fields {
        let value = match value {
            serde_json::Value::Null => continue,
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => Value::Number(f),
                None => Value::Text(n.to_string()),
            },
            serde_json::Value::Bool(b) => Value::Text(b.to_string()),
            nested => Value::Text(nested.to_string()),
        };
        record.insert(key, value);
    }
    Some(record)
}

/// Decodes a JSON document holding an array of flat objects.
pub fn records_from_json(body: &str) -> Result<Vec<Record>, serde_json::Error> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(body)?;
    Ok(records_from_entries(entries))
}

/// Records of an already decoded array. Non-object entries are skipped.
pub fn records_from_entries(entries: Vec<serde_json::Value>) -> Vec<Record> {
    entries.into_iter().filter_map(from_json).collect()
}

/// Rows shown until the first load completes.
pub fn fallback_records() -> Vec<Record> {
    let mut alabama = Record::new();
    alabama.insert("state".into(), "Alabama".into());
    alabama.insert("abbreviation".into(), "AL".into());
    alabama.insert("population".into(), Value::Number(4921532.0));
    alabama.insert("size".into(), Value::Number(52420.07));

    let mut alaska = Record::new();
    alaska.insert("state".into(), "Alaska".into());
    alaska.insert("abbreviation".into(), "AK".into());
    alaska.insert("population".into(), Value::Number(731158.0));
    alaska.insert("size".into(), Value::Number(665384.04));

    vec![alabama, alaska]
}
