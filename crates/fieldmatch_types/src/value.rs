use serde::de::Deserializer;
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// A single field value as it appears in ground truth or model output.
///
/// Anything that does not fit the primitive set (for instance a JSON object a
/// model emitted where a string was declared) is kept as `Malformed` with its
/// raw JSON text so it can be reported. `Malformed` never matches anything.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<FieldValue>),
    Malformed(String),
}

/// Coarse shape of a value, used in mismatch notes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Boolean,
    Number,
    String,
    List,
    Malformed,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Malformed => "malformed value",
        };
        write!(f, "{name}")
    }
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            FieldValue::Null => ValueKind::Null,
            FieldValue::Boolean(_) => ValueKind::Boolean,
            FieldValue::Integer(_) | FieldValue::Float(_) => ValueKind::Number,
            FieldValue::String(_) => ValueKind::String,
            FieldValue::List(_) => ValueKind::List,
            FieldValue::Malformed(_) => ValueKind::Malformed,
        }
    }

    /// Numeric view of the value. Integers widen to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Compact, human-readable rendering used in tables and CSV cells
    pub fn display(&self) -> String {
        match self {
            FieldValue::Null => "null".to_string(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::String(s) => s.clone(),
            FieldValue::List(items) => {
                let inner: Vec<String> = items.iter().map(|item| item.display()).collect();
                format!("[{}]", inner.join(", "))
            }
            FieldValue::Malformed(raw) => raw.clone(),
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Boolean(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    FieldValue::Float(f)
                } else {
                    FieldValue::Malformed(n.to_string())
                }
            }
            Value::String(s) => FieldValue::String(s),
            Value::Array(items) => {
                FieldValue::List(items.into_iter().map(FieldValue::from).collect())
            }
            Value::Object(_) => FieldValue::Malformed(value.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => FieldValue::Null,
        }
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(value: Vec<T>) -> Self {
        FieldValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_unit(),
            FieldValue::Boolean(b) => serializer.serialize_bool(*b),
            FieldValue::Integer(i) => serializer.serialize_i64(*i),
            FieldValue::Float(f) => serializer.serialize_f64(*f),
            FieldValue::String(s) => serializer.serialize_str(s),
            FieldValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            // keep the original structure when the raw text is still valid JSON
            FieldValue::Malformed(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(value) => value.serialize(serializer),
                Err(_) => serializer.serialize_str(raw),
            },
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(FieldValue::from(value))
    }
}

/// One expected or actual record: field name to value.
///
/// Records are immutable once built. A field the record does not carry reads
/// as null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(values: BTreeMap<String, FieldValue>) -> Self {
        Self { values }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a record from a JSON object. Non-object input yields `None`.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self {
                values: map
                    .into_iter()
                    .map(|(k, v)| (k, FieldValue::from(v)))
                    .collect(),
            }),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.values.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
