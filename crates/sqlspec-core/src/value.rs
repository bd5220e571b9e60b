//! Parameter value model for SQLSpec

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A parameter value that can represent any SQL type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// Decimal/Numeric (stored as string for precision)
    Decimal(String),
    /// UTF-8 string
    Text(String),
    /// Binary data
    Blob(Vec<u8>),
    /// UUID
    Uuid(Uuid),
    /// Date (year, month, day)
    Date(NaiveDate),
    /// Time (hour, minute, second, nanosecond)
    Time(NaiveTime),
    /// Timestamp without timezone
    Timestamp(NaiveDateTime),
    /// Timestamp with timezone (UTC)
    TimestampTz(DateTime<Utc>),
    /// JSON value
    Json(serde_json::Value),
    /// Ordered collection of values
    List(Vec<Value>),
    /// Insertion-ordered mapping of values
    Map(IndexMap<String, Value>),
}

/// Discriminant of a [`Value`], used as the key of the coercion map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    Null,
    Bool,
    Int,
    Float,
    Decimal,
    Text,
    Blob,
    Uuid,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Json,
    List,
    Map,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Text => "text",
            Self::Blob => "blob",
            Self::Uuid => "uuid",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestamp_tz",
            Self::Json => "json",
            Self::List => "list",
            Self::Map => "map",
        }
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Value {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The type discriminant of this value
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Bool,
            Value::Int(_) => TypeTag::Int,
            Value::Float(_) => TypeTag::Float,
            Value::Decimal(_) => TypeTag::Decimal,
            Value::Text(_) => TypeTag::Text,
            Value::Blob(_) => TypeTag::Blob,
            Value::Uuid(_) => TypeTag::Uuid,
            Value::Date(_) => TypeTag::Date,
            Value::Time(_) => TypeTag::Time,
            Value::Timestamp(_) => TypeTag::Timestamp,
            Value::TimestampTz(_) => TypeTag::TimestampTz,
            Value::Json(_) => TypeTag::Json,
            Value::List(_) => TypeTag::List,
            Value::Map(_) => TypeTag::Map,
        }
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Text(s) => s.parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(s) => s.parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as a list slice
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Render this value as an inline SQL literal.
    ///
    /// Used when compiling with the static style: the value is embedded in
    /// the statement text instead of being bound. Strings are single-quoted
    /// with embedded quotes doubled, which is the portable escaping rule.
    pub fn to_sql_literal(&self) -> String {
        fn quote(s: &str) -> String {
            format!("'{}'", s.replace('\'', "''"))
        }
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Decimal(v) => v.clone(),
            Value::Text(s) => quote(s),
            Value::Blob(b) => format!("X'{}'", hex::encode(b)),
            Value::Uuid(u) => quote(&u.to_string()),
            Value::Date(d) => quote(&d.to_string()),
            Value::Time(t) => quote(&t.to_string()),
            Value::Timestamp(ts) => quote(&ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            Value::TimestampTz(ts) => quote(&ts.to_rfc3339()),
            Value::Json(j) => quote(&j.to_string()),
            Value::Map(m) => {
                let j: serde_json::Value = serde_json::Value::Object(
                    m.iter()
                        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.to_string())))
                        .collect(),
                );
                quote(&j.to_string())
            }
            Value::List(items) => items
                .iter()
                .map(|v| v.to_sql_literal())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Blob(v) => write!(f, "<{} bytes>", v.len()),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}", v),
            Value::TimestampTz(v) => write!(f, "{}", v),
            Value::Json(v) => write!(f, "{}", v),
            Value::List(v) => write!(f, "[{} items]", v.len()),
            Value::Map(v) => write!(f, "{{{} entries}}", v.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

/// A parameter value bundled with optional type and name metadata.
///
/// The wrapped value is never mutated after construction; coercion produces
/// a new wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedParameter {
    /// The parameter value
    pub value: Value,
    /// Declared type hint, when the caller wants explicit control
    pub declared_type: Option<TypeTag>,
    /// Semantic name, for named placeholder styles
    pub name: Option<String>,
}

impl TypedParameter {
    /// Wrap a bare value
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            declared_type: None,
            name: None,
        }
    }

    /// Wrap a value under a semantic name
    pub fn named(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            declared_type: None,
            name: Some(name.into()),
        }
    }

    /// Attach a declared type hint
    pub fn with_declared_type(mut self, tag: TypeTag) -> Self {
        self.declared_type = Some(tag);
        self
    }

    /// The effective type used for coercion dispatch: the declared hint if
    /// present, otherwise the inferred tag of the value.
    pub fn effective_type(&self) -> TypeTag {
        self.declared_type.unwrap_or_else(|| self.value.type_tag())
    }
}
