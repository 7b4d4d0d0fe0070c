//! Query result types for db-select.
//!
//! Defines the row representations, execution options and values returned
//! by database clients.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// How rows are represented in a [`QueryResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutFormat {
    /// Each row is a positional sequence of column values.
    #[default]
    Array,
    /// Each row maps column names to values.
    Object,
}

impl OutFormat {
    /// Returns the format name as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl std::str::FromStr for OutFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "array" => Ok(Self::Array),
            "object" => Ok(Self::Object),
            _ => Err(format!(
                "Invalid output format: {s}. Expected: array or object"
            )),
        }
    }
}

impl fmt::Display for OutFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-wide execution settings, overridable per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecuteDefaults {
    /// Row representation used when a call does not ask for one.
    #[serde(default)]
    pub out_format: OutFormat,

    /// Maximum rows fetched per execution. Zero means unlimited.
    #[serde(default)]
    pub max_rows: usize,
}

/// Per-call execution options.
///
/// Unset fields fall back to the client's [`ExecuteDefaults`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecuteOptions {
    pub out_format: Option<OutFormat>,
    pub max_rows: Option<usize>,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the given row representation.
    pub fn out_format(mut self, format: OutFormat) -> Self {
        self.out_format = Some(format);
        self
    }

    /// Limits the number of fetched rows. Zero means unlimited.
    pub fn max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Resolves the effective row format against the client defaults.
    pub fn effective_format(&self, defaults: &ExecuteDefaults) -> OutFormat {
        self.out_format.unwrap_or(defaults.out_format)
    }

    /// Resolves the effective row limit; `None` means unlimited.
    pub fn effective_limit(&self, defaults: &ExecuteDefaults) -> Option<usize> {
        match self.max_rows.unwrap_or(defaults.max_rows) {
            0 => None,
            n => Some(n),
        }
    }
}

/// Positional bind values for a statement.
///
/// Always passed explicitly, even when empty, and always separate from
/// [`ExecuteOptions`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindParams(Vec<Value>);

impl BindParams {
    /// No bind values.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }
}

impl From<Vec<Value>> for BindParams {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// Represents the result of executing a SQL query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Column metadata for the result set.
    pub columns: Vec<ColumnInfo>,

    /// Rows of data, in the requested representation.
    pub rows: Rows,

    /// Time taken to execute the query.
    #[serde(skip)]
    pub execution_time: Duration,

    /// Number of rows in the result (may be truncated).
    pub row_count: usize,

    /// Total number of rows before truncation (if known).
    pub total_rows: Option<usize>,

    /// Whether fetching stopped at the row limit.
    pub was_truncated: bool,
}

impl QueryResult {
    /// Creates a query result from positional rows, shaping them into `format`.
    pub fn from_rows(columns: Vec<ColumnInfo>, rows: Vec<Row>, format: OutFormat) -> Self {
        let row_count = rows.len();
        let rows = Rows::shape(&columns, rows, format);
        Self {
            columns,
            rows,
            execution_time: Duration::ZERO,
            row_count,
            total_rows: Some(row_count),
            was_truncated: false,
        }
    }

    /// Sets the execution time.
    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }

    /// Marks the result as truncated at the row limit.
    ///
    /// The driver stops fetching at the limit, so the total is unknown.
    pub fn truncated(mut self) -> Self {
        self.was_truncated = true;
        self.total_rows = None;
        self
    }

    /// Returns the row representation.
    pub fn out_format(&self) -> OutFormat {
        self.rows.out_format()
    }

    /// Returns true if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Returns the rows as positional value sequences, whatever the representation.
    pub fn positional_rows(&self) -> Vec<Vec<&Value>> {
        match &self.rows {
            Rows::Array(rows) => rows.iter().map(|row| row.iter().collect()).collect(),
            Rows::Object(rows) => rows.iter().map(|row| row.values().collect()).collect(),
        }
    }

    /// Returns a truncation warning message if the result was truncated.
    pub fn truncation_warning(&self) -> Option<String> {
        if self.was_truncated {
            Some(format!(
                "⚠ Result truncated: fetched the first {} rows",
                self.row_count
            ))
        } else {
            None
        }
    }
}

/// Metadata about a column in a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// Column data type as reported by the driver.
    pub data_type: String,
}

impl ColumnInfo {
    /// Creates a new column info with the given name and type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A positional row of data.
pub type Row = Vec<Value>;

/// Rows of a result set in one of the two representations.
#[derive(Debug, Clone, PartialEq)]
pub enum Rows {
    Array(Vec<Row>),
    Object(Vec<ObjectRow>),
}

impl Rows {
    /// Shapes positional rows into the requested representation.
    pub fn shape(columns: &[ColumnInfo], rows: Vec<Row>, format: OutFormat) -> Self {
        match format {
            OutFormat::Array => Rows::Array(rows),
            OutFormat::Object => {
                let keys = object_keys(columns);
                Rows::Object(
                    rows.into_iter()
                        .map(|row| ObjectRow::new(keys.iter().cloned().zip(row).collect()))
                        .collect(),
                )
            }
        }
    }

    pub fn out_format(&self) -> OutFormat {
        match self {
            Rows::Array(_) => OutFormat::Array,
            Rows::Object(_) => OutFormat::Object,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Rows::Array(rows) => rows.len(),
            Rows::Object(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for Rows {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rows::Array(rows) => rows.serialize(serializer),
            Rows::Object(rows) => rows.serialize(serializer),
        }
    }
}

/// Builds unique object keys from column names.
///
/// A repeated name gets the first free `_1`, `_2`, ... suffix.
fn object_keys(columns: &[ColumnInfo]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(columns.len());
    for column in columns {
        let mut key = column.name.clone();
        let mut suffix = 1;
        while keys.contains(&key) {
            key = format!("{}_{}", column.name, suffix);
            suffix += 1;
        }
        keys.push(key);
    }
    keys
}

/// A row keyed by column name, keeping column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectRow {
    fields: Vec<(String, Value)>,
}

impl ObjectRow {
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for ObjectRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Represents a single value from a database query.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    String(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Parses a command-line bind value: integers, then floats, then text.
    ///
    /// The literal `NULL` (any case) becomes [`Value::Null`].
    pub fn parse_literal(s: &str) -> Self {
        if s.eq_ignore_ascii_case("null") {
            Value::Null
        } else if let Ok(i) = s.parse::<i64>() {
            Value::Int(i)
        } else if let Ok(f) = s.parse::<f64>() {
            Value::Float(f)
        } else {
            Value::String(s.to_string())
        }
    }

    /// Renders the value as a literal: strings quoted, NULL as `null`.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => format!("{s:?}"),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }

    /// Attempts to convert the value to a string representation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::String(s) => s.clone(),
            other => other.to_literal(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(bytes) => {
                let mut seq = serializer.serialize_seq(Some(bytes.len()))?;
                for byte in bytes {
                    seq.serialize_element(byte)?;
                }
                seq.end()
            }
        }
    }
}

// Conversion implementations for common types
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

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
