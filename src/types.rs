use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::error::{ExportError, ExportResult};

//==============================================================================
// Cell Values
//==============================================================================

/// A scalar value held by a row field
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Native date value (only constructed programmatically)
    Date(NaiveDateTime),
}

static NULL_VALUE: Value = Value::Null;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::Text(s),
            // Nested structures are kept as their JSON text
            other => Value::Text(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d.and_time(chrono::NaiveTime::MIN))
    }
}

//==============================================================================
// Rows
//==============================================================================

/// Identifier linking a sub row to its owning main row.
///
/// Comparison is strict: `Int(1)` never equals `Text("1")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowId {
    Int(i64),
    Text(String),
}

impl RowId {
    /// Derive an identifier from a field value. Non-integral numbers,
    /// booleans, dates and nulls cannot identify a row.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                Some(RowId::Int(*n as i64))
            }
            Value::Text(s) => Some(RowId::Text(s.clone())),
            _ => None,
        }
    }
}

impl From<i64> for RowId {
    fn from(n: i64) -> Self {
        RowId::Int(n)
    }
}

impl From<i32> for RowId {
    fn from(n: i32) -> Self {
        RowId::Int(i64::from(n))
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        RowId::Text(s.to_string())
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Int(n) => write!(f, "{}", n),
            RowId::Text(s) => f.write_str(s),
        }
    }
}

/// One input record. Read-only to the exporter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: BTreeMap<String, Value>,
    parent: Option<RowId>,
    parent_title: Option<String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Attach the owning main row
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<RowId>, title: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self.parent_title = Some(title.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Field lookup; a missing key reads as `Null`
    pub fn get(&self, key: &str) -> &Value {
        self.fields.get(key).unwrap_or(&NULL_VALUE)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn parent(&self) -> Option<&RowId> {
        self.parent.as_ref()
    }

    pub fn parent_title(&self) -> Option<&str> {
        self.parent_title.as_deref()
    }

    /// Identifier stored under `key`
    pub fn id(&self, key: &str) -> Option<RowId> {
        RowId::from_value(self.get(key))
    }

    /// True when this row is owned by `main`, matched on the main row's
    /// `id` field or on its `row_key` field.
    pub fn belongs_to(&self, main: &Row, row_key: &str) -> bool {
        let Some(parent) = &self.parent else {
            return false;
        };
        main.id("id").as_ref() == Some(parent) || main.id(row_key).as_ref() == Some(parent)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut row = Row::new();
        for (key, value) in map {
            match key.as_str() {
                "_parentId" => row.parent = RowId::from_value(&Value::from(value)),
                "_parentTitle" => {
                    row.parent_title = match value {
                        serde_json::Value::Null => None,
                        serde_json::Value::String(s) => Some(s),
                        other => Some(other.to_string()),
                    }
                }
                _ => {
                    row.fields.insert(key, Value::from(value));
                }
            }
        }
        Ok(row)
    }
}

//==============================================================================
// Column Descriptors
//==============================================================================

/// Display transform selected by a column's `type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Date,
    Number,
}

impl ColumnType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "date" => Some(ColumnType::Date),
            "number" => Some(ColumnType::Number),
            _ => None,
        }
    }
}

/// Custom cell formatter, receives `(value, row)`
pub type Formatter = Arc<dyn Fn(&Value, &Row) -> String + Send + Sync>;

/// Maps one row field to one output column
#[derive(Clone, Deserialize)]
#[serde(try_from = "RawColumn")]
pub struct Column {
    pub prop: String,
    pub label: String,
    pub kind: Option<ColumnType>,
    formatter: Option<Formatter>,
}

impl Column {
    /// Create a column, rejecting an empty `prop` or `label`
    pub fn new(prop: impl Into<String>, label: impl Into<String>) -> ExportResult<Self> {
        let prop = prop.into();
        let label = label.into();
        if prop.trim().is_empty() {
            return Err(ExportError::Validation(format!(
                "Column '{}' has an empty prop",
                label
            )));
        }
        if label.trim().is_empty() {
            return Err(ExportError::Validation(format!(
                "Column for prop '{}' has an empty label",
                prop
            )));
        }
        Ok(Self {
            prop,
            label,
            kind: None,
            formatter: None,
        })
    }

    #[must_use]
    pub fn with_type(mut self, kind: ColumnType) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&Value, &Row) -> String + Send + Sync + 'static,
    {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    pub fn formatter(&self) -> Option<&Formatter> {
        self.formatter.as_ref()
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("prop", &self.prop)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("formatter", &self.formatter.is_some())
            .finish()
    }
}

#[derive(Deserialize)]
struct RawColumn {
    #[serde(default)]
    prop: String,
    #[serde(default)]
    label: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl TryFrom<RawColumn> for Column {
    type Error = ExportError;

    fn try_from(raw: RawColumn) -> Result<Self, Self::Error> {
        let column = Column::new(raw.prop, raw.label)?;
        Ok(match raw.kind.as_deref().and_then(ColumnType::parse) {
            Some(kind) => column.with_type(kind),
            None => column,
        })
    }
}

//==============================================================================
// Export Request
//==============================================================================

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    /// Recognize a format string; anything else is unsupported
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "xlsx" => Some(ExportFormat::Xlsx),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv;charset=utf-8",
        }
    }
}

/// Sheet layout mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetLayout {
    /// One sheet per table
    #[default]
    Separate,
    /// Sub rows inlined beside their owning main row
    Combined,
}

impl<'de> Deserialize<'de> for SheetLayout {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            Some("combined") => SheetLayout::Combined,
            Some("separate") | None => SheetLayout::Separate,
            Some(other) => {
                warn!("Unknown sheet layout '{}', using separate sheets", other);
                SheetLayout::Separate
            }
        })
    }
}

/// A secondary row collection owned by main rows via `_parentId`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TableGroup {
    #[serde(deserialize_with = "lenient_vec")]
    pub columns: Vec<Column>,
    #[serde(deserialize_with = "lenient_vec")]
    pub items: Vec<Row>,
    #[serde(alias = "subTableName", deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

impl TableGroup {
    pub fn new(name: impl Into<String>, columns: Vec<Column>, items: Vec<Row>) -> Self {
        Self {
            columns,
            items,
            name: Some(name.into()),
        }
    }
}

/// Everything needed for one export call. Consumed once.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportRequest {
    #[serde(deserialize_with = "lenient_text")]
    pub format: String,
    #[serde(deserialize_with = "lenient_text")]
    pub filename: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub main_columns: Vec<Column>,
    #[serde(deserialize_with = "lenient_vec")]
    pub sub_columns: Vec<Column>,
    #[serde(deserialize_with = "lenient_vec")]
    pub selected_rows: Vec<Row>,
    #[serde(deserialize_with = "lenient_vec")]
    pub sub_items: Vec<Row>,
    #[serde(deserialize_with = "lenient_vec")]
    pub all_sub_tables: Vec<TableGroup>,
    pub sheet_config: SheetLayout,
    #[serde(deserialize_with = "lenient_row_key")]
    pub row_key: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub batch_columns: Vec<Column>,
    #[serde(deserialize_with = "lenient_vec")]
    pub batch_quantity_data: Vec<Row>,
    #[serde(deserialize_with = "lenient_number")]
    pub total_quantity: f64,
    #[serde(deserialize_with = "lenient_bool")]
    pub has_batch_data: bool,
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self {
            format: "xlsx".to_string(),
            filename: "data-export".to_string(),
            main_columns: Vec::new(),
            sub_columns: Vec::new(),
            selected_rows: Vec::new(),
            sub_items: Vec::new(),
            all_sub_tables: Vec::new(),
            sheet_config: SheetLayout::Separate,
            row_key: "id".to_string(),
            batch_columns: Vec::new(),
            batch_quantity_data: Vec::new(),
            total_quantity: 0.0,
            has_batch_data: false,
        }
    }
}

impl ExportRequest {
    /// Parse a request from JSON text
    pub fn from_json(text: &str) -> ExportResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse a request from YAML text
    pub fn from_yaml(text: &str) -> ExportResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parsed output format, `None` when unsupported
    pub fn export_format(&self) -> Option<ExportFormat> {
        ExportFormat::parse(&self.format)
    }

    /// Report duplicate labels within any one table.
    ///
    /// The exporter itself never rejects a request; this is for callers
    /// that want to surface the problem.
    pub fn validate(&self) -> ExportResult<()> {
        let mut problems = Vec::new();
        let mut check = |table: &str, columns: &[Column]| {
            let mut seen = HashSet::new();
            for column in columns {
                if !seen.insert(column.label.as_str()) {
                    problems.push(format!("{}: duplicate label '{}'", table, column.label));
                }
            }
        };

        check("mainColumns", &self.main_columns);
        check("subColumns", &self.sub_columns);
        check("batchColumns", &self.batch_columns);
        for (idx, group) in self.all_sub_tables.iter().enumerate() {
            let name = group
                .name
                .clone()
                .unwrap_or_else(|| format!("allSubTables[{}]", idx));
            check(name.as_str(), &group.columns);
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ExportError::Validation(problems.join("; ")))
        }
    }
}

//==============================================================================
// Lenient field decoding
//==============================================================================

/// Non-array input becomes empty; elements that fail to decode are skipped.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter_map(|(idx, item)| match serde_json::from_value(item) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Skipping malformed element {}: {}", idx, e);
                    None
                }
            })
            .collect(),
        serde_json::Value::Null => Vec::new(),
        other => {
            warn!("Expected an array, found {}; using an empty list", other);
            Vec::new()
        }
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    })
}

/// Any present value is kept as text; non-strings become their JSON form.
/// Missing keys fall back to the struct default.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

fn lenient_row_key<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_else(|| "id".to_string()))
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        _ => false,
    })
}
