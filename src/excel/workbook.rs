//! In-memory workbook built during one export call

use std::collections::HashSet;

use super::format::format_datetime;
use crate::types::Value;

/// Header row fill
pub const HEADER_FILL: u32 = 0xF2F2F2;
/// Fill for main-row cells in the combined sheet
pub const MAIN_GROUP_FILL: u32 = 0xF2F2F2;
/// Fill for the batch total row
pub const TOTAL_FILL: u32 = 0xE6F7FF;

const MAX_SHEET_NAME: usize = 31;

/// A rendered cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Blank,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Raw value without any display transform
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Blank,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => Cell::Number(*n),
            Value::Text(s) => Cell::Text(s.clone()),
            Value::Date(dt) => Cell::Text(format_datetime(dt)),
        }
    }

    /// Blank cells and empty strings
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Blank => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Text as it appears in a CSV field
    pub fn display(&self) -> String {
        match self {
            Cell::Blank => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format!("{}", n),
            Cell::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }
}

/// Bold + fill applied to a data row. `span` limits it to the leading
/// columns; `None` covers the whole row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emphasis {
    pub span: Option<usize>,
    pub fill: u32,
}

impl Emphasis {
    pub fn covers(&self, col: usize) -> bool {
        self.span.map_or(true, |span| col < span)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub cells: Vec<Cell>,
    pub emphasis: Option<Emphasis>,
}

impl SheetRow {
    pub fn plain(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            emphasis: None,
        }
    }
}

/// What a sheet holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    Main,
    SubTable,
    Batch,
    Combined,
}

/// One worksheet: header row, data rows and column widths.
///
/// Every data row is padded or truncated to the header width when the
/// sheet is written, so the grid is always rectangular.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub kind: SheetKind,
    pub name: String,
    pub headers: Vec<String>,
    /// Character-width units, one per header
    pub widths: Vec<f64>,
    pub rows: Vec<SheetRow>,
}

impl Sheet {
    pub fn new(
        kind: SheetKind,
        name: impl Into<String>,
        headers: Vec<String>,
        widths: Vec<f64>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            headers,
            widths,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: SheetRow) {
        self.rows.push(row);
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Column index by header text
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

/// Ordered collection of sheets with unique, Excel-valid names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sheet, sanitizing and de-duplicating its name
    pub fn push(&mut self, mut sheet: Sheet) {
        let taken: HashSet<String> = self.sheets.iter().map(|s| s.name.to_lowercase()).collect();
        sheet.name = unique_sheet_name(&sheet.name, &taken);
        self.sheets.push(sheet);
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// First sheet of the given kind
    pub fn find(&self, kind: SheetKind) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.kind == kind)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }
}

/// Strip characters Excel forbids in sheet names and cap the length
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').trim();
    let cleaned: String = cleaned.chars().take(MAX_SHEET_NAME).collect();
    if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned
    }
}

/// Excel compares sheet names case-insensitively
fn unique_sheet_name(name: &str, taken: &HashSet<String>) -> String {
    let base = sanitize_sheet_name(name);
    if !taken.contains(&base.to_lowercase()) {
        return base;
    }
    let mut n = 2;
    loop {
        let suffix = format!(" ({})", n);
        let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
        let candidate: String = base.chars().take(keep).collect::<String>() + &suffix;
        if !taken.contains(&candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}
