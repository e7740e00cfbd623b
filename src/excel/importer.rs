//! Workbook reader - reads an exported `.xlsx` back into plain text grids

use calamine::{open_workbook, open_workbook_from_rs, Data, Range, Reader, Xlsx};
use std::io::Cursor;
use std::path::Path;

use crate::error::{ExportError, ExportResult};

/// Text contents of one worksheet
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSnapshot {
    pub name: String,
    /// All used rows, header included
    pub rows: Vec<Vec<String>>,
}

impl SheetSnapshot {
    pub fn headers(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or_default()
    }

    /// Rows after the header
    pub fn data_rows(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or_default()
    }

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Value at data row `row` under `header`
    pub fn value(&self, row: usize, header: &str) -> Option<&str> {
        let col = self.headers().iter().position(|h| h == header)?;
        self.data_rows().get(row)?.get(col).map(String::as_str)
    }
}

/// Reads `.xlsx` workbooks produced by the exporter
pub struct WorkbookReader;

impl WorkbookReader {
    /// Read every sheet of a workbook on disk
    pub fn read_path<P: AsRef<Path>>(path: P) -> ExportResult<Vec<SheetSnapshot>> {
        let mut workbook: Xlsx<_> = open_workbook(path.as_ref())
            .map_err(|e| ExportError::Read(format!("Failed to open Excel file: {}", e)))?;
        Self::read_sheets(&mut workbook)
    }

    /// Read every sheet of an in-memory workbook
    pub fn read_bytes(bytes: &[u8]) -> ExportResult<Vec<SheetSnapshot>> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| ExportError::Read(format!("Failed to open Excel data: {}", e)))?;
        Self::read_sheets(&mut workbook)
    }

    fn read_sheets<RS>(workbook: &mut Xlsx<RS>) -> ExportResult<Vec<SheetSnapshot>>
    where
        RS: std::io::Read + std::io::Seek,
    {
        let sheet_names = workbook.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(sheet_names.len());

        for name in sheet_names {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| ExportError::Read(format!("Failed to read sheet '{}': {}", name, e)))?;
            sheets.push(SheetSnapshot {
                rows: Self::range_rows(&range),
                name,
            });
        }

        Ok(sheets)
    }

    fn range_rows(range: &Range<Data>) -> Vec<Vec<String>> {
        if range.is_empty() {
            return Vec::new();
        }
        range
            .rows()
            .map(|row| row.iter().map(Self::cell_text).collect())
            .collect()
    }

    fn cell_text(cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            Data::String(s) => s.clone(),
            Data::Float(f) => format!("{}", f),
            Data::Int(i) => i.to_string(),
            Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            other => other.to_string(),
        }
    }
}
