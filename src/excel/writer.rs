//! Serialization of the in-memory workbook to `.xlsx` and `.csv` bytes

use std::borrow::Cow;

use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook as XlsxWorkbook, Worksheet};
use tracing::warn;

use super::workbook::{Cell, Sheet, Workbook, HEADER_FILL};
use crate::error::{ExportError, ExportResult};

/// Longest string Excel stores in one cell
pub const MAX_CELL_CHARS: usize = 32_767;

/// Clip text to the per-cell character limit
fn cell_text(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => {
            warn!(
                chars = text.chars().count(),
                limit = MAX_CELL_CHARS,
                "Truncating cell text"
            );
            Cow::Owned(text[..cut].to_string())
        }
        None => Cow::Borrowed(text),
    }
}

/// Bordered grid cell, optionally bold with a solid fill
fn grid_format(bold: bool, fill: Option<u32>) -> Format {
    let mut format = Format::new()
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::Black);
    if bold {
        format = format.set_bold();
    }
    if let Some(rgb) = fill {
        format = format.set_background_color(Color::RGB(rgb));
    }
    format
}

/// Write every sheet into an `.xlsx` package
pub fn to_xlsx_bytes(workbook: &Workbook) -> ExportResult<Vec<u8>> {
    let mut xlsx = XlsxWorkbook::new();

    for sheet in workbook.sheets() {
        let worksheet = xlsx.add_worksheet();
        worksheet.set_name(&sheet.name).map_err(|e| {
            ExportError::Workbook(format!("Failed to set worksheet name '{}': {}", sheet.name, e))
        })?;
        write_sheet(worksheet, sheet)?;
    }

    xlsx.save_to_buffer()
        .map_err(|e| ExportError::Workbook(format!("Failed to save workbook: {}", e)))
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> ExportResult<()> {
    let header_format = grid_format(true, Some(HEADER_FILL));
    let plain_format = grid_format(false, None);

    for (col_idx, width) in sheet.widths.iter().enumerate() {
        worksheet.set_column_width(col_idx as u16, *width)?;
    }

    for (col_idx, header) in sheet.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col_idx as u16, cell_text(header), &header_format)
            .map_err(|e| ExportError::Workbook(format!("Failed to write header: {}", e)))?;
    }

    for (row_idx, row) in sheet.rows.iter().enumerate() {
        let excel_row = (row_idx + 1) as u32; // +1 for header row
        let emphasis_format = row.emphasis.map(|e| (e, grid_format(true, Some(e.fill))));

        for col_idx in 0..sheet.column_count() {
            let format = match &emphasis_format {
                Some((emphasis, format)) if emphasis.covers(col_idx) => format,
                _ => &plain_format,
            };
            match row.cells.get(col_idx) {
                Some(cell) => write_cell(worksheet, excel_row, col_idx as u16, cell, format)?,
                None => write_cell(worksheet, excel_row, col_idx as u16, &Cell::Blank, format)?,
            }
        }
    }

    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    format: &Format,
) -> ExportResult<()> {
    match cell {
        Cell::Blank => worksheet.write_blank(row, col, format),
        Cell::Text(s) => worksheet.write_string_with_format(row, col, cell_text(s), format),
        Cell::Number(n) => worksheet.write_number_with_format(row, col, *n, format),
        Cell::Bool(b) => worksheet.write_boolean_with_format(row, col, *b, format),
    }
    .map_err(|e| ExportError::Workbook(format!("Failed to write cell ({}, {}): {}", row, col, e)))?;
    Ok(())
}

/// Serialize one sheet as CSV: header row, then data rows padded to the
/// header width
pub fn to_csv_bytes(sheet: &Sheet) -> ExportResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    if !sheet.headers.is_empty() {
        writer.write_record(&sheet.headers)?;
    }

    let width = sheet.column_count();
    for row in &sheet.rows {
        let record: Vec<String> = (0..width)
            .map(|col| row.cells.get(col).map(Cell::display).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(format!("Failed to flush CSV: {}", e)))
}
