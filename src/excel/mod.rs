//! Spreadsheet export
//!
//! - Build: export request → in-memory workbook (main, sub table, batch and
//!   combined sheets)
//! - Write: workbook → `.xlsx` (every sheet) or `.csv` (one sheet)
//! - Deliver: hand the file to a directory, memory buffer or HTTP response
//! - Read back: `.xlsx` → text grids for inspection

mod builder;
mod delivery;
mod exporter;
pub mod format;
mod importer;
mod workbook;
mod writer;

pub use builder::SheetBuilder;
pub use delivery::{Delivery, DirectoryDelivery, ExportFile, MemoryDelivery};
pub use exporter::{csv_sheet, TabularExporter};
pub use format::format_value;
pub use importer::{SheetSnapshot, WorkbookReader};
pub use workbook::{
    sanitize_sheet_name, Cell, Emphasis, Sheet, SheetKind, SheetRow, Workbook, HEADER_FILL,
    MAIN_GROUP_FILL, TOTAL_FILL,
};
pub use writer::{to_csv_bytes, to_xlsx_bytes};
