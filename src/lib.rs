//! WMS Export - main/sub table export to Excel and CSV
//!
//! This library turns a main table, its sub tables and an optional batch
//! quantity summary into a multi-sheet `.xlsx` workbook or a single-sheet
//! `.csv` file.
//!
//! # Features
//!
//! - Separate layout (one sheet per table) or a combined sheet with one row
//!   per main/sub pair
//! - Column formatters and `date` / `number` display types
//! - Pluggable delivery (directory, memory, HTTP response)
//! - Debounce helper on Tokio timers
//! - Backend API client contract (`Transport` trait and service wrappers)
//!
//! # Example
//!
//! ```no_run
//! use wms_export::excel::{DirectoryDelivery, TabularExporter};
//! use wms_export::types::{Column, ExportRequest, Row};
//!
//! let request = ExportRequest {
//!     format: "xlsx".to_string(),
//!     filename: "orders".to_string(),
//!     main_columns: vec![Column::new("code", "Code")?],
//!     selected_rows: vec![Row::new().with("id", 1).with("code", "A1")],
//!     ..Default::default()
//! };
//!
//! let exporter = TabularExporter::new(DirectoryDelivery::new("exports"));
//! assert!(exporter.export(&request)?);
//! # Ok::<(), wms_export::error::ExportError>(())
//! ```

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod debounce;
pub mod error;
pub mod excel;
pub mod types;

// Re-export commonly used types
pub use config::ExportConfig;
pub use debounce::Debouncer;
pub use error::{ExportError, ExportResult};
pub use excel::TabularExporter;
pub use types::{Column, ColumnType, ExportFormat, ExportRequest, Row, SheetLayout, TableGroup, Value};
