//! Tabular exporter: export request → delivered `.xlsx` / `.csv` file

use tracing::{info, warn};

use super::builder::SheetBuilder;
use super::delivery::{Delivery, ExportFile};
use super::workbook::{Sheet, SheetKind, Workbook};
use super::writer::{to_csv_bytes, to_xlsx_bytes};
use crate::config::ExportConfig;
use crate::error::ExportResult;
use crate::types::{ExportFormat, ExportRequest};

/// Converts main/sub tables into a spreadsheet and hands it to a
/// [`Delivery`] sink
pub struct TabularExporter<D: Delivery> {
    config: ExportConfig,
    delivery: D,
}

impl<D: Delivery> TabularExporter<D> {
    /// Create an exporter with the default sheet labels
    pub fn new(delivery: D) -> Self {
        Self::with_config(ExportConfig::default(), delivery)
    }

    pub fn with_config(config: ExportConfig, delivery: D) -> Self {
        Self { config, delivery }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn delivery(&self) -> &D {
        &self.delivery
    }

    /// Build the in-memory workbook without serializing it
    pub fn build_workbook(&self, request: &ExportRequest) -> Workbook {
        SheetBuilder::new(&self.config).build(request)
    }

    /// Render the request into file bytes.
    ///
    /// Returns `Ok(None)` for an unsupported format. Malformed or missing
    /// optional input never fails; only the serializer can.
    pub fn render(&self, request: &ExportRequest) -> ExportResult<Option<ExportFile>> {
        let Some(format) = request.export_format() else {
            warn!(format = %request.format, "Unsupported export format");
            return Ok(None);
        };

        let workbook = self.build_workbook(request);
        let filename = format!("{}.{}", request.filename, format.extension());

        let bytes = match format {
            ExportFormat::Xlsx => to_xlsx_bytes(&workbook)?,
            ExportFormat::Csv => match csv_sheet(&workbook) {
                Some(sheet) => to_csv_bytes(sheet)?,
                None => Vec::new(),
            },
        };

        info!(
            file = %filename,
            sheets = workbook.len(),
            bytes = bytes.len(),
            "Rendered export"
        );

        Ok(Some(ExportFile {
            filename,
            content_type: format.content_type(),
            bytes,
        }))
    }

    /// Render and deliver.
    ///
    /// `Ok(true)` once the file is delivered, `Ok(false)` for an
    /// unsupported format (nothing is delivered).
    pub fn export(&self, request: &ExportRequest) -> ExportResult<bool> {
        match self.render(request)? {
            Some(file) => {
                self.delivery.deliver(&file)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// CSV holds a single sheet: combined, else main, else the first one
pub fn csv_sheet(workbook: &Workbook) -> Option<&Sheet> {
    workbook
        .find(SheetKind::Combined)
        .or_else(|| workbook.find(SheetKind::Main))
        .or_else(|| workbook.sheets().first())
}
