use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::ExportConfig;
use crate::error::{ExportError, ExportResult};
use crate::excel::{DirectoryDelivery, TabularExporter, WorkbookReader};
use crate::types::ExportRequest;

/// Read a request file; `.yaml`/`.yml` as YAML, anything else as JSON
pub fn load_request(path: &Path) -> ExportResult<ExportRequest> {
    let content = fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);

    if is_yaml {
        ExportRequest::from_yaml(&content)
    } else {
        ExportRequest::from_json(&content)
    }
}

/// Execute the export command
pub fn export(
    request_path: PathBuf,
    out_dir: PathBuf,
    format: Option<String>,
    config_path: Option<PathBuf>,
    verbose: bool,
) -> ExportResult<()> {
    println!("{}", "📦 WMS Export".bold().green());
    println!("   Request: {}", request_path.display());
    println!("   Output:  {}\n", out_dir.display());

    let config = match &config_path {
        Some(path) => {
            if verbose {
                println!("{}", format!("⚙️  Loading config {}...", path.display()).cyan());
            }
            ExportConfig::load(path)?
        }
        None => ExportConfig::default(),
    };

    let mut request = load_request(&request_path)?;
    if let Some(format) = format {
        request.format = format;
    }

    if let Err(e) = request.validate() {
        warn!("{}", e);
        println!("{} {}", "⚠️ ".yellow(), e.to_string().yellow());
    }

    let exporter = TabularExporter::with_config(config, DirectoryDelivery::new(&out_dir));

    if verbose {
        let workbook = exporter.build_workbook(&request);
        println!("{}", "📊 Sheets:".cyan());
        for sheet in workbook.sheets() {
            println!(
                "   {} ({} rows × {} columns)",
                sheet.name.bright_blue().bold(),
                sheet.rows.len(),
                sheet.column_count()
            );
        }
        println!();
    }

    if !exporter.export(&request)? {
        return Err(ExportError::Validation(format!(
            "Unsupported export format: '{}' (expected xlsx or csv)",
            request.format
        )));
    }

    let extension = request
        .export_format()
        .map(|f| f.extension())
        .unwrap_or_default();
    let target = exporter
        .delivery()
        .target(&format!("{}.{}", request.filename, extension));
    println!("{}", "✅ Export Complete!".bold().green());
    println!("   File: {}\n", target.display());

    Ok(())
}

/// Execute the inspect command
pub fn inspect(file: PathBuf) -> ExportResult<()> {
    println!("{}", "🔍 WMS Export - Workbook Inspection".bold().green());
    println!("   File: {}\n", file.display());

    let sheets = WorkbookReader::read_path(&file)?;
    if sheets.is_empty() {
        println!("{}", "   (no sheets)".yellow());
        return Ok(());
    }

    for sheet in &sheets {
        println!(
            "   📄 {} ({} data rows × {} columns)",
            sheet.name.bright_blue().bold(),
            sheet.data_rows().len(),
            sheet.column_count()
        );
        if !sheet.headers().is_empty() {
            println!("      {}", sheet.headers().join(" | ").cyan());
        }
    }
    println!();

    Ok(())
}
