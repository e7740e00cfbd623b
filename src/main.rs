use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wms_export::cli;

#[derive(Parser)]
#[command(name = "wms-export")]
#[command(about = "Export warehouse tables to Excel (.xlsx) or CSV")]
#[command(long_about = "WMS Export - main/sub table export to Excel and CSV

COMMANDS:
  export   - Render an export request file into .xlsx or .csv
  inspect  - List the sheets and headers of an exported workbook

EXAMPLES:
  wms-export export request.json -o exports/
  wms-export export request.yaml -f csv
  wms-export inspect exports/orders.xlsx

Set RUST_LOG=wms_export=debug for per-sheet build logs.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Render an export request into a spreadsheet file.

The request is read as YAML for .yaml/.yml files and as JSON otherwise.
It carries mainColumns/selectedRows, optional subColumns/subItems or
allSubTables, batch data and sheetConfig (separate | combined).

The file is written as <filename>.<format> inside the output directory.
An unsupported format writes nothing and exits with an error.")]
    /// Export a request file to .xlsx or .csv
    Export {
        /// Request file (JSON or YAML)
        request: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Override the request's format (xlsx or csv)
        #[arg(short, long)]
        format: Option<String>,

        /// YAML file overriding sheet names and labels
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show the sheets being written
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show sheets, sizes and headers of an .xlsx file
    Inspect {
        /// Workbook to inspect
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wms_export=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            request,
            output,
            format,
            config,
            verbose,
        } => cli::export(request, output, format, config, verbose)?,

        Commands::Inspect { file } => cli::inspect(file)?,
    }

    Ok(())
}
