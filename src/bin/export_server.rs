//! WMS Export API Server binary

use clap::Parser;
use std::path::PathBuf;
use wms_export::api::{run_api_server, ApiConfig};
use wms_export::config::ExportConfig;

#[derive(Parser, Debug)]
#[command(name = "wms-export-server")]
#[command(version)]
#[command(about = "WMS Export API Server - HTTP export of main/sub tables to Excel or CSV")]
#[command(long_about = r#"
WMS Export API Server

Endpoints:
  - POST /api/v1/export  - Render an export request, returns the file
  - GET  /health         - Health check
  - GET  /version        - Server version info
  - GET  /               - API documentation

Example usage:
  wms-export-server                           # Start on localhost:8080
  wms-export-server --host 0.0.0.0 --port 3000

  curl -X POST http://localhost:8080/api/v1/export \
    -H "Content-Type: application/json" \
    -d '{"format": "csv", "mainColumns": [{"prop": "code", "label": "Code"}],
         "selectedRows": [{"id": 1, "code": "A1"}]}' -OJ
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "WMS_EXPORT_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "WMS_EXPORT_PORT")]
    port: u16,

    /// YAML file overriding sheet names and labels
    #[arg(short, long, env = "WMS_EXPORT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let export = match &args.config {
        Some(path) => ExportConfig::load(path)?,
        None => ExportConfig::default(),
    };

    run_api_server(ApiConfig {
        host: args.host,
        port: args.port,
        export,
    })
    .await
}
