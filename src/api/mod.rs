//! Export API Server module
//!
//! HTTP REST front end for the exporter.
//! Run with `wms-export-server`.

pub mod handlers;
pub mod server;

pub use server::{create_router, run_api_server, ApiConfig, AppState};
