//! Export configuration
//!
//! Sheet names, column prefixes and sentinel labels used by the exporter.
//! Defaults match the stock admin UI; a YAML file can override any subset.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ExportResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Main table sheet
    pub main_sheet: String,
    /// Sheet for the primary sub table
    pub sub_sheet: String,
    /// Single-sheet combined layout
    pub combined_sheet: String,
    /// Batch quantity summary sheet
    pub batch_sheet: String,
    /// Leading column of every sub table sheet
    pub parent_column: String,
    /// Combined-sheet prefix for main table columns
    pub main_prefix: String,
    /// Combined-sheet prefix for the primary sub table
    pub sub_prefix: String,
    /// Base name for unnamed additional sub tables, numbered from 1
    pub unnamed_table: String,
    /// Batch-number cell of the synthetic total row
    pub total_label: String,
    /// Batch column receiving the total quantity
    pub quantity_prop: String,
    /// Batch column receiving the total label
    pub batch_number_prop: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            main_sheet: "Main".to_string(),
            sub_sheet: "Sub Items".to_string(),
            combined_sheet: "Combined".to_string(),
            batch_sheet: "Batch Totals".to_string(),
            parent_column: "Parent Item".to_string(),
            main_prefix: "main".to_string(),
            sub_prefix: "sub".to_string(),
            unnamed_table: "Sub-table".to_string(),
            total_label: "Total".to_string(),
            quantity_prop: "quantity".to_string(),
            batch_number_prop: "batchNumber".to_string(),
        }
    }
}

impl ExportConfig {
    /// Load overrides from a YAML file
    pub fn load(path: &Path) -> ExportResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> ExportResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Name of the n-th (1-based) unnamed additional sub table
    pub fn unnamed_table_name(&self, n: usize) -> String {
        format!("{} {}", self.unnamed_table, n)
    }
}
