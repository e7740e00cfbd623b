//! Exporter integration tests
//!
//! Every workbook is written to disk and read back with calamine.

use pretty_assertions::assert_eq;
use regex::Regex;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use tempfile::TempDir;
use wms_export::excel::{
    DirectoryDelivery, MemoryDelivery, SheetSnapshot, TabularExporter, WorkbookReader,
};
use wms_export::types::{Column, ExportRequest, Row, SheetLayout, TableGroup};
use wms_export::ExportConfig;

fn col(prop: &str, label: &str) -> Column {
    Column::new(prop, label).unwrap()
}

fn export_to(dir: &Path, request: &ExportRequest) -> bool {
    TabularExporter::new(DirectoryDelivery::new(dir))
        .export(request)
        .unwrap()
}

fn read_back(path: &Path) -> Vec<SheetSnapshot> {
    WorkbookReader::read_path(path).unwrap()
}

fn sheet<'a>(sheets: &'a [SheetSnapshot], name: &str) -> &'a SheetSnapshot {
    sheets
        .iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("missing sheet {}", name))
}

/// Three orders: two lines and one box on the first, nothing on the
/// second, one box on the third
fn orders_json(layout: &str) -> String {
    format!(
        r#"{{
            "format": "xlsx",
            "filename": "orders",
            "sheetConfig": "{}",
            "mainColumns": [
                {{"prop": "code", "label": "Code"}},
                {{"prop": "customer", "label": "Customer"}}
            ],
            "selectedRows": [
                {{"id": 1, "code": "SO-1", "customer": "Ann"}},
                {{"id": 2, "code": "SO-2", "customer": "Bo"}},
                {{"id": 3, "code": "SO-3", "customer": "Cy"}}
            ],
            "allSubTables": [
                {{
                    "subTableName": "Lines",
                    "columns": [{{"prop": "sku", "label": "SKU"}}],
                    "items": [
                        {{"sku": "A", "_parentId": 1, "_parentTitle": "SO-1"}},
                        {{"sku": "B", "_parentId": 1, "_parentTitle": "SO-1"}}
                    ]
                }},
                {{
                    "subTableName": "Packaging",
                    "columns": [{{"prop": "box", "label": "Box"}}],
                    "items": [
                        {{"box": "BOX-L", "_parentId": 1, "_parentTitle": "SO-1"}},
                        {{"box": "BOX-S", "_parentId": 3, "_parentTitle": "SO-3"}}
                    ]
                }}
            ]
        }}"#,
        layout
    )
}

// ═══════════════════════════════════════════════════════════════════════════
// RETURN VALUE AND DELIVERY
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_single_main_row_export() {
    let dir = TempDir::new().unwrap();
    let request = ExportRequest::from_json(
        r#"{
            "format": "xlsx",
            "sheetConfig": "separate",
            "mainColumns": [{"prop": "code", "label": "Code"}],
            "selectedRows": [{"id": 1, "code": "A1"}]
        }"#,
    )
    .unwrap();

    assert!(export_to(dir.path(), &request));

    let sheets = read_back(&dir.path().join("data-export.xlsx"));
    assert_eq!(sheets.len(), 1);
    assert_eq!(sheets[0].name, "Main");
    assert_eq!(sheets[0].rows, vec![vec!["Code"], vec!["A1"]]);
}

#[test]
fn test_unknown_format_produces_no_file() {
    let dir = TempDir::new().unwrap();
    let mut request = ExportRequest::from_json(&orders_json("separate")).unwrap();
    request.format = "unknown".to_string();

    assert!(!export_to(dir.path(), &request));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_filename_cannot_escape_output_dir() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let mut request = ExportRequest::from_json(&orders_json("separate")).unwrap();
    request.filename = "../escaped".to_string();

    assert!(export_to(&out, &request));
    assert!(out.join("escaped.xlsx").exists());
    assert!(!dir.path().join("escaped.xlsx").exists());
}

// ═══════════════════════════════════════════════════════════════════════════
// SEPARATE LAYOUT
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_main_sheet_has_header_plus_one_row_per_main_row() {
    let dir = TempDir::new().unwrap();
    let request = ExportRequest::from_json(&orders_json("separate")).unwrap();
    assert!(export_to(dir.path(), &request));

    let sheets = read_back(&dir.path().join("orders.xlsx"));
    let main = sheet(&sheets, "Main");
    assert_eq!(main.rows.len(), 4);
    assert_eq!(main.column_count(), 2);
    assert_eq!(main.headers(), ["Code", "Customer"]);
    assert_eq!(main.value(2, "Customer"), Some("Cy"));
}

#[test]
fn test_separate_layout_sheet_per_group() {
    let dir = TempDir::new().unwrap();
    let request = ExportRequest::from_json(&orders_json("separate")).unwrap();
    assert!(export_to(dir.path(), &request));

    let sheets = read_back(&dir.path().join("orders.xlsx"));
    let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Main", "Sub Items", "Packaging"]);

    let lines = sheet(&sheets, "Sub Items");
    assert_eq!(lines.headers(), ["Parent Item", "SKU"]);
    assert_eq!(lines.data_rows().len(), 2);

    let packaging = sheet(&sheets, "Packaging");
    assert_eq!(
        packaging.data_rows(),
        [vec!["SO-1", "BOX-L"], vec!["SO-3", "BOX-S"]]
    );
}

#[test]
fn test_invalid_sheet_names_are_cleaned() {
    let dir = TempDir::new().unwrap();
    let request = ExportRequest {
        filename: "names".to_string(),
        main_columns: vec![col("code", "Code")],
        selected_rows: vec![Row::new().with("id", 1).with("code", "A1")],
        sub_columns: vec![col("sku", "SKU")],
        sub_items: vec![Row::new().with("sku", "X").with_parent(1, "A1")],
        all_sub_tables: vec![
            TableGroup::new(
                "Returns/Refunds: 2024",
                vec![col("qty", "Qty")],
                vec![Row::new().with("qty", 1).with_parent(1, "A1")],
            ),
            TableGroup::new(
                "sub items",
                vec![col("qty", "Qty")],
                vec![Row::new().with("qty", 2).with_parent(1, "A1")],
            ),
        ],
        ..Default::default()
    };
    assert!(export_to(dir.path(), &request));

    let sheets = read_back(&dir.path().join("names.xlsx"));
    let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Main", "Sub Items", "ReturnsRefunds 2024", "sub items (2)"]
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// COMBINED LAYOUT
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_combined_rows_per_main_row() {
    let dir = TempDir::new().unwrap();
    let request = ExportRequest::from_json(&orders_json("combined")).unwrap();
    assert!(export_to(dir.path(), &request));

    let sheets = read_back(&dir.path().join("orders.xlsx"));
    assert_eq!(sheets.len(), 1);
    let combined = sheet(&sheets, "Combined");

    assert_eq!(
        combined.headers(),
        ["main_Code", "main_Customer", "sub_SKU", "Packaging_Box"]
    );
    // max(1, matches): 3 + 1 + 1
    assert_eq!(combined.data_rows().len(), 5);

    let first_column: Vec<&str> = combined
        .data_rows()
        .iter()
        .map(|r| r[0].as_str())
        .collect();
    assert_eq!(first_column, vec!["SO-1", "", "", "SO-2", "SO-3"]);

    assert_eq!(combined.value(1, "sub_SKU"), Some("B"));
    assert_eq!(combined.value(2, "Packaging_Box"), Some("BOX-L"));
    assert_eq!(combined.value(3, "sub_SKU"), Some(""));
    assert_eq!(combined.value(4, "Packaging_Box"), Some("BOX-S"));
}

#[test]
fn test_combined_without_sub_rows_falls_back_to_main() {
    let dir = TempDir::new().unwrap();
    let request = ExportRequest {
        filename: "plain".to_string(),
        sheet_config: SheetLayout::Combined,
        main_columns: vec![col("code", "Code")],
        selected_rows: vec![Row::new().with("id", 1).with("code", "A1")],
        ..Default::default()
    };
    assert!(export_to(dir.path(), &request));

    let sheets = read_back(&dir.path().join("plain.xlsx"));
    let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Main"]);
}

// ═══════════════════════════════════════════════════════════════════════════
// BATCH SHEET
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_batch_sheet_total_row() {
    let dir = TempDir::new().unwrap();
    let request = ExportRequest::from_json(
        r#"{
            "filename": "batches",
            "mainColumns": [{"prop": "code", "label": "Code"}],
            "selectedRows": [{"id": 1, "code": "A1"}],
            "hasBatchData": true,
            "batchColumns": [
                {"prop": "batchNumber", "label": "Batch"},
                {"prop": "quantity", "label": "Quantity"}
            ],
            "batchQuantityData": [
                {"batchNumber": "B-01", "quantity": 10},
                {"batchNumber": "B-02", "quantity": 5}
            ],
            "totalQuantity": 15
        }"#,
    )
    .unwrap();
    assert!(export_to(dir.path(), &request));

    let sheets = read_back(&dir.path().join("batches.xlsx"));
    let batch = sheet(&sheets, "Batch Totals");
    assert_eq!(batch.data_rows().len(), 3);
    assert_eq!(batch.data_rows()[2], vec!["Total", "15"]);
    assert_eq!(batch.value(0, "Quantity"), Some("10"));
}

#[test]
fn test_batch_sheet_needs_flag() {
    let dir = TempDir::new().unwrap();
    let request = ExportRequest::from_json(
        r#"{
            "filename": "batches",
            "mainColumns": [{"prop": "code", "label": "Code"}],
            "selectedRows": [{"id": 1, "code": "A1"}],
            "hasBatchData": false,
            "batchColumns": [{"prop": "quantity", "label": "Quantity"}],
            "batchQuantityData": [{"quantity": 10}]
        }"#,
    )
    .unwrap();
    assert!(export_to(dir.path(), &request));

    let sheets = read_back(&dir.path().join("batches.xlsx"));
    assert_eq!(sheets.len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// VALUE FORMATTING
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_typed_columns_and_formatters() {
    let dir = TempDir::new().unwrap();
    let mut request = ExportRequest::from_json(
        r#"{
            "filename": "typed",
            "mainColumns": [
                {"prop": "created", "label": "Created", "type": "date"},
                {"prop": "amount", "label": "Amount", "type": "number"},
                {"prop": "qty", "label": "Qty"}
            ],
            "selectedRows": [
                {"id": 1, "created": "2024-03-05T10:20:00Z", "amount": 1234567.891, "qty": 4, "status": 1},
                {"id": 2, "created": null, "amount": "n/a", "qty": 0, "status": 0}
            ]
        }"#,
    )
    .unwrap();
    request.main_columns.push(
        col("status", "Status").with_formatter(|value, _row| match value.as_f64() {
            Some(s) if s > 0.0 => "Active".to_string(),
            _ => "Inactive".to_string(),
        }),
    );
    assert!(export_to(dir.path(), &request));

    let sheets = read_back(&dir.path().join("typed.xlsx"));
    let main = sheet(&sheets, "Main");
    assert_eq!(
        main.data_rows(),
        [
            vec!["2024/3/5", "1,234,567.891", "4", "Active"],
            vec!["", "n/a", "0", "Inactive"],
        ]
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_config_renames_sheets_and_prefixes() {
    let config = ExportConfig::from_yaml(
        "main_sheet: Orders\ncombined_sheet: Everything\nmain_prefix: order\n",
    )
    .unwrap();
    let request = ExportRequest::from_json(&orders_json("combined")).unwrap();
    let exporter = TabularExporter::with_config(config, MemoryDelivery::new());
    assert!(exporter.export(&request).unwrap());

    let files = exporter.delivery().take();
    let sheets = WorkbookReader::read_bytes(&files[0].bytes).unwrap();
    assert_eq!(sheets[0].name, "Everything");
    assert_eq!(sheets[0].headers()[0], "order_Code");
    assert_eq!(sheets[0].headers()[2], "sub_SKU");
}

// ═══════════════════════════════════════════════════════════════════════════
// IDEMPOTENCE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_repeated_exports_match() {
    let request = ExportRequest::from_json(&orders_json("combined")).unwrap();
    let exporter = TabularExporter::new(MemoryDelivery::new());

    assert!(exporter.export(&request).unwrap());
    assert!(exporter.export(&request).unwrap());
    let files = exporter.delivery().take();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].filename, files[1].filename);
    assert_eq!(
        WorkbookReader::read_bytes(&files[0].bytes).unwrap(),
        WorkbookReader::read_bytes(&files[1].bytes).unwrap()
    );

    let mut csv_request = request.clone();
    csv_request.format = "csv".to_string();
    let first = exporter.render(&csv_request).unwrap().unwrap();
    let second = exporter.render(&csv_request).unwrap().unwrap();
    assert_eq!(first.bytes, second.bytes);
}

// ═══════════════════════════════════════════════════════════════════════════
// CSV
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_csv_uses_combined_sheet() {
    let dir = TempDir::new().unwrap();
    let mut request = ExportRequest::from_json(&orders_json("combined")).unwrap();
    request.format = "csv".to_string();
    assert!(export_to(dir.path(), &request));

    let content = fs::read_to_string(dir.path().join("orders.csv")).unwrap();
    assert_eq!(
        content,
        "main_Code,main_Customer,sub_SKU,Packaging_Box\n\
         SO-1,Ann,A,\n\
         ,,B,\n\
         ,,,BOX-L\n\
         SO-2,Bo,,\n\
         SO-3,Cy,,BOX-S\n"
    );
}

#[test]
fn test_csv_separate_layout_uses_main_sheet() {
    let dir = TempDir::new().unwrap();
    let mut request = ExportRequest::from_json(&orders_json("separate")).unwrap();
    request.format = "csv".to_string();
    assert!(export_to(dir.path(), &request));

    let content = fs::read_to_string(dir.path().join("orders.csv")).unwrap();
    assert_eq!(content, "Code,Customer\nSO-1,Ann\nSO-2,Bo\nSO-3,Cy\n");
}

// ═══════════════════════════════════════════════════════════════════════════
// CELL STYLES
// ═══════════════════════════════════════════════════════════════════════════

/// Style resolved from `xl/styles.xml` for one cell
#[derive(Debug, PartialEq)]
struct CellStyle {
    bold: bool,
    fill: Option<String>,
    thin_border: bool,
}

const PLAIN: CellStyle = CellStyle {
    bold: false,
    fill: None,
    thin_border: true,
};

fn emphasized(fill: &str) -> CellStyle {
    CellStyle {
        bold: true,
        fill: Some(fill.to_string()),
        thin_border: true,
    }
}

fn package_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut xml = String::new();
    part.read_to_string(&mut xml).unwrap();
    xml
}

/// Inner XML of every `<tag>` element, in document order
fn elements(xml: &str, tag: &str) -> Vec<String> {
    let re = Regex::new(&format!(r"(?s)<{}(?:\s[^>]*)?>(.*?)</{}>", tag, tag)).unwrap();
    re.captures_iter(xml).map(|c| c[1].to_string()).collect()
}

fn index_attr(tag: &str, name: &str) -> usize {
    Regex::new(&format!(r#"\s{}="(\d+)""#, name))
        .unwrap()
        .captures(tag)
        .map_or(0, |c| c[1].parse().unwrap())
}

fn cell_style(styles: &str, sheet_xml: &str, cell_ref: &str) -> CellStyle {
    let cell = Regex::new(&format!(r#"<c r="{}"[^>]*>"#, cell_ref))
        .unwrap()
        .find(sheet_xml)
        .unwrap_or_else(|| panic!("missing cell {}", cell_ref))
        .as_str()
        .to_string();

    let cell_xfs = Regex::new(r"(?s)<cellXfs[^>]*>(.*?)</cellXfs>")
        .unwrap()
        .captures(styles)
        .unwrap()[1]
        .to_string();
    let xfs: Vec<&str> = Regex::new(r"<xf\s[^>]*>")
        .unwrap()
        .find_iter(&cell_xfs)
        .map(|m| m.as_str())
        .collect();
    let xf = xfs[index_attr(&cell, "s")];

    let font = &elements(styles, "font")[index_attr(xf, "fontId")];
    let fill = &elements(styles, "fill")[index_attr(xf, "fillId")];
    let border = &elements(styles, "border")[index_attr(xf, "borderId")];

    let fill_rgb = Regex::new(r#"rgb="[0-9A-Fa-f]{2}([0-9A-Fa-f]{6})""#).unwrap();
    CellStyle {
        bold: font.contains("<b/>"),
        fill: fill
            .contains(r#"patternType="solid""#)
            .then(|| fill_rgb.captures(fill).map(|c| c[1].to_uppercase()))
            .flatten(),
        thin_border: ["left", "right", "top", "bottom"]
            .iter()
            .all(|side| border.contains(&format!(r#"<{} style="thin""#, side))),
    }
}

#[test]
fn test_written_cells_carry_grid_styles() {
    let mut request = ExportRequest::from_json(&orders_json("combined")).unwrap();
    request.has_batch_data = true;
    request.batch_columns = vec![col("batchNumber", "Batch"), col("quantity", "Quantity")];
    request.batch_quantity_data = vec![
        Row::new().with("batchNumber", "B-01").with("quantity", 10),
        Row::new().with("batchNumber", "B-02").with("quantity", 5),
    ];
    request.total_quantity = 15.0;

    let exporter = TabularExporter::new(MemoryDelivery::new());
    let file = exporter.render(&request).unwrap().unwrap();
    let names: Vec<String> = WorkbookReader::read_bytes(&file.bytes)
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["Batch Totals", "Combined"]);

    let styles = package_part(&file.bytes, "xl/styles.xml");
    let batch = package_part(&file.bytes, "xl/worksheets/sheet1.xml");
    let combined = package_part(&file.bytes, "xl/worksheets/sheet2.xml");

    // Header row
    assert_eq!(cell_style(&styles, &batch, "A1"), emphasized("F2F2F2"));
    assert_eq!(cell_style(&styles, &combined, "D1"), emphasized("F2F2F2"));

    // Batch data rows, then the total row
    assert_eq!(cell_style(&styles, &batch, "A2"), PLAIN);
    assert_eq!(cell_style(&styles, &batch, "B3"), PLAIN);
    assert_eq!(cell_style(&styles, &batch, "A4"), emphasized("E6F7FF"));
    assert_eq!(cell_style(&styles, &batch, "B4"), emphasized("E6F7FF"));

    // Main columns of a group's first row only
    assert_eq!(cell_style(&styles, &combined, "A2"), emphasized("F2F2F2"));
    assert_eq!(cell_style(&styles, &combined, "B2"), emphasized("F2F2F2"));
    assert_eq!(cell_style(&styles, &combined, "C2"), PLAIN);
    assert_eq!(cell_style(&styles, &combined, "C3"), PLAIN);
}
