//! Sheet construction: export request → in-memory workbook

use tracing::debug;

use super::format::format_value;
use super::workbook::{
    Cell, Emphasis, Sheet, SheetKind, SheetRow, Workbook, MAIN_GROUP_FILL, TOTAL_FILL,
};
use crate::config::ExportConfig;
use crate::types::{Column, ExportRequest, Row, SheetLayout};

const PARENT_COLUMN_WIDTH: f64 = 20.0;
const MIN_COLUMN_WIDTH: f64 = 12.0;

/// A sub table after normalization, with its resolved sheet name and
/// combined-sheet prefix
#[derive(Debug)]
struct ResolvedGroup<'r> {
    sheet_name: String,
    prefix: String,
    columns: &'r [Column],
    items: &'r [Row],
}

/// Builds the workbook for one export request
pub struct SheetBuilder<'a> {
    config: &'a ExportConfig,
}

impl<'a> SheetBuilder<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Build every sheet the request calls for.
    ///
    /// Never fails: missing or empty inputs simply produce fewer sheets, and
    /// a request with nothing to show yields a header-only main sheet.
    pub fn build(&self, request: &ExportRequest) -> Workbook {
        let groups = self.resolve_groups(request);
        let has_sub_data = groups.iter().any(|g| !g.items.is_empty());
        let layout = request.sheet_config;
        let mut workbook = Workbook::new();

        if !request.selected_rows.is_empty() && (layout == SheetLayout::Separate || !has_sub_data)
        {
            workbook.push(self.main_sheet(request));
        }

        // Primary sub table, batch totals, then the additional groups
        let (primary, additional) = groups.split_at(1);
        let separate_groups = |list: &[ResolvedGroup<'_>]| -> Vec<Sheet> {
            if layout != SheetLayout::Separate {
                return Vec::new();
            }
            list.iter()
                .filter(|g| !g.items.is_empty() && !g.columns.is_empty())
                .map(|g| self.group_sheet(g))
                .collect()
        };

        for sheet in separate_groups(primary) {
            workbook.push(sheet);
        }

        if let Some(sheet) = self.batch_sheet(request) {
            workbook.push(sheet);
        }

        for sheet in separate_groups(additional) {
            workbook.push(sheet);
        }

        if layout == SheetLayout::Combined && !request.selected_rows.is_empty() && has_sub_data {
            workbook.push(self.combined_sheet(request, &groups));
        }

        if workbook.is_empty() {
            debug!("Nothing to export, emitting header-only main sheet");
            workbook.push(Sheet::new(
                SheetKind::Main,
                self.config.main_sheet.clone(),
                labels(&request.main_columns),
                label_widths(&request.main_columns),
            ));
        }

        workbook
    }

    /// Normalize legacy `subItems` and `allSubTables` into one ordered list.
    ///
    /// The primary group comes first: legacy `subItems` when present,
    /// otherwise the first non-empty entry of `allSubTables`. Remaining
    /// non-empty entries follow in order.
    fn resolve_groups<'r>(&self, request: &'r ExportRequest) -> Vec<ResolvedGroup<'r>> {
        let mut extra = request
            .all_sub_tables
            .iter()
            .filter(|t| !t.items.is_empty());

        let (columns, items): (&[Column], &[Row]) = if !request.sub_items.is_empty() {
            (request.sub_columns.as_slice(), request.sub_items.as_slice())
        } else if let Some(first) = extra.next() {
            if first.columns.is_empty() {
                (request.sub_columns.as_slice(), first.items.as_slice())
            } else {
                (first.columns.as_slice(), first.items.as_slice())
            }
        } else {
            (request.sub_columns.as_slice(), &[][..])
        };

        let mut groups = vec![ResolvedGroup {
            sheet_name: self.config.sub_sheet.clone(),
            prefix: self.config.sub_prefix.clone(),
            columns,
            items,
        }];

        for (idx, table) in extra.enumerate() {
            let name = table
                .name
                .clone()
                .unwrap_or_else(|| self.config.unnamed_table_name(idx + 1));
            groups.push(ResolvedGroup {
                sheet_name: name.clone(),
                prefix: name,
                columns: &table.columns,
                items: &table.items,
            });
        }

        groups
    }

    fn main_sheet(&self, request: &ExportRequest) -> Sheet {
        let columns = &request.main_columns;
        let mut sheet = Sheet::new(
            SheetKind::Main,
            self.config.main_sheet.clone(),
            labels(columns),
            label_widths(columns),
        );
        for row in &request.selected_rows {
            sheet.push_row(SheetRow::plain(
                columns.iter().map(|c| format_value(row, c)).collect(),
            ));
        }
        debug!(sheet = %sheet.name, rows = sheet.rows.len(), "Built main sheet");
        sheet
    }

    fn group_sheet(&self, group: &ResolvedGroup<'_>) -> Sheet {
        let mut headers = vec![self.config.parent_column.clone()];
        headers.extend(labels(group.columns));
        let mut widths = vec![PARENT_COLUMN_WIDTH];
        widths.extend(label_widths(group.columns));

        let mut sheet = Sheet::new(SheetKind::SubTable, group.sheet_name.clone(), headers, widths);
        for item in group.items {
            let mut cells = Vec::with_capacity(group.columns.len() + 1);
            cells.push(Cell::Text(item.parent_title().unwrap_or_default().to_string()));
            cells.extend(group.columns.iter().map(|c| format_value(item, c)));
            sheet.push_row(SheetRow::plain(cells));
        }
        debug!(sheet = %sheet.name, rows = sheet.rows.len(), "Built sub table sheet");
        sheet
    }

    /// Batch quantities use raw values; an optional total row closes the sheet
    fn batch_sheet(&self, request: &ExportRequest) -> Option<Sheet> {
        if !request.has_batch_data
            || request.batch_quantity_data.is_empty()
            || request.batch_columns.is_empty()
        {
            return None;
        }

        let columns = &request.batch_columns;
        let mut sheet = Sheet::new(
            SheetKind::Batch,
            self.config.batch_sheet.clone(),
            labels(columns),
            label_widths(columns),
        );

        for item in &request.batch_quantity_data {
            sheet.push_row(SheetRow::plain(
                columns.iter().map(|c| Cell::from_value(item.get(&c.prop))).collect(),
            ));
        }

        if request.total_quantity > 0.0 {
            let cells = columns
                .iter()
                .map(|c| {
                    if c.prop == self.config.quantity_prop {
                        Cell::Number(request.total_quantity)
                    } else if c.prop == self.config.batch_number_prop {
                        Cell::Text(self.config.total_label.clone())
                    } else {
                        Cell::Text(String::new())
                    }
                })
                .collect();
            sheet.push_row(SheetRow {
                cells,
                emphasis: Some(Emphasis {
                    span: None,
                    fill: TOTAL_FILL,
                }),
            });
        }

        debug!(sheet = %sheet.name, rows = sheet.rows.len(), "Built batch sheet");
        Some(sheet)
    }

    /// One row per matched sub row, main values only on the first of each
    /// group; main rows without sub rows get a single row with blank sub
    /// columns.
    fn combined_sheet(&self, request: &ExportRequest, groups: &[ResolvedGroup<'_>]) -> Sheet {
        let main_columns = &request.main_columns;
        let main_width = main_columns.len();

        let mut headers: Vec<String> = main_columns
            .iter()
            .map(|c| format!("{}_{}", self.config.main_prefix, c.label))
            .collect();
        let mut offsets = Vec::with_capacity(groups.len());
        for group in groups {
            offsets.push(headers.len());
            headers.extend(
                group
                    .columns
                    .iter()
                    .map(|c| format!("{}_{}", group.prefix, c.label)),
            );
        }
        let widths = headers
            .iter()
            .map(|h| (h.chars().count() as f64 * 1.5).max(MIN_COLUMN_WIDTH))
            .collect();
        let total_width = headers.len();

        let mut sheet = Sheet::new(
            SheetKind::Combined,
            self.config.combined_sheet.clone(),
            headers,
            widths,
        );

        for main in &request.selected_rows {
            let main_cells: Vec<Cell> = main_columns.iter().map(|c| format_value(main, c)).collect();

            let matches: Vec<(usize, &Row)> = groups
                .iter()
                .enumerate()
                .flat_map(|(gidx, g)| {
                    g.items
                        .iter()
                        .filter(|item| item.belongs_to(main, &request.row_key))
                        .map(move |item| (gidx, item))
                })
                .collect();

            if matches.is_empty() {
                let mut cells = main_cells.clone();
                cells.resize(total_width, Cell::Text(String::new()));
                sheet.push_row(self.combined_row(cells, main_width));
                continue;
            }

            for (idx, (gidx, sub)) in matches.into_iter().enumerate() {
                let mut cells = if idx == 0 {
                    main_cells.clone()
                } else {
                    vec![Cell::Text(String::new()); main_width]
                };
                cells.resize(total_width, Cell::Blank);

                let group = &groups[gidx];
                for (offset, column) in group.columns.iter().enumerate() {
                    cells[offsets[gidx] + offset] = format_value(sub, column);
                }
                sheet.push_row(self.combined_row(cells, main_width));
            }
        }

        debug!(sheet = %sheet.name, rows = sheet.rows.len(), "Built combined sheet");
        sheet
    }

    /// Rows carrying any main value open a group and get emphasized
    fn combined_row(&self, cells: Vec<Cell>, main_width: usize) -> SheetRow {
        let is_main_row = cells.iter().take(main_width).any(|c| !c.is_blank());
        SheetRow {
            cells,
            emphasis: is_main_row.then_some(Emphasis {
                span: Some(main_width),
                fill: MAIN_GROUP_FILL,
            }),
        }
    }
}

fn labels(columns: &[Column]) -> Vec<String> {
    columns.iter().map(|c| c.label.clone()).collect()
}

/// Twice the label length, never narrower than the minimum
fn label_widths(columns: &[Column]) -> Vec<f64> {
    columns
        .iter()
        .map(|c| ((c.label.chars().count() * 2) as f64).max(MIN_COLUMN_WIDTH))
        .collect()
}
