//! XLSX export of the visible table.
//!
//! Export happens in two steps: `build_sheet_grid` lays the header tree and
//! visible rows out on a plain cell grid, and `Exporter` writes that grid
//! with `rust_xlsxwriter`. Keeping the grid pure lets it be checked without
//! opening a workbook.

use crate::error::{Result, TableError};
use crate::field_types::{FieldKind, FieldTypeRegistry, SheetCell};
use crate::table::{ColumnLayout, RowKind, TableState, VisibleRow};
use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet, XlsxError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Indentation added to the first column per tree level.
const INDENT: &str = "    ";

/// Name of the main worksheet.
const MAIN_SHEET: &str = "Table";

/// Pixels per spreadsheet character width unit.
const PIXELS_PER_CHAR: f32 = 7.0;

/// Converts a zero-based column index to a worksheet column.
fn sheet_col(index: usize) -> Result<u16> {
    u16::try_from(index).map_err(|_| TableError::Export(XlsxError::RowColumnLimitError))
}

/// Converts a zero-based row index to a worksheet row.
fn sheet_row(index: usize) -> Result<u32> {
    u32::try_from(index).map_err(|_| TableError::Export(XlsxError::RowColumnLimitError))
}

/// A merged header region, inclusive on both ends.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeRange {
    pub first_row: u32,
    pub first_col: u16,
    pub last_row: u32,
    pub last_col: u16,
    pub title: String,
}

impl MergeRange {
    /// Whether the range covers more than one cell.
    pub fn is_merged(&self) -> bool {
        self.first_row != self.last_row || self.first_col != self.last_col
    }
}

/// Cells of one worksheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    pub name: String,
    /// One entry per header cell, positioned on the leaf grid
    pub headers: Vec<MergeRange>,
    /// Number of header rows; data starts below them
    pub header_height: u32,
    /// Data rows, one cell per leaf column
    pub rows: Vec<Vec<SheetCell>>,
    /// Column widths in pixels
    pub widths: Vec<f32>,
}

/// Lays visible rows out under a header row per column-tree level.
///
/// # Arguments
/// * `state` - Source of row values
/// * `layout` - Column layout (visible leaves, header rows)
/// * `visible` - Flattened rows; loading placeholders are skipped
/// * `registry` - Field types converting values to sheet cells
///
/// # Returns
/// The main sheet grid, or an export error when the header does not fit
/// the worksheet's column range.
pub fn build_sheet_grid(
    state: &TableState,
    layout: &ColumnLayout,
    visible: &[VisibleRow],
    registry: &FieldTypeRegistry,
) -> Result<SheetGrid> {
    let headers = layout
        .header_rows
        .iter()
        .flatten()
        .map(|cell| {
            Ok(MergeRange {
                first_row: sheet_row(cell.row)?,
                first_col: sheet_col(cell.col_start)?,
                last_row: sheet_row(cell.row + cell.row_span.max(1) - 1)?,
                last_col: sheet_col(cell.col_start + cell.col_span.max(1) - 1)?,
                title: cell.title.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::with_capacity(visible.len());
    for row in visible.iter().filter(|r| r.kind == RowKind::Data) {
        let Some(node) = state.rows().get(&row.key) else {
            continue;
        };
        let cells: Vec<SheetCell> = layout
            .leaves
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let field_type = registry.get(column.field_type);
                let value = node.value(&column.field);
                if index == 0 && row.depth > 0 {
                    // Indented cells are text so the prefix shows
                    let text = value.map(|v| field_type.to_display_string(v)).unwrap_or_default();
                    return SheetCell::Text(format!("{}{text}", INDENT.repeat(row.depth)));
                }
                value.map_or(SheetCell::Empty, |v| field_type.to_sheet_cell(v))
            })
            .collect();
        rows.push(cells);
    }

    Ok(SheetGrid {
        name: MAIN_SHEET.to_string(),
        headers,
        header_height: sheet_row(layout.depth())?,
        rows,
        widths: layout.leaves.iter().map(|c| c.width).collect(),
    })
}

/// Builds a secondary sheet from a key → values map: one column per key,
/// values listed downward.
pub fn build_secondary_grid(name: &str, data: &BTreeMap<String, Vec<Value>>) -> Result<SheetGrid> {
    let headers = data
        .keys()
        .enumerate()
        .map(|(col, key)| {
            let col = sheet_col(col)?;
            Ok(MergeRange { first_row: 0, first_col: col, last_row: 0, last_col: col, title: key.clone() })
        })
        .collect::<Result<Vec<_>>>()?;

    let height = data.values().map(Vec::len).max().unwrap_or(0);
    let text = FieldTypeRegistry::shared().get(FieldKind::Text);
    let rows = (0..height)
        .map(|index| {
            data.values()
                .map(|values| match values.get(index) {
                    Some(Value::Number(n)) => n.as_f64().map_or(SheetCell::Empty, SheetCell::Number),
                    Some(Value::Bool(b)) => SheetCell::Bool(*b),
                    Some(value) => text.to_sheet_cell(value),
                    None => SheetCell::Empty,
                })
                .collect()
        })
        .collect();

    Ok(SheetGrid {
        name: name.to_string(),
        headers,
        header_height: 1,
        rows,
        widths: vec![120.0; data.len()],
    })
}

/// Writes sheet grids to an XLSX workbook.
pub struct Exporter {
    sheets: Vec<SheetGrid>,
}

impl Exporter {
    /// Prepares the export of the visible table.
    pub fn new(
        state: &TableState,
        layout: &ColumnLayout,
        visible: &[VisibleRow],
        registry: &FieldTypeRegistry,
    ) -> Result<Self> {
        Ok(Self {
            sheets: vec![build_sheet_grid(state, layout, visible, registry)?],
        })
    }

    /// Creates an exporter for already built grids.
    pub fn from_grids(sheets: Vec<SheetGrid>) -> Self {
        Self { sheets }
    }

    /// Adds a sheet built from a key → values map.
    pub fn with_secondary_sheet(mut self, name: &str, data: &BTreeMap<String, Vec<Value>>) -> Result<Self> {
        self.sheets.push(build_secondary_grid(name, data)?);
        Ok(self)
    }

    pub fn sheets(&self) -> &[SheetGrid] {
        &self.sheets
    }

    /// Writes the workbook to `path`.
    pub fn export_xlsx(&self, path: &Path) -> Result<()> {
        let mut workbook = self.build_workbook()?;
        workbook.save(path)?;
        log::info!("exported {} sheet(s) to {}", self.sheets.len(), path.display());
        Ok(())
    }

    /// Serializes the workbook into memory.
    pub fn export_to_buffer(&self) -> Result<Vec<u8>> {
        let mut workbook = self.build_workbook()?;
        Ok(workbook.save_to_buffer()?)
    }

    fn build_workbook(&self) -> Result<Workbook> {
        let mut workbook = Workbook::new();
        let header_format = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);

        for grid in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&grid.name)?;
            write_grid(worksheet, grid, &header_format)?;
        }
        Ok(workbook)
    }
}

fn write_grid(worksheet: &mut Worksheet, grid: &SheetGrid, header_format: &Format) -> Result<()> {
    for (col, width) in grid.widths.iter().enumerate() {
        worksheet.set_column_width(sheet_col(col)?, f64::from(*width / PIXELS_PER_CHAR))?;
    }

    for header in &grid.headers {
        if header.is_merged() {
            worksheet.merge_range(
                header.first_row,
                header.first_col,
                header.last_row,
                header.last_col,
                &header.title,
                header_format,
            )?;
        } else {
            worksheet.write_string_with_format(
                header.first_row,
                header.first_col,
                &header.title,
                header_format,
            )?;
        }
    }

    for (offset, cells) in grid.rows.iter().enumerate() {
        let row = sheet_row(offset)?
            .checked_add(grid.header_height)
            .ok_or(TableError::Export(XlsxError::RowColumnLimitError))?;
        for (col, cell) in cells.iter().enumerate() {
            let col = sheet_col(col)?;
            match cell {
                SheetCell::Empty => {}
                SheetCell::Text(text) => {
                    worksheet.write_string(row, col, text)?;
                }
                SheetCell::Number(number) => {
                    worksheet.write_number(row, col, *number)?;
                }
                SheetCell::Bool(value) => {
                    worksheet.write_boolean(row, col, *value)?;
                }
            }
        }
    }

    if grid.header_height > 0 {
        worksheet.set_freeze_panes(grid.header_height, 0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::model::{ColumnDef, Row};
    use crate::table::{build_columns, flatten, project, reduce, TableAction};
    use serde_json::json;

    fn grouped_state() -> TableState {
        let columns = vec![
            ColumnDef::new("name", "Name"),
            ColumnDef::group(
                "stats",
                "Stats",
                vec![
                    ColumnDef::new("count", "Count").with_type(FieldKind::Number),
                    ColumnDef::new("ok", "OK").with_type(FieldKind::Boolean),
                ],
            ),
        ];
        let state = TableState::new(&TableConfig::default(), columns);
        let rows = vec![Row::new("a")
            .with("name", "alpha")
            .with("count", 3)
            .with("ok", true)
            .with_children(vec![Row::new("a1").with("name", "child").with("count", 1)])];
        let state = reduce(&state, TableAction::SetRows(rows));
        reduce(&state, TableAction::ExpandRow("a".into()))
    }

    fn grid_for(state: &TableState) -> SheetGrid {
        let registry = FieldTypeRegistry::default();
        let layout = build_columns(state.columns(), state.hidden(), state.widths(), &registry);
        let projection = project(state, &registry);
        let visible = flatten(state, &projection);
        build_sheet_grid(state, &layout, &visible, &registry).unwrap()
    }

    #[test]
    fn test_header_rows_merge_per_level() {
        let grid = grid_for(&grouped_state());
        assert_eq!(grid.header_height, 2);
        let name = grid.headers.iter().find(|h| h.title == "Name").unwrap();
        assert_eq!((name.first_row, name.last_row, name.first_col, name.last_col), (0, 1, 0, 0));
        let stats = grid.headers.iter().find(|h| h.title == "Stats").unwrap();
        assert_eq!((stats.first_row, stats.last_row, stats.first_col, stats.last_col), (0, 0, 1, 2));
        let count = grid.headers.iter().find(|h| h.title == "Count").unwrap();
        assert!(!count.is_merged());
    }

    #[test]
    fn test_rows_are_typed_and_indented() {
        let grid = grid_for(&grouped_state());
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(
            grid.rows[0],
            vec![SheetCell::Text("alpha".into()), SheetCell::Number(3.0), SheetCell::Bool(true)]
        );
        assert_eq!(grid.rows[1][0], SheetCell::Text(format!("{INDENT}child")));
        assert_eq!(grid.rows[1][2], SheetCell::Empty);
    }

    #[test]
    fn test_secondary_sheet_columns() {
        let mut data = BTreeMap::new();
        data.insert("b".to_string(), vec![json!(1), json!(2)]);
        data.insert("a".to_string(), vec![json!("x")]);
        let grid = build_secondary_grid("Extra", &data).unwrap();
        assert_eq!(grid.headers[0].title, "a");
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[1], vec![SheetCell::Empty, SheetCell::Number(2.0)]);
    }

    #[test]
    fn test_workbook_serializes() {
        let state = grouped_state();
        let grid = grid_for(&state);
        let mut data = BTreeMap::new();
        data.insert("k".to_string(), vec![json!("v")]);
        let bytes = Exporter::from_grids(vec![grid])
            .with_secondary_sheet("Extra", &data)
            .unwrap()
            .export_to_buffer()
            .unwrap();
        // XLSX files are zip archives
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_columns_past_u16_range_are_an_export_error() {
        let data: BTreeMap<String, Vec<Value>> =
            (0..=usize::from(u16::MAX) + 1).map(|i| (format!("k{i:06}"), Vec::new())).collect();
        let error = build_secondary_grid("Wide", &data).unwrap_err();
        assert!(matches!(error, TableError::Export(XlsxError::RowColumnLimitError)));
    }

    #[test]
    fn test_wide_grid_fails_to_write_instead_of_wrapping() {
        let grid = SheetGrid {
            name: "Wide".into(),
            widths: vec![10.0; usize::from(u16::MAX) + 2],
            ..SheetGrid::default()
        };
        let error = Exporter::from_grids(vec![grid]).export_to_buffer().unwrap_err();
        assert!(matches!(error, TableError::Export(_)));
    }
}
