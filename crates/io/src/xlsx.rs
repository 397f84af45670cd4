// Excel import (calamine) and workbook export (rust_xlsxwriter)

use std::collections::{HashMap, HashSet};
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Days, NaiveDate, NaiveTime};
use parcelgrid_recon::annotate::FormatPlan;
use parcelgrid_recon::formulas::{cell_ref, FormulaCell};
use parcelgrid_recon::ledger::LedgerPlan;
use parcelgrid_recon::model::{CellValue, EnrichedTable};
use parcelgrid_recon::Table;
use rust_xlsxwriter::{Format, Formula, Workbook as XlsxWorkbook, Worksheet};

use crate::styles;

const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

/// Largest serial Excel can display as a date (9999-12-31).
const MAX_DATE_SERIAL: f64 = 2_958_466.0;

// ============================================================================
// Import
// ============================================================================

/// Sheet names in workbook order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>, String> {
    let workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    Ok(workbook.sheet_names().to_vec())
}

/// Import one sheet of an Excel file (xlsx, xlsm, xls, xlsb, ods) as a table.
///
/// Without `sheet`, the first sheet is read. Every cell becomes text: integral
/// floats lose their `.0`, date cells become ISO dates.
pub fn import(path: &Path, sheet: Option<&str>, name: &str) -> Result<Table, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;

    let names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(wanted) => names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| {
                format!(
                    "{}: no sheet named '{}' (available: {})",
                    path.display(),
                    wanted,
                    names.join(", ")
                )
            })?,
        None => names
            .first()
            .cloned()
            .ok_or_else(|| format!("{}: workbook contains no sheets", path.display()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    // Keep column positions when the used range does not start at column A
    let (_, start_col) = range.start().unwrap_or((0, 0));
    let grid: Vec<Vec<String>> = range
        .rows()
        .map(|row| {
            let mut cells = vec![String::new(); start_col as usize];
            cells.extend(row.iter().map(cell_text));
            cells
        })
        .collect();

    log::debug!(
        "{}: read {} rows from sheet '{}'",
        path.display(),
        grid.len(),
        sheet_name
    );
    Ok(Table::from_grid(name, grid))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            // Format nicely: integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => format!("{}", n),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => serial_to_text(dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Render an Excel date serial (1900 system) as `YYYY-MM-DD`, with a time
/// part when the serial has a fraction.
fn serial_to_text(serial: f64) -> String {
    let fallback = || format!("{}", serial);
    if !(0.0..MAX_DATE_SERIAL).contains(&serial) {
        return fallback();
    }

    let days = serial.floor();
    let Some(date) = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.checked_add_days(Days::new(days as u64)))
    else {
        return fallback();
    };

    let secs = (((serial - days) * 86_400.0).round() as u32).min(86_399);
    if secs == 0 {
        return date.format("%Y-%m-%d").to_string();
    }
    match NaiveTime::from_num_seconds_from_midnight_opt(secs, 0) {
        Some(time) => date.and_time(time).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => fallback(),
    }
}

// ============================================================================
// Export
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub sheets_written: usize,
    pub cells_written: usize,
    pub formulas_written: usize,
    pub highlights_applied: usize,
}

impl ExportResult {
    pub fn summary(&self) -> String {
        format!(
            "{} sheet(s), {} cells, {} formulas, {} highlights",
            self.sheets_written, self.cells_written, self.formulas_written, self.highlights_applied
        )
    }
}

fn row32(row: usize) -> Result<u32, String> {
    if row >= MAX_ROWS {
        return Err(format!("row {} exceeds the Excel limit of {} rows", row + 1, MAX_ROWS));
    }
    Ok(row as u32)
}

fn col16(col: usize) -> Result<u16, String> {
    if col >= MAX_COLS {
        return Err(format!("column {} exceeds the Excel limit of {} columns", col + 1, MAX_COLS));
    }
    Ok(col as u16)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: usize,
    col: usize,
    value: &CellValue,
    format: Option<&Format>,
) -> Result<bool, String> {
    let (r, c) = (row32(row)?, col16(col)?);
    let written = match (value, format) {
        (CellValue::Empty, None) => return Ok(false),
        (CellValue::Empty, Some(f)) => worksheet.write_blank(r, c, f),
        (CellValue::Text(s), None) => worksheet.write_string(r, c, s),
        (CellValue::Text(s), Some(f)) => worksheet.write_string_with_format(r, c, s, f),
        (CellValue::Number(n), None) => worksheet.write_number(r, c, *n),
        (CellValue::Number(n), Some(f)) => worksheet.write_number_with_format(r, c, *n, f),
    };
    written.map_err(|e| format!("Failed to write cell {}: {}", cell_ref(row, col), e))?;
    Ok(!value.is_empty())
}

fn write_formula(
    worksheet: &mut Worksheet,
    cell: &FormulaCell,
    format: Option<&Format>,
) -> Result<(), String> {
    let (r, c) = (row32(cell.row)?, col16(cell.col)?);
    // An empty cached result reads back as blank rather than 0
    let result = cell.cached.map(|n| n.to_string()).unwrap_or_default();
    let formula = Formula::new(&cell.formula).set_result(result);
    let written = match format {
        Some(f) => worksheet.write_formula_with_format(r, c, formula, f),
        None => worksheet.write_formula(r, c, formula),
    };
    written
        .map(|_| ())
        .map_err(|e| format!("Failed to write formula at {}: {}", cell_ref(cell.row, cell.col), e))
}

/// Write the enriched snapshot as a fresh single-sheet workbook.
pub fn export_enriched(
    table: &EnrichedTable,
    plan: &FormatPlan,
    sheet_name: &str,
    path: &Path,
) -> Result<ExportResult, String> {
    let mut result = ExportResult::default();
    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(sheet_name)
        .map_err(|e| format!("Failed to create sheet '{}': {}", sheet_name, e))?;

    let header_fill: HashMap<usize, bool> =
        plan.header_styles.iter().map(|h| (h.col, h.fill)).collect();
    for (col, header) in table.headers().iter().enumerate() {
        let format = header_fill.get(&col).map(|&fill| styles::header(fill));
        write_cell(worksheet, 0, col, &CellValue::text(header), format.as_ref())?;
    }

    let column_formats: HashMap<usize, Format> = plan
        .number_formats
        .iter()
        .map(|f| (f.col, styles::number_format(&f.format)))
        .collect();
    let highlights: HashSet<(usize, usize)> =
        plan.highlights.iter().map(|h| (h.row, h.col)).collect();
    let formulas: HashMap<(usize, usize), &FormulaCell> =
        plan.formulas.iter().map(|f| ((f.row, f.col), f)).collect();

    for (i, record) in table.records.iter().enumerate() {
        let row = i + 1;
        for (col, value) in record.cells.iter().enumerate() {
            let base = column_formats.get(&col);
            let lit;
            let format = if highlights.contains(&(row, col)) {
                lit = styles::highlighted(base);
                result.highlights_applied += 1;
                Some(&lit)
            } else {
                base
            };

            if let Some(formula) = formulas.get(&(row, col)) {
                write_formula(worksheet, formula, format)?;
                result.formulas_written += 1;
            } else if write_cell(worksheet, row, col, value, format)? {
                result.cells_written += 1;
            }
        }
    }

    worksheet.autofit();
    workbook
        .save(path)
        .map_err(|e| format!("Failed to save {}: {}", path.display(), e))?;

    result.sheets_written = 1;
    log::info!("{}: {}", path.display(), result.summary());
    Ok(result)
}

/// Write a ledger plan as a fresh workbook: summary sheet first, then data.
pub fn export_ledger(plan: &LedgerPlan, path: &Path) -> Result<ExportResult, String> {
    let mut result = ExportResult::default();
    let mut workbook = XlsxWorkbook::new();

    {
        let summary = &plan.summary;
        let worksheet = workbook
            .add_worksheet()
            .set_name(&summary.name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", summary.name, e))?;

        for label in &summary.labels {
            let format = styles::label(label.style);
            write_cell(worksheet, label.row, label.col, &CellValue::text(&label.text), Some(&format))?;
        }
        for formula in &summary.formulas {
            let currency = summary.currency_cells.contains(&(formula.row, formula.col));
            write_formula(worksheet, formula, Some(&styles::summary_value(currency)))?;
            result.formulas_written += 1;
        }
        worksheet.autofit();
    }

    {
        let data = &plan.data;
        let worksheet = workbook
            .add_worksheet()
            .set_name(&data.name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", data.name, e))?;

        for (col, header) in data.headers.iter().enumerate() {
            let format = styles::ledger_header(data.highlighted.contains(&col));
            write_cell(worksheet, 0, col, &CellValue::text(header), format.as_ref())?;
        }
        for (i, cells) in data.rows.iter().enumerate() {
            for (col, value) in cells.iter().enumerate() {
                if write_cell(worksheet, i + 1, col, value, None)? {
                    result.cells_written += 1;
                }
            }
        }
        for formula in &data.formulas {
            write_formula(worksheet, formula, None)?;
            result.formulas_written += 1;
        }
        worksheet.autofit();
    }

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save {}: {}", path.display(), e))?;

    result.sheets_written = 2;
    log::info!("{}: {}", path.display(), result.summary());
    Ok(result)
}
