//! Annual sales ledger: a data sheet of enriched rows with ratio formulas,
//! and a summary sheet of cross-sheet statistics.
//!
//! Built by rebuilding rather than appending in place: an optional base
//! ledger plus any number of enriched sheets go in, a complete two-sheet
//! plan comes out. All statistics stay spreadsheet formulas.

use serde::Serialize;

use crate::coerce::{coerce_number, integer_if_digits};
use crate::config::{LedgerConfig, NumberParsing};
use crate::error::ReconError;
use crate::formulas::{sheet_cell, sheet_range, FormulaCell, RatioColumns};
use crate::model::CellValue;
use crate::table::Table;

/// Columns copied from each enriched row (A through Y).
pub const LEDGER_WIDTH: usize = 25;

pub const LEDGER_HEADERS: [&str; 29] = [
    "MLS #",
    "St",
    "Parcel Number",
    "Address",
    "Post Office/Town",
    "Lot Size Acres",
    "High School District",
    "City/Township",
    "Close Date",
    "Current Price",
    "5217 Sales Price",
    "Difference (Sales Price)",
    "5217 Assessed Value",
    "Current Assessed Value",
    "Difference (AV)",
    "Tax Assessed Value",
    "Year Built",
    "Living Sqft (Est)",
    "Bedrooms Total",
    "Bathrooms Full",
    "Bathrooms Half",
    "Cooling",
    "Association Fee",
    "Verified (Y/N)",
    "Condition Code",
    "AV/SP Ratio",
    "Absolute Deviation",
    "Median Ratio",
    "Sum Abs Dev",
];

/// Data-sheet headers rendered bold on a yellow fill.
pub const HIGHLIGHT_HEADERS: [&str; 5] = [
    "5217 Sales Price",
    "5217 Assessed Value",
    "Current Assessed Value",
    "Verified (Y/N)",
    "Condition Code",
];

/// Built-in Excel "$#,##0.00" variant used on the summary price cells.
pub const CURRENCY_USD_SIMPLE: &str = "\"$\"#,##0.00_-";

/// Font color of the summary sheet's title labels.
pub const TITLE_COLOR: u32 = 0x425370;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelStyle {
    /// Bold, title color, bordered.
    Title,
    /// Bold, centered, bordered.
    Header,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCell {
    pub row: usize,
    pub col: usize,
    pub text: String,
    pub style: LabelStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSheet {
    pub name: String,
    pub headers: Vec<String>,
    /// Header positions in [`HIGHLIGHT_HEADERS`].
    pub highlighted: Vec<usize>,
    /// Data rows, [`LEDGER_WIDTH`] cells each.
    pub rows: Vec<Vec<CellValue>>,
    pub formulas: Vec<FormulaCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummarySheet {
    pub name: String,
    pub labels: Vec<LabelCell>,
    /// Bordered value cells.
    pub formulas: Vec<FormulaCell>,
    /// Cells formatted with [`CURRENCY_USD_SIMPLE`].
    pub currency_cells: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerPlan {
    pub data: DataSheet,
    pub summary: SummarySheet,
}

/// Excel's sheet-name rules: 1..=31 chars, none of `[]:*?/\`, no leading
/// or trailing apostrophe.
pub fn validate_sheet_name(name: &str) -> Result<(), ReconError> {
    let invalid = |why: &str| Err(ReconError::ConfigValidation(format!("sheet name '{name}' {why}")));
    if name.is_empty() {
        return invalid("is empty");
    }
    if name.chars().count() > 31 {
        return invalid("is longer than 31 characters");
    }
    if let Some(c) = name.chars().find(|c| "[]:*?/\\".contains(*c)) {
        return invalid(&format!("contains '{c}'"));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return invalid("starts or ends with an apostrophe");
    }
    Ok(())
}

/// Ledger columns written as numbers: acreage, prices, values, the two
/// differences, year, area, room counts and the association fee.
const NUMERIC_COLUMNS: [usize; 14] = [5, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 22];

/// Listing number: a number when all digits, text otherwise.
const MLS_COLUMN: usize = 0;

fn ledger_cell(col: usize, raw: &str) -> CellValue {
    let number = if NUMERIC_COLUMNS.contains(&col) {
        coerce_number(raw, NumberParsing::Strict).ok().flatten()
    } else if col == MLS_COLUMN && !has_leading_zero(raw) {
        integer_if_digits(raw)
    } else {
        None
    };
    number.map_or_else(|| CellValue::text(raw), CellValue::Number)
}

fn has_leading_zero(raw: &str) -> bool {
    let t = raw.trim();
    t.len() > 1 && t.starts_with('0')
}

fn ledger_row(table: &Table, row: usize) -> Vec<CellValue> {
    (0..LEDGER_WIDTH).map(|c| ledger_cell(c, table.cell(row, c))).collect()
}

/// Drop trailing rows whose ledger columns are all blank.
pub fn remove_ghost_rows(rows: &mut Vec<Vec<CellValue>>) {
    while rows
        .last()
        .is_some_and(|r| r.iter().take(LEDGER_WIDTH).all(CellValue::is_empty))
    {
        rows.pop();
    }
}

fn check_headers(table: &Table) {
    for (i, expected) in LEDGER_HEADERS.iter().take(LEDGER_WIDTH).enumerate() {
        let found = table.headers.get(i).map(String::as_str).unwrap_or("");
        if found != *expected {
            log::warn!(
                "{}: column {} is '{found}', ledger expects '{expected}'",
                table.name,
                i + 1
            );
            return;
        }
    }
}

/// Plan a ledger from an optional existing data sheet and enriched sheets.
pub fn plan(
    base: Option<&Table>,
    sources: &[Table],
    data_sheet: &str,
    summary_sheet: &str,
    config: &LedgerConfig,
) -> Result<LedgerPlan, ReconError> {
    validate_sheet_name(data_sheet)?;
    validate_sheet_name(summary_sheet)?;
    if data_sheet.eq_ignore_ascii_case(summary_sheet) {
        return Err(ReconError::ConfigValidation(format!(
            "data and summary sheets are both named '{data_sheet}'"
        )));
    }

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for table in base.into_iter().chain(sources) {
        check_headers(table);
        remove_ghost_rows(&mut rows);
        let before = rows.len();
        rows.extend((0..table.len()).map(|r| ledger_row(table, r)));
        log::info!("{}: {} rows added to ledger", table.name, rows.len() - before);
    }
    remove_ghost_rows(&mut rows);

    let ratio = RatioColumns::default();
    let mut formulas = Vec::with_capacity(rows.len() * 2 + 2);
    for r in 1..=rows.len() {
        formulas.push(FormulaCell {
            row: r,
            col: ratio.ratio,
            formula: ratio.ratio(r),
            cached: None,
        });
        formulas.push(FormulaCell {
            row: r,
            col: ratio.abs_deviation,
            formula: ratio.abs_deviation(r),
            cached: None,
        });
    }
    formulas.push(FormulaCell {
        row: RatioColumns::SUMMARY_ROW,
        col: ratio.median,
        formula: ratio.median(),
        cached: None,
    });
    formulas.push(FormulaCell {
        row: RatioColumns::SUMMARY_ROW,
        col: ratio.sum_abs_dev,
        formula: ratio.sum_abs_dev(),
        cached: None,
    });

    let headers: Vec<String> = LEDGER_HEADERS.iter().map(|h| h.to_string()).collect();
    let highlighted = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| HIGHLIGHT_HEADERS.contains(&h.as_str()))
        .map(|(i, _)| i)
        .collect();

    Ok(LedgerPlan {
        data: DataSheet {
            name: data_sheet.to_string(),
            headers,
            highlighted,
            rows,
            formulas,
        },
        summary: summary_plan(summary_sheet, data_sheet, &ratio, config),
    })
}

fn summary_plan(name: &str, data: &str, ratio: &RatioColumns, config: &LedgerConfig) -> SummarySheet {
    let label = |row: usize, col: usize, text: &str, style: LabelStyle| LabelCell {
        row,
        col,
        text: text.to_string(),
        style,
    };
    let formula = |row: usize, col: usize, formula: String| FormulaCell {
        row,
        col,
        formula,
        cached: None,
    };

    let price = sheet_range(data, ratio.sale_price);
    let assessed = sheet_range(data, ratio.assessed_value);
    let ratios = sheet_range(data, ratio.ratio);
    let listed = sheet_range(data, 1);
    let median_ratio = sheet_cell(data, RatioColumns::SUMMARY_ROW, ratio.median);
    let sum_abs_dev = sheet_cell(data, RatioColumns::SUMMARY_ROW, ratio.sum_abs_dev);

    let (a, c, d, e, f, g) = (0, 2, 3, 4, 5, 6);
    let labels = vec![
        label(0, a, "Assessment Roll", LabelStyle::Title),
        label(2, a, "Valuation Date", LabelStyle::Title),
        label(4, a, &format!("{} Sales", config.jurisdiction), LabelStyle::Title),
        label(1, c, "# of Completed Sales", LabelStyle::Header),
        label(1, d, "Minimum Sales Price", LabelStyle::Header),
        label(1, e, "Maximum Sales Price", LabelStyle::Header),
        label(1, f, "Average Sale Price", LabelStyle::Header),
        label(1, g, "Median Sales Price", LabelStyle::Header),
        label(3, c, "Average AV/SP Ratio", LabelStyle::Header),
        label(3, d, "Median AV/SP Ratio", LabelStyle::Header),
        label(3, e, "Weighted Mean Ratio", LabelStyle::Header),
        label(3, f, "C.O.D", LabelStyle::Header),
        label(3, g, "Price Related Differential", LabelStyle::Header),
        label(6, c, "Total # of Sales", LabelStyle::Header),
        label(6, d, "Excluded # of Sales", LabelStyle::Header),
    ];

    let formulas = vec![
        formula(2, c, format!("=COUNT({ratios})")),
        formula(2, d, format!("=MIN({price})")),
        formula(2, e, format!("=MAX({price})")),
        formula(2, f, format!("=AVERAGE({price})")),
        formula(2, g, format!("=MEDIAN({price})")),
        formula(4, c, format!("=AVERAGEIF({ratios},\">0\")")),
        formula(4, d, format!("={median_ratio}")),
        formula(4, e, format!("=SUM({assessed})/SUM({price})")),
        formula(4, f, format!("=((({sum_abs_dev})/C3)/D5)*100")),
        formula(4, g, "=C5/E5".to_string()),
        formula(7, c, format!("=COUNTA({listed})-1")),
        formula(7, d, "=C8-C3".to_string()),
    ];

    SummarySheet {
        name: name.to_string(),
        labels,
        formulas,
        currency_cells: vec![(2, d), (2, e), (2, f), (2, g)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enriched(name: &str, rows: &[&[&str]]) -> Table {
        Table::new(
            name,
            LEDGER_HEADERS[..LEDGER_WIDTH].iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn plan_of(sources: &[Table]) -> LedgerPlan {
        plan(None, sources, "2025 Sales", "2025 Summary", &LedgerConfig::default()).unwrap()
    }

    #[test]
    fn rows_truncated_to_ledger_width_and_typed() {
        let mut wide: Vec<String> = (0..30).map(|i| i.to_string()).collect();
        wide[2] = "392800.12-34-34-567-0-0".into();
        let t = Table::new("jan", wide.clone(), vec![wide]);
        let p = plan_of(&[t]);
        assert_eq!(p.data.rows.len(), 1);
        assert_eq!(p.data.rows[0].len(), LEDGER_WIDTH);
        assert_eq!(p.data.rows[0][0], CellValue::Number(0.0));
        assert_eq!(
            p.data.rows[0][2],
            CellValue::Text("392800.12-34-34-567-0-0".into())
        );
    }

    #[test]
    fn ghost_rows_removed_between_appends() {
        let jan = enriched("jan", &[&["1", "S"], &[""], &["", "  "]]);
        let feb = enriched("feb", &[&["2", "S"]]);
        let p = plan_of(&[jan, feb]);
        assert_eq!(p.data.rows.len(), 2);
        assert_eq!(p.data.rows[1][0], CellValue::Number(2.0));
    }

    #[test]
    fn interior_blank_rows_kept() {
        let jan = enriched("jan", &[&["1"], &[""], &["3"]]);
        assert_eq!(plan_of(&[jan]).data.rows.len(), 3);
    }

    #[test]
    fn base_ledger_rows_come_first() {
        let base = Table::new(
            "2025 Sales",
            LEDGER_HEADERS.iter().map(|h| h.to_string()).collect(),
            vec![vec!["7".into(); 29], vec![String::new(); 29]],
        );
        let feb = enriched("feb", &[&["8"]]);
        let p = plan(Some(&base), &[feb], "2025 Sales", "Summary", &LedgerConfig::default()).unwrap();
        assert_eq!(p.data.rows.len(), 2);
        assert_eq!(p.data.rows[0][0], CellValue::Number(7.0));
        assert_eq!(p.data.rows[1][0], CellValue::Number(8.0));
    }

    #[test]
    fn ratio_formulas_per_row() {
        let p = plan_of(&[enriched("jan", &[&["1"], &["2"]])]);
        let at = |row, col| p.data.formulas.iter().find(|f| f.row == row && f.col == col);
        assert_eq!(at(1, 25).unwrap().formula, "=IF(K2=0,\"\",M2/K2)");
        assert_eq!(at(2, 26).unwrap().formula, "=IF(Z3=\"\",\"\",ABS(Z3-$AB$2))");
        assert_eq!(at(1, 27).unwrap().formula, "=MEDIAN(Z:Z)");
        assert_eq!(at(1, 28).unwrap().formula, "=SUMIF(AA:AA,\">0\")");
        assert!(at(3, 25).is_none());
        assert_eq!(p.data.formulas.len(), 6);
    }

    #[test]
    fn headers_and_highlights() {
        let p = plan_of(&[]);
        assert_eq!(p.data.headers.len(), 29);
        assert_eq!(p.data.headers[28], "Sum Abs Dev");
        assert_eq!(p.data.highlighted, vec![10, 12, 13, 23, 24]);
        assert!(p.data.rows.is_empty());
    }

    #[test]
    fn summary_references_data_sheet_by_quoted_name() {
        let p = plan_of(&[]);
        let s = &p.summary;
        let at = |row, col| s.formulas.iter().find(|f| f.row == row && f.col == col).unwrap();
        assert_eq!(at(2, 2).formula, "=COUNT('2025 Sales'!Z:Z)");
        assert_eq!(at(2, 6).formula, "=MEDIAN('2025 Sales'!K:K)");
        assert_eq!(at(4, 3).formula, "='2025 Sales'!AB2");
        assert_eq!(at(4, 4).formula, "=SUM('2025 Sales'!M:M)/SUM('2025 Sales'!K:K)");
        assert_eq!(at(4, 5).formula, "=((('2025 Sales'!AC2)/C3)/D5)*100");
        assert_eq!(at(7, 2).formula, "=COUNTA('2025 Sales'!B:B)-1");
        assert!(s.labels.iter().any(|l| l.text == "Stony Point Sales" && l.style == LabelStyle::Title));
        assert_eq!(s.currency_cells.len(), 4);
    }

    #[test]
    fn jurisdiction_label_configurable() {
        let config = LedgerConfig {
            jurisdiction: "Haverstraw".into(),
        };
        let p = plan(None, &[], "Data", "Summary", &config).unwrap();
        assert!(p.summary.labels.iter().any(|l| l.text == "Haverstraw Sales"));
    }

    #[test]
    fn sheet_names_validated() {
        let config = LedgerConfig::default();
        assert!(plan(None, &[], "Sales", "sales", &config).is_err());
        assert!(plan(None, &[], "a/b", "Summary", &config).is_err());
        assert!(plan(None, &[], &"x".repeat(32), "Summary", &config).is_err());
        assert!(validate_sheet_name("2025 Sales").is_ok());
    }

    #[test]
    fn text_columns_keep_leading_zeros() {
        let mut row = vec![""; LEDGER_WIDTH];
        row[0] = "00123";
        row[1] = "0";
        row[4] = "07001";
        row[9] = "310000";
        row[15] = "oops";
        row[23] = "1";
        let p = plan_of(&[enriched("jan", &[row.as_slice()])]);
        let cells = &p.data.rows[0];
        assert_eq!(cells[0], CellValue::Text("00123".into()));
        assert_eq!(cells[1], CellValue::Text("0".into()));
        assert_eq!(cells[4], CellValue::Text("07001".into()));
        assert_eq!(cells[9], CellValue::Number(310000.0));
        assert_eq!(cells[15], CellValue::Text("oops".into()));
        assert_eq!(cells[23], CellValue::Text("1".into()));
    }
}
