//! Presentation metadata for the enriched sheet.
//!
//! Derives styling instructions from an [`EnrichedTable`] without touching
//! the records. Rows are 0-based sheet rows: row 0 is the header, record
//! `i` sits on row `i + 1`.

use serde::Serialize;

use crate::coerce::is_na_token;
use crate::config::FormatConfig;
use crate::formulas::{difference, FormulaCell};
use crate::model::{CellValue, EnrichedTable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderStyle {
    pub col: usize,
    /// Bold + centered always; the yellow fill only when set.
    pub fill: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightReason {
    /// Required column is blank or holds an NA placeholder such as `nan`.
    MissingValue,
    /// Address of an unverified record.
    NeedsReview,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub row: usize,
    pub col: usize,
    pub reason: HighlightReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NumberFormat {
    Currency(String),
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnFormat {
    pub col: usize,
    pub format: NumberFormat,
}

/// Everything the writer needs beyond cell values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormatPlan {
    pub header_styles: Vec<HeaderStyle>,
    pub highlights: Vec<Highlight>,
    pub number_formats: Vec<ColumnFormat>,
    pub formulas: Vec<FormulaCell>,
}

impl FormatPlan {
    pub fn is_highlighted(&self, row: usize, col: usize) -> bool {
        self.highlights.iter().any(|h| h.row == row && h.col == col)
    }

    pub fn formula_at(&self, row: usize, col: usize) -> Option<&FormulaCell> {
        self.formulas.iter().find(|f| f.row == row && f.col == col)
    }

    pub fn format_for(&self, col: usize) -> Option<&NumberFormat> {
        self.number_formats.iter().find(|f| f.col == col).map(|f| &f.format)
    }
}

fn is_missing(cell: &CellValue) -> bool {
    match cell {
        CellValue::Empty => true,
        CellValue::Text(s) => is_na_token(s),
        CellValue::Number(_) => false,
    }
}

/// Build the formatting plan for an enriched table.
pub fn annotate(table: &EnrichedTable, format: &FormatConfig) -> FormatPlan {
    let layout = &table.layout;
    let mut plan = FormatPlan::default();

    for &col in &layout.inserted {
        let header = &layout.headers[col];
        plan.header_styles.push(HeaderStyle {
            col,
            fill: !format.unfilled_headers.contains(header),
        });
    }

    let columns_named = |names: &[String]| -> Vec<usize> {
        let mut cols: Vec<usize> = names.iter().filter_map(|n| layout.column(n)).collect();
        cols.sort_unstable();
        cols.dedup();
        cols
    };

    for col in columns_named(&format.currency_columns) {
        plan.number_formats.push(ColumnFormat {
            col,
            format: NumberFormat::Currency(format.currency_format.clone()),
        });
    }
    for col in columns_named(&format.general_columns) {
        plan.number_formats.retain(|f| f.col != col);
        plan.number_formats.push(ColumnFormat {
            col,
            format: NumberFormat::General,
        });
    }

    let required = columns_named(&format.required_columns);

    for (i, record) in table.records.iter().enumerate() {
        let row = i + 1;

        for &col in &required {
            if record.cells.get(col).is_some_and(is_missing) {
                plan.highlights.push(Highlight {
                    row,
                    col,
                    reason: HighlightReason::MissingValue,
                });
            }
        }

        if let (true, Some(col)) = (record.needs_review, layout.address) {
            plan.highlights.push(Highlight {
                row,
                col,
                reason: HighlightReason::NeedsReview,
            });
        }

        // A formula over a blank operand would evaluate to the other operand,
        // so rows with a missing side keep an empty cell instead.
        if let (Some(price), Some(diff)) = (layout.price, record.diff_sales_price) {
            plan.formulas.push(FormulaCell {
                row,
                col: layout.sale_price_diff,
                formula: difference(row, layout.sale_price, price),
                cached: Some(diff),
            });
        }
        if let Some(diff) = record.diff_assessed_value {
            plan.formulas.push(FormulaCell {
                row,
                col: layout.assessed_value_diff,
                formula: difference(row, layout.current_assessed_value, layout.sale_assessed_value),
                cached: Some(diff),
            });
        }
    }

    log::debug!(
        "{}: {} highlights, {} formulas",
        table.name,
        plan.highlights.len(),
        plan.formulas.len()
    );

    plan
}
