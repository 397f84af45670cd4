//! Spreadsheet formula text for the enriched sheet and the ledger workbook.
//!
//! Formulas address cells by letter, so every builder here takes resolved
//! 0-based positions rather than hard-coded letters. Rows are 0-based sheet
//! rows (row 0 is the header), rendered 1-based in A1 notation.

use serde::Serialize;

/// A formula to write at a sheet position, with an optional cached result
/// for readers that do not recalculate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaCell {
    pub row: usize,
    pub col: usize,
    pub formula: String,
    pub cached: Option<f64>,
}

/// Convert column index to Excel column letter (0 = A, 25 = Z, 26 = AA, etc.)
pub fn col_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// A1 reference for a 0-based sheet position.
pub fn cell_ref(row: usize, col: usize) -> String {
    format!("{}{}", col_letter(col), row + 1)
}

/// Absolute reference, e.g. `$AB$2`.
pub fn absolute_ref(row: usize, col: usize) -> String {
    format!("${}${}", col_letter(col), row + 1)
}

/// Whole-column range, e.g. `Z:Z`.
pub fn column_range(col: usize) -> String {
    let c = col_letter(col);
    format!("{c}:{c}")
}

/// `=<minuend><r>-<subtrahend><r>`, e.g. `=K2-J2`.
pub fn difference(row: usize, minuend: usize, subtrahend: usize) -> String {
    format!("={}-{}", cell_ref(row, minuend), cell_ref(row, subtrahend))
}

/// Column contract of the ledger data sheet's ratio analysis.
///
/// `ratio = assessed / price` per row, `abs_deviation = |ratio - median|`,
/// with the median and the deviation sum in row 2 of their own columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatioColumns {
    pub sale_price: usize,
    pub assessed_value: usize,
    pub ratio: usize,
    pub abs_deviation: usize,
    pub median: usize,
    pub sum_abs_dev: usize,
}

impl Default for RatioColumns {
    /// K, M, Z, AA, AB, AC.
    fn default() -> Self {
        Self {
            sale_price: 10,
            assessed_value: 12,
            ratio: 25,
            abs_deviation: 26,
            median: 27,
            sum_abs_dev: 28,
        }
    }
}

impl RatioColumns {
    /// Sheet row holding the median and deviation-sum cells (A1 row 2).
    pub const SUMMARY_ROW: usize = 1;

    /// `=IF(K2=0,"",M2/K2)`
    pub fn ratio(&self, row: usize) -> String {
        let k = cell_ref(row, self.sale_price);
        let m = cell_ref(row, self.assessed_value);
        format!("=IF({k}=0,\"\",{m}/{k})")
    }

    /// `=IF(Z2="","",ABS(Z2-$AB$2))`
    pub fn abs_deviation(&self, row: usize) -> String {
        let z = cell_ref(row, self.ratio);
        let median = absolute_ref(Self::SUMMARY_ROW, self.median);
        format!("=IF({z}=\"\",\"\",ABS({z}-{median}))")
    }

    /// `=MEDIAN(Z:Z)`
    pub fn median(&self) -> String {
        format!("=MEDIAN({})", column_range(self.ratio))
    }

    /// `=SUMIF(AA:AA,">0")`
    pub fn sum_abs_dev(&self) -> String {
        format!("=SUMIF({},\">0\")", column_range(self.abs_deviation))
    }
}

/// Quote a sheet name for cross-sheet references: `'2025 Sales'!K:K`.
pub fn sheet_range(sheet: &str, col: usize) -> String {
    format!("'{}'!{}", sheet.replace('\'', "''"), column_range(col))
}

/// Cross-sheet single cell reference: `'2025 Sales'!AB2`.
pub fn sheet_cell(sheet: &str, row: usize, col: usize) -> String {
    format!("'{}'!{}", sheet.replace('\'', "''"), cell_ref(row, col))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters() {
        assert_eq!(col_letter(0), "A");
        assert_eq!(col_letter(9), "J");
        assert_eq!(col_letter(25), "Z");
        assert_eq!(col_letter(26), "AA");
        assert_eq!(col_letter(28), "AC");
        assert_eq!(col_letter(701), "ZZ");
        assert_eq!(col_letter(702), "AAA");
    }

    #[test]
    fn difference_formulas_match_default_layout() {
        assert_eq!(difference(1, 10, 9), "=K2-J2");
        assert_eq!(difference(41, 13, 12), "=N42-M42");
    }

    #[test]
    fn ratio_contract() {
        let r = RatioColumns::default();
        assert_eq!(r.ratio(1), "=IF(K2=0,\"\",M2/K2)");
        assert_eq!(r.abs_deviation(6), "=IF(Z7=\"\",\"\",ABS(Z7-$AB$2))");
        assert_eq!(r.median(), "=MEDIAN(Z:Z)");
        assert_eq!(r.sum_abs_dev(), "=SUMIF(AA:AA,\">0\")");
    }

    #[test]
    fn sheet_refs_quote_names() {
        assert_eq!(sheet_range("2025 Sales", 10), "'2025 Sales'!K:K");
        assert_eq!(sheet_cell("Bob's", 1, 27), "'Bob''s'!AB2");
    }
}
