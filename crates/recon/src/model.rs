use serde::Serialize;

use crate::layout::OutputLayout;
use crate::parcel::CanonicalKey;
use crate::table::Table;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The three record sets of one reconciliation pass, already loaded.
#[derive(Debug, Clone)]
pub struct ReconInput {
    pub primary: Table,
    pub sales: Table,
    pub roll: Table,
}

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A typed output cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn text(s: &str) -> Self {
        if s.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }

    pub fn from_number(n: Option<f64>) -> Self {
        n.map_or(Self::Empty, Self::Number)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerificationFlag {
    #[serde(rename = "Y")]
    Verified,
    #[serde(rename = "N")]
    Unverified,
}

impl VerificationFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "Y",
            Self::Unverified => "N",
        }
    }
}

impl std::fmt::Display for VerificationFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One primary record after enrichment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    /// 0-based data row (sheet row = `row + 1`).
    pub row: usize,
    pub parcel_raw: Option<String>,
    pub canonical_key: Option<CanonicalKey>,
    pub sale_price: Option<f64>,
    pub sale_assessed_value: Option<f64>,
    pub current_assessed_value: Option<f64>,
    pub condition_code: Option<String>,
    pub verified: VerificationFlag,
    /// Matched sale price minus the primary's own price.
    pub diff_sales_price: Option<f64>,
    /// Current assessed value minus assessed value at sale.
    pub diff_assessed_value: Option<f64>,
    /// Unverified record with an address column to flag for manual review.
    pub needs_review: bool,
    /// Non-blank declared-numeric cells that failed to coerce and became missing.
    pub coercion_failures: usize,
    /// Full output row in [`OutputLayout`] order.
    pub cells: Vec<CellValue>,
}

/// Enriched snapshot: original columns plus the inserted ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedTable {
    pub name: String,
    pub layout: OutputLayout,
    pub records: Vec<EnrichedRecord>,
}

impl EnrichedTable {
    pub fn headers(&self) -> &[String] {
        &self.layout.headers
    }
}

/// Duplicate key seen while indexing a secondary source. Rows are 1-based
/// data row numbers, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCollision {
    pub source: String,
    pub key: String,
    pub rows: Vec<usize>,
}

// ---------------------------------------------------------------------------
// Summary + Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconSummary {
    pub total_records: usize,
    pub verified: usize,
    pub unverified: usize,
    pub unparseable_ids: usize,
    pub needs_review: usize,
    pub matched_sale_price: usize,
    pub matched_sale_assessed_value: usize,
    pub matched_current_assessed_value: usize,
    pub matched_condition_code: usize,
    pub coercion_failures: usize,
    pub collisions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub collision_policy: crate::config::CollisionPolicy,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub collisions: Vec<KeyCollision>,
    pub table: EnrichedTable,
}
