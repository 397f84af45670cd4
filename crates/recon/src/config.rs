use std::collections::HashSet;

use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Reconciliation config. Every section has defaults that reproduce the
/// standard residential-sales workbook, so `ReconConfig::default()` is a
/// complete configuration and a TOML file only needs the differences.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    pub name: String,
    pub primary: PrimaryConfig,
    pub sales: SalesConfig,
    pub roll: RollConfig,
    pub index: IndexConfig,
    pub coercion: CoercionConfig,
    pub layout: LayoutConfig,
    pub format: FormatConfig,
    pub ledger: LedgerConfig,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: "residential-sales".into(),
            primary: PrimaryConfig::default(),
            sales: SalesConfig::default(),
            roll: RollConfig::default(),
            index: IndexConfig::default(),
            coercion: CoercionConfig::default(),
            layout: LayoutConfig::default(),
            format: FormatConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// The roll being enriched.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrimaryConfig {
    pub file: Option<String>,
    pub sheet: Option<String>,
    pub parcel_column: String,
    /// Primary-side sale price; the sales-price difference is taken against it.
    pub price_column: String,
    /// Highlighted when a record is unverified.
    pub address_column: String,
    /// Coerced to numbers; unparseable cells become missing.
    pub numeric_columns: Vec<String>,
    /// All-digit text becomes a number, anything else is kept as text.
    pub integer_columns: Vec<String>,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            file: None,
            sheet: None,
            parcel_column: "Parcel Number".into(),
            price_column: "Current Price".into(),
            address_column: "Address".into(),
            numeric_columns: [
                "Current Price",
                "Year Built",
                "Lot Size Acres",
                "Living Sqft (Est)",
                "Tax Assessed Value",
                "Bedrooms Total",
                "Bathrooms Full",
                "Bathrooms Half",
                "Association Fee",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            integer_columns: vec!["MLS #".into()],
        }
    }
}

/// Sales register: sale price, assessed value at sale, condition code.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SalesConfig {
    pub file: Option<String>,
    pub sheet: Option<String>,
    pub key_column: String,
    pub sale_price_column: String,
    pub assessed_value_column: String,
    pub condition_column: String,
}

impl Default for SalesConfig {
    fn default() -> Self {
        Self {
            file: None,
            sheet: None,
            key_column: "print_key".into(),
            sale_price_column: "sale_price".into(),
            assessed_value_column: "total_av".into(),
            condition_column: "sale_condition_code".into(),
        }
    }
}

/// Assessment roll: current assessed value.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RollConfig {
    pub file: Option<String>,
    pub sheet: Option<String>,
    pub key_column: String,
    pub assessed_value_column: String,
}

impl Default for RollConfig {
    fn default() -> Self {
        Self {
            file: None,
            sheet: None,
            key_column: "print_key".into(),
            assessed_value_column: "total_av".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Index + coercion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub on_duplicate: CollisionPolicy,
}

/// What to do when two source rows share a canonical key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Later row overwrites earlier.
    #[default]
    LastWins,
    /// Earlier row is kept.
    FirstWins,
    /// Fail the pass.
    Reject,
}

impl std::fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LastWins => write!(f, "last_wins"),
            Self::FirstWins => write!(f, "first_wins"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CoercionConfig {
    pub numbers: NumberParsing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberParsing {
    /// Plain decimal or scientific notation only.
    #[default]
    Strict,
    /// Also accepts `$`, thousands separators and `(123)` negatives.
    Financial,
}

// ---------------------------------------------------------------------------
// Output layout
// ---------------------------------------------------------------------------

/// Header text and final 0-based position of an inserted column.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InsertedColumn {
    pub header: String,
    pub position: usize,
}

impl InsertedColumn {
    fn new(header: &str, position: usize) -> Self {
        Self {
            header: header.into(),
            position,
        }
    }
}

/// Where the seven enrichment columns land in the output sheet.
///
/// Positions are part of the external interface: the difference formulas and
/// the ledger's ratio formulas address these columns by letter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub sale_price: InsertedColumn,
    pub sale_price_diff: InsertedColumn,
    pub sale_assessed_value: InsertedColumn,
    pub current_assessed_value: InsertedColumn,
    pub assessed_value_diff: InsertedColumn,
    pub verified: InsertedColumn,
    pub condition_code: InsertedColumn,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            sale_price: InsertedColumn::new("5217 Sales Price", 10),
            sale_price_diff: InsertedColumn::new("Difference (Sales Price)", 11),
            sale_assessed_value: InsertedColumn::new("5217 Assessed Value", 12),
            current_assessed_value: InsertedColumn::new("Current Assessed Value", 13),
            assessed_value_diff: InsertedColumn::new("Difference (AV)", 14),
            verified: InsertedColumn::new("Verified (Y/N)", 23),
            condition_code: InsertedColumn::new("Condition Code", 24),
        }
    }
}

impl LayoutConfig {
    /// All inserted columns in declaration order.
    pub fn columns(&self) -> [&InsertedColumn; 7] {
        [
            &self.sale_price,
            &self.sale_price_diff,
            &self.sale_assessed_value,
            &self.current_assessed_value,
            &self.assessed_value_diff,
            &self.verified,
            &self.condition_code,
        ]
    }
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Cells in these columns are highlighted when blank.
    pub required_columns: Vec<String>,
    /// Inserted headers that get bold/center but no fill.
    pub unfilled_headers: Vec<String>,
    pub currency_columns: Vec<String>,
    pub currency_format: String,
    /// Columns forced back to the General number format.
    pub general_columns: Vec<String>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        let strings = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            required_columns: strings(&[
                "5217 Sales Price",
                "5217 Assessed Value",
                "Current Assessed Value",
                "Condition Code",
            ]),
            unfilled_headers: strings(&["Difference (Sales Price)", "Difference (AV)"]),
            currency_columns: strings(&[
                "5217 Sales Price",
                "Difference (Sales Price)",
                "5217 Assessed Value",
                "Current Assessed Value",
                "Difference (AV)",
                "Tax Assessed Value",
            ]),
            currency_format: "$#,##0;[Red]($#,##0)".into(),
            general_columns: strings(&["Living Sqft (Est)"]),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Used in the summary sheet's "<jurisdiction> Sales" label.
    pub jurisdiction: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            jurisdiction: "Stony Point".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let required = [
            ("primary.parcel_column", &self.primary.parcel_column),
            ("sales.key_column", &self.sales.key_column),
            ("sales.sale_price_column", &self.sales.sale_price_column),
            ("sales.assessed_value_column", &self.sales.assessed_value_column),
            ("sales.condition_column", &self.sales.condition_column),
            ("roll.key_column", &self.roll.key_column),
            ("roll.assessed_value_column", &self.roll.assessed_value_column),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("{field} must not be empty")));
            }
        }

        let mut headers = HashSet::new();
        let mut positions = HashSet::new();
        for col in self.layout.columns() {
            if col.header.trim().is_empty() {
                return Err(ReconError::ConfigValidation(
                    "layout: inserted column header must not be empty".into(),
                ));
            }
            if !headers.insert(col.header.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "layout: header '{}' used twice",
                    col.header
                )));
            }
            if !positions.insert(col.position) {
                return Err(ReconError::ConfigValidation(format!(
                    "layout: position {} used twice",
                    col.position
                )));
            }
        }

        if headers.contains(self.primary.parcel_column.as_str()) {
            return Err(ReconError::ConfigValidation(format!(
                "layout: header '{}' collides with primary.parcel_column",
                self.primary.parcel_column
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
