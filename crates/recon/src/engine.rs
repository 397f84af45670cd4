use std::collections::HashSet;

use crate::coerce::{coerce_number, integer_if_digits, is_na_token};
use crate::config::{NumberParsing, ReconConfig};
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::index::{build_lookup_indexes, LookupIndexes, SourceIndex};
use crate::layout::OutputLayout;
use crate::model::{
    CellValue, EnrichedRecord, EnrichedTable, ReconInput, ReconMeta, ReconResult, VerificationFlag,
};
use crate::parcel::{normalize_cell, CanonicalKey};
use crate::table::Table;

/// Run one reconciliation pass: index the secondary sources, enrich every
/// primary record, summarise.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    config.validate()?;
    let indexes = build_lookup_indexes(&input.sales, &input.roll, config)?;
    let table = reconcile(&input.primary, &indexes, config)?;
    let collisions = indexes.collisions();
    let summary = compute_summary(&table, collisions.len());

    log::info!(
        "reconciled {} records: {} verified, {} unverified, {} unparseable ids",
        summary.total_records,
        summary.verified,
        summary.unverified,
        summary.unparseable_ids
    );

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            collision_policy: config.index.on_duplicate,
        },
        summary,
        collisions,
        table,
    })
}

/// Enrich every primary record against prebuilt indexes.
///
/// Fails only on structural problems (missing parcel column, unplaceable
/// layout). Per-record problems degrade that record to `N`.
pub fn reconcile(
    primary: &Table,
    indexes: &LookupIndexes,
    config: &ReconConfig,
) -> Result<EnrichedTable, ReconError> {
    let parcel_idx = primary.require_column(&config.primary.parcel_column)?;
    let layout = OutputLayout::plan(&primary.headers, config)?;

    if layout.price.is_none() {
        log::warn!(
            "{}: no '{}' column, sales price difference left blank",
            primary.name,
            config.primary.price_column
        );
    }
    if layout.address.is_none() {
        log::warn!(
            "{}: no '{}' column, unverified records will not be flagged for review",
            primary.name,
            config.primary.address_column
        );
    }

    let numeric: HashSet<&str> = config.primary.numeric_columns.iter().map(String::as_str).collect();
    let integer: HashSet<&str> = config.primary.integer_columns.iter().map(String::as_str).collect();
    for name in &config.primary.numeric_columns {
        if primary.column(name).is_none() {
            log::debug!("{}: declared numeric column '{name}' not present", primary.name);
        }
    }

    let mode = config.coercion.numbers;
    let mut records = Vec::with_capacity(primary.len());

    for row in 0..primary.len() {
        // Normalized untrimmed: padded tokens are not numeric.
        let cell = primary.cell(row, parcel_idx);
        let parcel_raw = (!cell.trim().is_empty()).then(|| cell.to_string());
        let key = normalize_cell(parcel_raw.as_deref());
        if key.is_none() {
            log::debug!(
                "{} row {}: unparseable parcel id {:?}",
                primary.name,
                row + 1,
                parcel_raw.as_deref().unwrap_or("")
            );
        }

        let mut failures = 0;
        let mut probe_number = |index: &SourceIndex| {
            let raw = probe(index, key.as_ref())?;
            coerce_logged(raw, mode, &mut failures, &index.source, row)
        };
        let sale_price = probe_number(&indexes.sale_price);
        let sale_assessed_value = probe_number(&indexes.sale_assessed_value);
        let current_assessed_value = probe_number(&indexes.current_assessed_value);
        let condition_code = probe(&indexes.condition_code, key.as_ref())
            .filter(|code| !is_na_token(code))
            .map(str::to_string);

        let verified = if sale_price.is_some()
            && sale_assessed_value.is_some()
            && current_assessed_value.is_some()
            && condition_code.is_some()
        {
            VerificationFlag::Verified
        } else {
            VerificationFlag::Unverified
        };

        let mut cells = vec![CellValue::Empty; layout.width()];
        for (col, source) in layout.sources.iter().enumerate() {
            let Some(src) = source else { continue };
            let raw = primary.cell(row, *src);
            let header = primary.headers[*src].as_str();
            cells[col] = if numeric.contains(header) {
                CellValue::from_number(coerce_logged(raw, mode, &mut failures, &primary.name, row))
            } else if integer.contains(header) {
                integer_if_digits(raw).map_or_else(|| CellValue::text(raw), CellValue::Number)
            } else {
                CellValue::text(raw)
            };
        }

        let primary_price = layout.price.and_then(|p| cells[p].as_number());
        let diff_sales_price = sale_price.zip(primary_price).map(|(s, p)| s - p);
        let diff_assessed_value = current_assessed_value
            .zip(sale_assessed_value)
            .map(|(current, at_sale)| current - at_sale);

        cells[layout.sale_price] = CellValue::from_number(sale_price);
        cells[layout.sale_price_diff] = CellValue::from_number(diff_sales_price);
        cells[layout.sale_assessed_value] = CellValue::from_number(sale_assessed_value);
        cells[layout.current_assessed_value] = CellValue::from_number(current_assessed_value);
        cells[layout.assessed_value_diff] = CellValue::from_number(diff_assessed_value);
        cells[layout.verified] = CellValue::Text(verified.as_str().to_string());
        cells[layout.condition_code] = condition_code
            .as_deref()
            .map_or(CellValue::Empty, CellValue::text);

        records.push(EnrichedRecord {
            row,
            parcel_raw,
            canonical_key: key,
            sale_price,
            sale_assessed_value,
            current_assessed_value,
            condition_code,
            verified,
            diff_sales_price,
            diff_assessed_value,
            needs_review: layout.address.is_some() && verified == VerificationFlag::Unverified,
            coercion_failures: failures,
            cells,
        });
    }

    Ok(EnrichedTable {
        name: primary.name.clone(),
        layout,
        records,
    })
}

fn probe<'a>(index: &'a SourceIndex, key: Option<&CanonicalKey>) -> Option<&'a str> {
    key.and_then(|k| index.get(k.as_str()))
}

/// Coerce, mapping a failure to missing and counting it.
fn coerce_logged(
    raw: &str,
    mode: NumberParsing,
    failures: &mut usize,
    source: &str,
    row: usize,
) -> Option<f64> {
    match coerce_number(raw, mode) {
        Ok(n) => n,
        Err(e) => {
            log::debug!("{source} row {}: {e}, treated as missing", row + 1);
            *failures += 1;
            None
        }
    }
}
