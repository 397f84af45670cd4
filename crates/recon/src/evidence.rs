use crate::model::{EnrichedTable, ReconSummary, VerificationFlag};

/// Compute summary statistics from an enriched table.
pub fn compute_summary(table: &EnrichedTable, collisions: usize) -> ReconSummary {
    let mut summary = ReconSummary {
        total_records: table.records.len(),
        collisions,
        ..ReconSummary::default()
    };

    for r in &table.records {
        match r.verified {
            VerificationFlag::Verified => summary.verified += 1,
            VerificationFlag::Unverified => summary.unverified += 1,
        }
        if r.canonical_key.is_none() {
            summary.unparseable_ids += 1;
        }
        if r.needs_review {
            summary.needs_review += 1;
        }
        summary.matched_sale_price += r.sale_price.is_some() as usize;
        summary.matched_sale_assessed_value += r.sale_assessed_value.is_some() as usize;
        summary.matched_current_assessed_value += r.current_assessed_value.is_some() as usize;
        summary.matched_condition_code += r.condition_code.is_some() as usize;
        summary.coercion_failures += r.coercion_failures;
    }

    summary
}
