use serde::Serialize;

use crate::config::{InsertedColumn, ReconConfig};
use crate::error::ReconError;

/// Column plan of the enriched sheet.
///
/// Resolved once per pass from the primary header and the layout config.
/// Formula generation reads positions from here, so changing the layout
/// moves the formulas with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputLayout {
    pub headers: Vec<String>,
    /// Primary column each output column is copied from; `None` for inserted columns.
    pub sources: Vec<Option<usize>>,
    pub sale_price: usize,
    pub sale_price_diff: usize,
    pub sale_assessed_value: usize,
    pub current_assessed_value: usize,
    pub assessed_value_diff: usize,
    pub verified: usize,
    pub condition_code: usize,
    /// Output position of the primary price column, when present.
    pub price: Option<usize>,
    /// Output position of the address column, when present.
    pub address: Option<usize>,
    /// Positions of inserted columns, ascending.
    pub inserted: Vec<usize>,
}

impl OutputLayout {
    /// Plan the output columns.
    ///
    /// Primary columns whose header matches an inserted header (left by an
    /// earlier pass) are dropped, then inserted columns are placed in
    /// ascending position order. A position past the current width is an
    /// error: the primary sheet is narrower than the layout expects.
    pub fn plan(primary_headers: &[String], config: &ReconConfig) -> Result<Self, ReconError> {
        for name in [
            &config.primary.parcel_column,
            &config.primary.price_column,
            &config.primary.address_column,
        ] {
            if primary_headers.iter().filter(|h| *h == name).count() > 1 {
                return Err(ReconError::DuplicateColumn {
                    column: name.clone(),
                });
            }
        }

        let inserted_cols = config.layout.columns();
        let is_inserted = |h: &str| inserted_cols.iter().any(|c| c.header == h);

        let mut columns: Vec<(String, Option<usize>)> = primary_headers
            .iter()
            .enumerate()
            .filter(|(_, h)| {
                let stale = is_inserted(h);
                if stale {
                    log::info!("replacing existing column '{h}'");
                }
                !stale
            })
            .map(|(i, h)| (h.clone(), Some(i)))
            .collect();

        let mut ordered: Vec<&InsertedColumn> = inserted_cols.to_vec();
        ordered.sort_by_key(|c| c.position);
        for col in ordered {
            if col.position > columns.len() {
                return Err(ReconError::Layout(format!(
                    "cannot place '{}' at column {}: primary sheet has only {} column(s) at that point",
                    col.header,
                    col.position + 1,
                    columns.len()
                )));
            }
            columns.insert(col.position, (col.header.clone(), None));
        }

        let (headers, sources): (Vec<String>, Vec<Option<usize>>) = columns.into_iter().unzip();
        let find = |h: &str| headers.iter().position(|x| x == h);
        let layout = &config.layout;

        let mut inserted: Vec<usize> = inserted_cols.iter().map(|c| c.position).collect();
        inserted.sort_unstable();

        Ok(Self {
            sale_price: layout.sale_price.position,
            sale_price_diff: layout.sale_price_diff.position,
            sale_assessed_value: layout.sale_assessed_value.position,
            current_assessed_value: layout.current_assessed_value.position,
            assessed_value_diff: layout.assessed_value_diff.position,
            verified: layout.verified.position,
            condition_code: layout.condition_code.position,
            price: find(&config.primary.price_column),
            address: find(&config.primary.address_column),
            inserted,
            headers,
            sources,
        })
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    pub fn is_inserted(&self, col: usize) -> bool {
        self.sources.get(col).is_some_and(|s| s.is_none())
    }
}
