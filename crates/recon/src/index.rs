use std::collections::{BTreeMap, HashMap};

use crate::config::CollisionPolicy;
use crate::error::ReconError;
use crate::model::KeyCollision;
use crate::table::Table;

/// Canonical key → value mapping for one (source, value column) pair.
#[derive(Debug, Clone)]
pub struct SourceIndex {
    pub source: String,
    pub value_column: String,
    /// `None` values are present-but-blank source cells.
    values: HashMap<String, Option<String>>,
    pub collisions: Vec<KeyCollision>,
}

impl SourceIndex {
    /// Value for a key. `None` both when the key is absent and when the
    /// matched cell is blank; either way the field is missing.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The four lookups a reconciliation pass probes.
#[derive(Debug, Clone)]
pub struct LookupIndexes {
    pub sale_price: SourceIndex,
    pub sale_assessed_value: SourceIndex,
    pub current_assessed_value: SourceIndex,
    pub condition_code: SourceIndex,
}

impl LookupIndexes {
    /// Collisions per source, each duplicate key reported once even though
    /// several value indexes share the same source.
    pub fn collisions(&self) -> Vec<KeyCollision> {
        let mut seen: BTreeMap<(String, String), KeyCollision> = BTreeMap::new();
        for index in [
            &self.sale_price,
            &self.sale_assessed_value,
            &self.current_assessed_value,
            &self.condition_code,
        ] {
            for c in &index.collisions {
                seen.entry((c.source.clone(), c.key.clone()))
                    .or_insert_with(|| c.clone());
            }
        }
        seen.into_values().collect()
    }
}

/// Clean a source key cell: trim whitespace and strip one trailing `.0`
/// left behind when a spreadsheet stored the key as a float.
pub fn clean_key(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_suffix(".0").unwrap_or(trimmed)
}

/// Build a lookup from a secondary source.
///
/// Keys are taken from `key_column` (cleaned with [`clean_key`]); rows with
/// a blank key are skipped. Duplicate keys are resolved by `policy` and
/// always recorded in [`SourceIndex::collisions`].
pub fn build_index(
    table: &Table,
    key_column: &str,
    value_column: &str,
    policy: CollisionPolicy,
) -> Result<SourceIndex, ReconError> {
    let key_idx = table.require_column(key_column)?;
    let value_idx = table.require_column(value_column)?;

    let mut values: HashMap<String, Option<String>> = HashMap::new();
    let mut rows_by_key: BTreeMap<String, Vec<usize>> = BTreeMap::new();

    for row in 0..table.len() {
        let key = clean_key(table.cell(row, key_idx));
        if key.is_empty() {
            continue;
        }

        let rows = rows_by_key.entry(key.to_string()).or_default();
        rows.push(row + 1);

        let value = table.value(row, value_idx).map(|v| v.to_string());
        match policy {
            CollisionPolicy::LastWins | CollisionPolicy::Reject => {
                values.insert(key.to_string(), value);
            }
            CollisionPolicy::FirstWins => {
                values.entry(key.to_string()).or_insert(value);
            }
        }
    }

    let collisions: Vec<KeyCollision> = rows_by_key
        .into_iter()
        .filter(|(_, rows)| rows.len() > 1)
        .map(|(key, rows)| KeyCollision {
            source: table.name.clone(),
            key,
            rows,
        })
        .collect();

    if policy == CollisionPolicy::Reject {
        if let Some(first) = collisions.first() {
            return Err(ReconError::DuplicateKey {
                source: first.source.clone(),
                key: first.key.clone(),
                rows: first.rows.clone(),
            });
        }
    }

    for c in &collisions {
        log::warn!(
            "{}: key '{}' on rows {:?}, keeping {} '{}' ({})",
            c.source,
            c.key,
            c.rows,
            if policy == CollisionPolicy::FirstWins { "first" } else { "last" },
            value_column,
            policy,
        );
    }

    log::debug!(
        "indexed {} keys from {} ({} -> {})",
        values.len(),
        table.name,
        key_column,
        value_column
    );

    Ok(SourceIndex {
        source: table.name.clone(),
        value_column: value_column.to_string(),
        values,
        collisions,
    })
}

/// Build the sale-price, sale-AV, current-AV and condition lookups.
pub fn build_lookup_indexes(
    sales: &Table,
    roll: &Table,
    config: &crate::config::ReconConfig,
) -> Result<LookupIndexes, ReconError> {
    let policy = config.index.on_duplicate;
    let s = &config.sales;
    let r = &config.roll;
    Ok(LookupIndexes {
        sale_price: build_index(sales, &s.key_column, &s.sale_price_column, policy)?,
        sale_assessed_value: build_index(sales, &s.key_column, &s.assessed_value_column, policy)?,
        current_assessed_value: build_index(roll, &r.key_column, &r.assessed_value_column, policy)?,
        condition_code: build_index(sales, &s.key_column, &s.condition_column, policy)?,
    })
}
