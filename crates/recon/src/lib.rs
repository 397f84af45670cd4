//! `parcelgrid-recon`: Parcel-identifier normalization and cross-source
//! assessment reconciliation.
//!
//! Pure engine crate: receives pre-loaded tables, returns an enriched
//! snapshot plus presentation metadata. No CLI or IO dependencies.

pub mod annotate;
pub mod coerce;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod formulas;
pub mod index;
pub mod layout;
pub mod ledger;
pub mod model;
pub mod parcel;
pub mod table;

pub use annotate::{annotate, FormatPlan};
pub use config::ReconConfig;
pub use engine::{reconcile, run};
pub use error::ReconError;
pub use model::{EnrichedTable, ReconInput, ReconResult, VerificationFlag};
pub use parcel::{normalize, CanonicalKey};
pub use table::Table;
