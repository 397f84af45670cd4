// File I/O operations

use std::path::Path;

use parcelgrid_recon::Table;

pub mod csv;
pub mod styles;
pub mod xlsx;

pub use xlsx::{export_enriched, export_ledger, ExportResult};

/// Source file kinds, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Tsv,
    Excel,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "txt" => Ok(Self::Csv),
            "tsv" | "tab" => Ok(Self::Tsv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Excel),
            "" => Err(format!("{}: no file extension", path.display())),
            other => Err(format!("{}: unsupported file type '.{}'", path.display(), other)),
        }
    }
}

/// Table name for a source file: its file stem.
pub fn table_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load one record set. `sheet` applies to workbooks only.
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<Table, String> {
    let name = table_name(path);
    let table = match SourceFormat::from_path(path)? {
        SourceFormat::Csv => {
            if sheet.is_some() {
                log::warn!("{}: --sheet ignored for delimited files", path.display());
            }
            crate::csv::import(path, &name)?
        }
        SourceFormat::Tsv => crate::csv::import_tsv(path, &name)?,
        SourceFormat::Excel => xlsx::import(path, sheet, &name)?,
    };
    log::info!(
        "{}: {} rows, {} columns",
        path.display(),
        table.len(),
        table.headers.len()
    );
    Ok(table)
}
