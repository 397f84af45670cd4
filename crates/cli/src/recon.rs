//! `pgrid process`, `pgrid validate` and `pgrid normalize`.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use clap::Args;
use parcelgrid_io::SourceFormat;
use parcelgrid_recon::config::NumberParsing;
use parcelgrid_recon::model::{KeyCollision, ReconMeta, ReconResult, ReconSummary};
use parcelgrid_recon::{ReconConfig, ReconInput, Table};
use serde::Serialize;

use crate::exit_codes::EXIT_UNVERIFIED;
use crate::CliError;

/// Collisions listed individually in the human summary.
const MAX_LISTED_COLLISIONS: usize = 10;

#[derive(Args)]
pub struct ProcessArgs {
    /// Listings roll to enrich (.xlsx, .xls, .ods, .csv, .tsv); defaults to [primary] file
    pub primary: Option<PathBuf>,

    /// Sales register; defaults to [sales] file
    #[arg(long)]
    pub sales: Option<PathBuf>,

    /// Assessment roll; defaults to [roll] file
    #[arg(long)]
    pub roll: Option<PathBuf>,

    /// Path to a .recon.toml config; relative files in it resolve against its directory
    #[arg(long, short = 'c', env = "PGRID_CONFIG")]
    pub config: Option<PathBuf>,

    /// Worksheet of the primary workbook (default: first sheet)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Worksheet of the sales workbook
    #[arg(long)]
    pub sales_sheet: Option<String>,

    /// Worksheet of the roll workbook
    #[arg(long)]
    pub roll_sheet: Option<String>,

    /// Output workbook (default: <primary stem>.reconciled.xlsx beside the primary)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Print the full result as JSON to stdout instead of the human summary
    #[arg(long)]
    pub json: bool,

    /// Write run metadata, summary and collisions as JSON to this file
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Exit with code 6 when any record is unverified
    #[arg(long)]
    pub fail_on_unverified: bool,
}

/// What `--summary-json` writes: everything but the records.
#[derive(Serialize)]
struct RunReport<'a> {
    meta: &'a ReconMeta,
    summary: &'a ReconSummary,
    collisions: &'a [KeyCollision],
    output: String,
}

// ---------------------------------------------------------------------------
// Config + sources
// ---------------------------------------------------------------------------

/// Load the config, or defaults when no file is given. Returns the directory
/// that relative `file` entries resolve against.
pub fn load_config(path: Option<&Path>) -> Result<(ReconConfig, PathBuf), CliError> {
    let Some(path) = path else {
        return Ok((ReconConfig::default(), PathBuf::from(".")));
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::config(format!("cannot read config {}: {e}", path.display())))?;
    let config = ReconConfig::from_toml(&text)
        .map_err(|e| CliError::config(format!("{}: {e}", path.display())))?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    Ok((config, base_dir))
}

/// Command-line path if given, else the config's `file` joined to `base_dir`.
fn source_path(
    flag: Option<PathBuf>,
    configured: Option<&str>,
    base_dir: &Path,
    role: &str,
) -> Result<PathBuf, CliError> {
    flag.or_else(|| configured.map(|file| base_dir.join(file)))
        .ok_or_else(|| {
            CliError::usage(format!("no {role} file given"))
                .with_hint(format!("pass it on the command line or set [{role}] file in the config"))
        })
}

pub fn load_source(path: &Path, sheet: Option<&str>) -> Result<Table, CliError> {
    parcelgrid_io::read_table(path, sheet).map_err(|e| {
        let err = CliError::load(e);
        match SourceFormat::from_path(path) {
            Ok(SourceFormat::Excel) => err.with_hint("check the path and the worksheet name"),
            Ok(_) => err,
            Err(_) => err.with_hint("supported: .xlsx .xlsm .xls .xlsb .ods .csv .txt .tsv .tab"),
        }
    })
}

/// True when both paths name the same file. Paths that do not exist yet
/// are compared as written.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn default_output(primary: &Path) -> PathBuf {
    let stem = parcelgrid_io::table_name(primary);
    primary.with_file_name(format!("{stem}.reconciled.xlsx"))
}

/// The enriched sheet keeps the primary's sheet name when it has one.
fn output_sheet_name(primary: &Path, sheet: Option<&str>) -> String {
    if let Some(sheet) = sheet {
        return sheet.to_string();
    }
    if SourceFormat::from_path(primary) == Ok(SourceFormat::Excel) {
        if let Some(first) = parcelgrid_io::xlsx::sheet_names(primary)
            .ok()
            .and_then(|names| names.into_iter().next())
        {
            return first;
        }
    }
    "Sheet1".to_string()
}

// ---------------------------------------------------------------------------
// process
// ---------------------------------------------------------------------------

pub fn cmd_process(args: ProcessArgs) -> Result<(), CliError> {
    let (config, base_dir) = load_config(args.config.as_deref())?;

    let primary_path =
        source_path(args.primary, config.primary.file.as_deref(), &base_dir, "primary")?;
    let sales_path = source_path(args.sales, config.sales.file.as_deref(), &base_dir, "sales")?;
    let roll_path = source_path(args.roll, config.roll.file.as_deref(), &base_dir, "roll")?;

    let primary_sheet = args.sheet.or_else(|| config.primary.sheet.clone());
    let sales_sheet = args.sales_sheet.or_else(|| config.sales.sheet.clone());
    let roll_sheet = args.roll_sheet.or_else(|| config.roll.sheet.clone());

    let output = args.output.unwrap_or_else(|| default_output(&primary_path));
    for source in [&primary_path, &sales_path, &roll_path] {
        if same_file(&output, source) {
            return Err(CliError::usage(format!(
                "output {} would overwrite a source file",
                output.display()
            ))
            .with_hint("pass -o with a different path"));
        }
    }

    let input = ReconInput {
        primary: load_source(&primary_path, primary_sheet.as_deref())?,
        sales: load_source(&sales_path, sales_sheet.as_deref())?,
        roll: load_source(&roll_path, roll_sheet.as_deref())?,
    };

    let result = parcelgrid_recon::run(&config, &input).map_err(CliError::recon)?;
    let plan = parcelgrid_recon::annotate(&result.table, &config.format);

    let sheet_name = output_sheet_name(&primary_path, primary_sheet.as_deref());
    let export = parcelgrid_io::export_enriched(&result.table, &plan, &sheet_name, &output)
        .map_err(CliError::write)?;

    if let Some(path) = &args.summary_json {
        let report = RunReport {
            meta: &result.meta,
            summary: &result.summary,
            collisions: &result.collisions,
            output: output.display().to_string(),
        };
        let json = to_json(&report)?;
        std::fs::write(path, json + "\n").map_err(|e| {
            CliError::write(format!("cannot write {}: {e}", path.display()))
        })?;
    }

    if args.json {
        println!("{}", to_json(&result)?);
    } else {
        print_summary(&result);
        eprintln!("wrote {} ({})", output.display(), export.summary());
    }

    let unverified = result.summary.unverified;
    if args.fail_on_unverified && unverified > 0 {
        return Err(CliError::new(
            EXIT_UNVERIFIED,
            format!(
                "{unverified} of {} records unverified",
                result.summary.total_records
            ),
        ));
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::general(format!("JSON serialization failed: {e}")))
}

fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    eprintln!(
        "{}: {} records, {} verified, {} unverified",
        result.table.name, s.total_records, s.verified, s.unverified
    );
    eprintln!(
        "  matched: sale price {}, sale AV {}, current AV {}, condition {}",
        s.matched_sale_price,
        s.matched_sale_assessed_value,
        s.matched_current_assessed_value,
        s.matched_condition_code
    );
    if s.unparseable_ids > 0 {
        eprintln!("  unparseable parcel ids: {}", s.unparseable_ids);
    }
    if s.needs_review > 0 {
        eprintln!("  flagged for review: {}", s.needs_review);
    }
    if s.coercion_failures > 0 {
        eprintln!("  numeric cells not parsed: {}", s.coercion_failures);
    }
    if s.collisions > 0 {
        eprintln!(
            "  duplicate keys: {} ({})",
            s.collisions, result.meta.collision_policy
        );
        for c in result.collisions.iter().take(MAX_LISTED_COLLISIONS) {
            let rows: Vec<String> = c.rows.iter().map(|r| r.to_string()).collect();
            eprintln!("    {} {} rows {}", c.source, c.key, rows.join(", "));
        }
        if result.collisions.len() > MAX_LISTED_COLLISIONS {
            eprintln!(
                "    ... and {} more",
                result.collisions.len() - MAX_LISTED_COLLISIONS
            );
        }
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, base_dir) = load_config(Some(&config_path))?;

    let numbers = match config.coercion.numbers {
        NumberParsing::Strict => "strict",
        NumberParsing::Financial => "financial",
    };
    println!(
        "valid: \"{}\" (on_duplicate={}, numbers={})",
        config.name, config.index.on_duplicate, numbers
    );

    let files = [
        ("primary", &config.primary.file),
        ("sales", &config.sales.file),
        ("roll", &config.roll.file),
    ];
    for (role, file) in files {
        if let Some(file) = file {
            let path = base_dir.join(file);
            let note = if path.exists() { "" } else { " (not found)" };
            println!("  {role}: {}{note}", path.display());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// normalize
// ---------------------------------------------------------------------------

pub fn cmd_normalize(ids: Vec<String>) -> Result<(), CliError> {
    if !ids.is_empty() {
        ids.iter().for_each(|id| print_normalized(id));
        return Ok(());
    }
    for line in std::io::stdin().lock().lines() {
        let line = line.map_err(|e| CliError::general(format!("cannot read stdin: {e}")))?;
        print_normalized(&line);
    }
    Ok(())
}

fn print_normalized(raw: &str) {
    match parcelgrid_recon::normalize(raw) {
        Some(key) => println!("{raw}\t{}", key.as_str()),
        None => println!("{raw}\tunparseable"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_sits_beside_primary() {
        let out = default_output(Path::new("/data/Residential 2025.xlsx"));
        assert_eq!(out, PathBuf::from("/data/Residential 2025.reconciled.xlsx"));
    }

    #[test]
    fn command_line_path_overrides_config() {
        let path = source_path(
            Some(PathBuf::from("cli.csv")),
            Some("configured.csv"),
            Path::new("/cfg"),
            "sales",
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("cli.csv"));
    }

    #[test]
    fn config_path_resolves_against_config_dir() {
        let path = source_path(None, Some("sales.csv"), Path::new("/cfg"), "sales").unwrap();
        assert_eq!(path, PathBuf::from("/cfg/sales.csv"));
    }

    #[test]
    fn missing_source_is_usage_error() {
        let err = source_path(None, None, Path::new("."), "roll").unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_USAGE);
        assert_eq!(err.message, "no roll file given");
        assert!(err.hint.unwrap().contains("[roll] file"));
    }

    #[test]
    fn no_config_means_defaults() {
        let (config, base) = load_config(None).unwrap();
        assert_eq!(config.name, "residential-sales");
        assert_eq!(base, PathBuf::from("."));
    }

    #[test]
    fn bad_config_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.recon.toml");
        std::fs::write(&path, "[index]\non_duplicate = \"keep_both\"\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_INVALID_CONFIG);
        assert!(err.message.contains("bad.recon.toml"), "{}", err.message);
    }

    #[test]
    fn csv_primary_gets_default_sheet_name() {
        assert_eq!(output_sheet_name(Path::new("listings.csv"), None), "Sheet1");
        assert_eq!(output_sheet_name(Path::new("listings.csv"), Some("March")), "March");
    }
}
