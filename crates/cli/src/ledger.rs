//! `pgrid ledger`: fold reconciled workbooks into a sales-ratio ledger.

use std::path::PathBuf;

use clap::Args;
use parcelgrid_recon::ReconError;

use crate::recon::{load_config, load_source, same_file};
use crate::CliError;

#[derive(Args)]
pub struct LedgerArgs {
    /// Reconciled workbooks to append, in order
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Ledger workbook to write
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// Name of the sheet holding the ledger rows
    #[arg(long)]
    pub data_sheet: String,

    /// Name of the sheet holding the ratio statistics
    #[arg(long)]
    pub summary_sheet: String,

    /// Worksheet to read from each input (default: first sheet)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Existing ledger whose rows come first
    #[arg(long)]
    pub base: Option<PathBuf>,

    /// Data sheet of the existing ledger (default: --data-sheet)
    #[arg(long, requires = "base")]
    pub base_sheet: Option<String>,

    /// Label for the summary sheet's "<jurisdiction> Sales" cell
    #[arg(long)]
    pub jurisdiction: Option<String>,

    /// Path to a .recon.toml config supplying [ledger] settings
    #[arg(long, short = 'c', env = "PGRID_CONFIG")]
    pub config: Option<PathBuf>,

    /// Replace an existing output file that is not the --base ledger
    #[arg(long)]
    pub force: bool,
}

pub fn cmd_ledger(args: LedgerArgs) -> Result<(), CliError> {
    let (mut config, _) = load_config(args.config.as_deref())?;
    if let Some(jurisdiction) = args.jurisdiction {
        config.ledger.jurisdiction = jurisdiction;
    }

    let rebuilds_base = args
        .base
        .as_deref()
        .is_some_and(|base| same_file(&args.output, base));
    if args.output.exists() && !rebuilds_base && !args.force {
        return Err(CliError::usage(format!(
            "{} already exists",
            args.output.display()
        ))
        .with_hint("pass --force to replace it, or --base to extend it"));
    }
    for input in &args.inputs {
        if same_file(&args.output, input) {
            return Err(CliError::usage(format!(
                "output {} is also an input",
                args.output.display()
            )));
        }
    }

    let base = match &args.base {
        Some(path) => {
            let sheet = args.base_sheet.as_deref().unwrap_or(&args.data_sheet);
            Some(load_source(path, Some(sheet))?)
        }
        None => None,
    };
    let sources = args
        .inputs
        .iter()
        .map(|path| load_source(path, args.sheet.as_deref()))
        .collect::<Result<Vec<_>, _>>()?;

    let plan = parcelgrid_recon::ledger::plan(
        base.as_ref(),
        &sources,
        &args.data_sheet,
        &args.summary_sheet,
        &config.ledger,
    )
    .map_err(|e| match e {
        // Only the sheet names are validated here, and they come from flags.
        ReconError::ConfigValidation(msg) => CliError::usage(msg),
        other => CliError::recon(other),
    })?;

    let export = parcelgrid_io::export_ledger(&plan, &args.output).map_err(CliError::write)?;

    let base_rows = base.as_ref().map_or(0, |t| t.len());
    eprintln!(
        "ledger: {} rows in '{}' ({} from base, {} input(s))",
        plan.data.rows.len(),
        plan.data.name,
        base_rows,
        sources.len()
    );
    eprintln!("wrote {} ({})", args.output.display(), export.summary());
    Ok(())
}
