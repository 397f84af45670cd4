//! `pgrid`: reconcile parcel rolls against sales and assessment records.

mod exit_codes;
mod ledger;
mod recon;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use parcelgrid_recon::ReconError;

use exit_codes::{
    EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_SOURCE_LOAD, EXIT_SUCCESS, EXIT_USAGE, EXIT_WRITE,
};

#[derive(Parser)]
#[command(name = "pgrid")]
#[command(about = "Reconcile parcel rolls against sales and assessment records")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log per-record detail (overrides RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich a listings roll with sales and assessment values
    #[command(after_help = "\
Examples:
  pgrid process residential.xlsx --sales sales.csv --roll roll.csv
  pgrid process residential.xlsx --sales sales.csv --roll roll.csv -o out.xlsx
  pgrid process --config stony-point.recon.toml --summary-json run.json
  pgrid process --config stony-point.recon.toml --json --fail-on-unverified")]
    Process(recon::ProcessArgs),

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  pgrid validate stony-point.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: std::path::PathBuf,
    },

    /// Print the canonical key for raw parcel identifiers
    #[command(after_help = "\
Examples:
  pgrid normalize 392800.12-34-34-567-0-0
  cut -d, -f1 listings.csv | pgrid normalize")]
    Normalize {
        /// Raw identifiers; read one per line from stdin when omitted
        ids: Vec<String>,
    },

    /// Build a sales-ratio ledger from reconciled workbooks
    #[command(after_help = "\
Examples:
  pgrid ledger march.reconciled.xlsx april.reconciled.xlsx -o ledger.xlsx \\
      --data-sheet 'Sales Data' --summary-sheet Summary
  pgrid ledger may.reconciled.xlsx -o ledger.xlsx --base ledger.xlsx \\
      --data-sheet 'Sales Data' --summary-sheet Summary")]
    Ledger(ledger::LedgerArgs),
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Process(args) => recon::cmd_process(args),
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Normalize { ids } => recon::cmd_normalize(ids),
        Commands::Ledger(args) => ledger::cmd_ledger(args),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(EXIT_INVALID_CONFIG, msg)
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self::new(EXIT_SOURCE_LOAD, msg)
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self::new(EXIT_WRITE, msg)
    }

    /// Map an engine error to its exit code, with a hint where one helps.
    pub fn recon(err: ReconError) -> Self {
        let code = match &err {
            ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
            ReconError::MissingColumn { .. }
            | ReconError::DuplicateColumn { .. }
            | ReconError::Layout(_)
            | ReconError::DuplicateKey { .. }
            | ReconError::Io(_) => EXIT_SOURCE_LOAD,
        };
        let hint = match &err {
            ReconError::MissingColumn { .. } => {
                Some("column names are set per source in the .recon.toml".to_string())
            }
            ReconError::DuplicateKey { .. } => Some(
                "set [index] on_duplicate = \"last_wins\" or \"first_wins\" to keep one row"
                    .to_string(),
            ),
            ReconError::Layout(_) => {
                Some("check the [layout] positions against the primary's column count".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
