// Integration tests for the `pgrid` binary.
// Run with: cargo test -p parcelgrid-cli --test cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use calamine::{open_workbook_auto, Data, Reader, Sheets};

const FIXTURES: &[&str] = &[
    "residential.csv",
    "sales.csv",
    "roll.csv",
    "default.recon.toml",
    "reject-duplicates.recon.toml",
];

/// Fresh working directory holding a copy of every fixture.
fn workdir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    for name in FIXTURES {
        std::fs::copy(src.join(name), dir.path().join(name)).unwrap();
    }
    dir
}

fn pgrid(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pgrid"));
    cmd.current_dir(dir);
    cmd.env_remove("PGRID_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn process_defaults(dir: &Path, extra: &[&str]) -> Output {
    pgrid(dir)
        .args(["process", "residential.csv", "--sales", "sales.csv", "--roll", "roll.csv"])
        .args(extra)
        .output()
        .expect("pgrid process")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn value(path: &Path, sheet: &str, row: u32, col: u32) -> Data {
    let mut wb: Sheets<_> = open_workbook_auto(path).unwrap();
    let range = wb.worksheet_range(sheet).unwrap();
    range.get_value((row, col)).cloned().unwrap_or(Data::Empty)
}

fn formula(path: &Path, sheet: &str, row: u32, col: u32) -> String {
    let mut wb: Sheets<_> = open_workbook_auto(path).unwrap();
    let range = wb.worksheet_formula(sheet).unwrap();
    range
        .get_value((row, col))
        .map(|f| f.trim_start_matches('=').to_string())
        .unwrap_or_default()
}

fn reconciled(dir: &Path) -> PathBuf {
    dir.join("residential.reconciled.xlsx")
}

// ---------------------------------------------------------------------------
// process
// ---------------------------------------------------------------------------

#[test]
fn process_writes_enriched_workbook() {
    let dir = workdir();
    let output = process_defaults(dir.path(), &[]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let path = reconciled(dir.path());
    assert!(path.exists());
    assert_eq!(value(&path, "Sheet1", 0, 2), Data::String("Parcel Number".into()));
    assert_eq!(value(&path, "Sheet1", 0, 23), Data::String("Verified (Y/N)".into()));
    assert_eq!(value(&path, "Sheet1", 1, 10), Data::Float(300000.0));
    assert_eq!(value(&path, "Sheet1", 1, 23), Data::String("Y".into()));
    assert_eq!(value(&path, "Sheet1", 2, 23), Data::String("N".into()));
    assert_eq!(formula(&path, "Sheet1", 1, 11), "K2-J2");
    assert_eq!(formula(&path, "Sheet1", 1, 14), "N2-M2");

    let err = stderr(&output);
    assert!(err.contains("5 records, 2 verified, 3 unverified"), "{err}");
    assert!(err.contains("unparseable parcel ids: 1"), "{err}");
    assert!(err.contains("14.02-2-9"), "{err}");
}

#[test]
fn process_leaves_sources_untouched() {
    let dir = workdir();
    let before = std::fs::read(dir.path().join("residential.csv")).unwrap();
    let output = process_defaults(dir.path(), &[]);
    assert!(output.status.success());
    assert_eq!(std::fs::read(dir.path().join("residential.csv")).unwrap(), before);
}

#[test]
fn process_json_prints_result() {
    let dir = workdir();
    let output = process_defaults(dir.path(), &["--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(json["summary"]["total_records"], 5);
    assert_eq!(json["summary"]["verified"], 2);
    assert_eq!(json["meta"]["collision_policy"], "last_wins");
    assert_eq!(json["table"]["records"].as_array().unwrap().len(), 5);
    assert_eq!(json["table"]["records"][0]["canonical_key"], "12.34-34-567");
}

#[test]
fn process_summary_json_written_to_file() {
    let dir = workdir();
    let output = process_defaults(dir.path(), &["--summary-json", "run.json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = std::fs::read_to_string(dir.path().join("run.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["summary"]["collisions"], 1);
    assert_eq!(json["collisions"][0]["key"], "14.02-2-9");
    assert!(json["output"].as_str().unwrap().ends_with("residential.reconciled.xlsx"));
    assert!(json.get("table").is_none());
}

#[test]
fn process_explicit_output_path() {
    let dir = workdir();
    let output = process_defaults(dir.path(), &["-o", "march.xlsx"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(dir.path().join("march.xlsx").exists());
    assert!(!reconciled(dir.path()).exists());
}

#[test]
fn process_from_config_resolves_relative_paths() {
    let dir = workdir();
    let elsewhere = tempfile::tempdir().unwrap();
    let config = dir.path().join("default.recon.toml");

    let output = pgrid(elsewhere.path())
        .args(["process", "--config", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(reconciled(dir.path()).exists());
    assert!(stderr(&output).contains("residential: 5 records"));
}

#[test]
fn process_config_from_env() {
    let dir = workdir();
    let output = pgrid(dir.path())
        .arg("process")
        .env("PGRID_CONFIG", "default.recon.toml")
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(reconciled(dir.path()).exists());
}

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

#[test]
fn fail_on_unverified_exits_6_after_writing() {
    let dir = workdir();
    let output = process_defaults(dir.path(), &["--fail-on-unverified"]);
    assert_eq!(output.status.code(), Some(6));
    assert!(stderr(&output).contains("error: 3 of 5 records unverified"));
    assert!(reconciled(dir.path()).exists());
}

#[test]
fn missing_roll_is_usage_error() {
    let dir = workdir();
    let output = pgrid(dir.path())
        .args(["process", "residential.csv", "--sales", "sales.csv"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let err = stderr(&output);
    assert!(err.contains("error: no roll file given"), "{err}");
    assert!(err.contains("hint:"), "{err}");
}

#[test]
fn output_over_source_is_refused() {
    let dir = workdir();
    let output = process_defaults(dir.path(), &["-o", "residential.csv"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("would overwrite a source file"));
}

#[test]
fn invalid_config_exits_3() {
    let dir = workdir();
    std::fs::write(
        dir.path().join("bad.recon.toml"),
        "[coercion]\nnumbers = \"loose\"\n",
    )
    .unwrap();
    let output = process_defaults(dir.path(), &["--config", "bad.recon.toml"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("bad.recon.toml"));
}

#[test]
fn missing_source_file_exits_4() {
    let dir = workdir();
    let output = pgrid(dir.path())
        .args(["process", "residential.csv", "--sales", "nope.csv", "--roll", "roll.csv"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("nope.csv"));
}

#[test]
fn unsupported_source_type_exits_4_with_hint() {
    let dir = workdir();
    std::fs::write(dir.path().join("roll.docx"), "x").unwrap();
    let output = pgrid(dir.path())
        .args(["process", "residential.csv", "--sales", "sales.csv", "--roll", "roll.docx"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("hint:  supported:"));
}

#[test]
fn rejected_duplicates_exit_4() {
    let dir = workdir();
    let output = pgrid(dir.path())
        .args(["process", "--config", "reject-duplicates.recon.toml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    let err = stderr(&output);
    assert!(err.contains("key '14.02-2-9' appears on rows 4, 5"), "{err}");
    assert!(err.contains("on_duplicate"), "{err}");
    assert!(!reconciled(dir.path()).exists());
}

#[test]
fn missing_required_column_exits_4() {
    let dir = workdir();
    std::fs::write(dir.path().join("thin.csv"), "print_key,total_av\n12.34-34-567,1\n").unwrap();
    let output = pgrid(dir.path())
        .args(["process", "residential.csv", "--sales", "thin.csv", "--roll", "roll.csv"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("source 'thin': missing column 'sale_price'"));
}

// ---------------------------------------------------------------------------
// validate / normalize
// ---------------------------------------------------------------------------

#[test]
fn validate_reports_config() {
    let dir = workdir();
    let output = pgrid(dir.path())
        .args(["validate", "default.recon.toml"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.starts_with("valid: \"Stony Point 2025\" (on_duplicate=last_wins, numbers=strict)"), "{out}");
    assert!(out.contains("sales.csv"));
    assert!(!out.contains("not found"));
}

#[test]
fn validate_rejects_duplicate_layout_position() {
    let dir = workdir();
    std::fs::write(
        dir.path().join("clash.recon.toml"),
        "[layout.verified]\nheader = \"Verified\"\nposition = 10\n",
    )
    .unwrap();
    let output = pgrid(dir.path())
        .args(["validate", "clash.recon.toml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn normalize_arguments() {
    let dir = workdir();
    let output = pgrid(dir.path())
        .args(["normalize", "392800.12-34-34-567-0-0", "392800/13/1/1/45/0/0", "H60125"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "392800.12-34-34-567-0-0\t12.34-34-567\n\
         392800/13/1/1/45/0/0\t13.01-1-45\n\
         H60125\tunparseable\n"
    );
}

#[test]
fn normalize_reads_stdin() {
    use std::io::Write;
    use std::process::Stdio;

    let dir = workdir();
    let mut child = pgrid(dir.path())
        .arg("normalize")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"392800.12-5-5-102-1-0\n12.34-567-8\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "392800.12-5-5-102-1-0\t12.05-5-102.1\n12.34-567-8\tunparseable\n"
    );
}

// ---------------------------------------------------------------------------
// ledger
// ---------------------------------------------------------------------------

fn ledger(dir: &Path, extra: &[&str]) -> Output {
    pgrid(dir)
        .args(["ledger", "-o", "ledger.xlsx", "--data-sheet", "2025 Sales", "--summary-sheet", "2025 Summary"])
        .args(extra)
        .output()
        .expect("pgrid ledger")
}

#[test]
fn ledger_from_reconciled_workbook() {
    let dir = workdir();
    assert!(process_defaults(dir.path(), &[]).status.success());

    let output = ledger(dir.path(), &["residential.reconciled.xlsx", "--jurisdiction", "Haverstraw"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let path = dir.path().join("ledger.xlsx");
    assert_eq!(value(&path, "2025 Sales", 1, 0), Data::Float(3345123.0));
    assert_eq!(value(&path, "2025 Sales", 5, 0), Data::Float(3345127.0));
    assert_eq!(value(&path, "2025 Sales", 6, 0), Data::Empty);
    assert_eq!(formula(&path, "2025 Sales", 1, 25), "IF(K2=0,\"\",M2/K2)");
    assert_eq!(value(&path, "2025 Summary", 4, 0), Data::String("Haverstraw Sales".into()));
    assert!(stderr(&output).contains("ledger: 5 rows in '2025 Sales'"));
}

#[test]
fn ledger_extends_base_in_place() {
    let dir = workdir();
    assert!(process_defaults(dir.path(), &[]).status.success());
    assert!(ledger(dir.path(), &["residential.reconciled.xlsx"]).status.success());

    let output = ledger(dir.path(), &["residential.reconciled.xlsx", "--base", "ledger.xlsx"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let path = dir.path().join("ledger.xlsx");
    assert_eq!(value(&path, "2025 Sales", 10, 0), Data::Float(3345127.0));
    assert_eq!(value(&path, "2025 Sales", 11, 0), Data::Empty);
    assert_eq!(formula(&path, "2025 Sales", 10, 26), "IF(Z11=\"\",\"\",ABS(Z11-$AB$2))");
}

#[test]
fn ledger_refuses_to_clobber_without_force() {
    let dir = workdir();
    assert!(process_defaults(dir.path(), &[]).status.success());
    std::fs::write(dir.path().join("ledger.xlsx"), "keep me").unwrap();

    let output = ledger(dir.path(), &["residential.reconciled.xlsx"]);
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(std::fs::read(dir.path().join("ledger.xlsx")).unwrap(), b"keep me");

    let output = ledger(dir.path(), &["residential.reconciled.xlsx", "--force"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[test]
fn ledger_bad_sheet_name_is_usage_error() {
    let dir = workdir();
    assert!(process_defaults(dir.path(), &[]).status.success());
    let output = pgrid(dir.path())
        .args([
            "ledger",
            "residential.reconciled.xlsx",
            "-o",
            "ledger.xlsx",
            "--data-sheet",
            "Sales/2025",
            "--summary-sheet",
            "Summary",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("contains '/'"));
}
