//! CLI Exit Code Registry
//!
//! Single source of truth for `pgrid` exit codes. Scripts and schedulers
//! rely on them, so a code's meaning never changes once released.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (unspecified)                               |
//! | 2    | Usage error (bad arguments, conflicting paths)            |
//! | 3    | Invalid config (unreadable TOML, failed validation)       |
//! | 4    | Source load failure (file, sheet or required column)      |
//! | 5    | Write failure (output workbook or JSON file)              |
//! | 6    | Unverified records present and `--fail-on-unverified` set |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant below
//! 2. Update the table above
//! 3. Wire it into the relevant command's error handling

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap's own argument errors also exit with 2.
pub const EXIT_USAGE: u8 = 2;

/// Config file cannot be read, parsed or validated.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// A source could not be loaded, or lacks a required column,
/// or has duplicate keys under `on_duplicate = "reject"`.
pub const EXIT_SOURCE_LOAD: u8 = 4;

/// Output workbook or JSON file could not be written.
pub const EXIT_WRITE: u8 = 5;

/// The pass completed but left unverified records (`--fail-on-unverified`).
pub const EXIT_UNVERIFIED: u8 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_INVALID_CONFIG,
            EXIT_SOURCE_LOAD,
            EXIT_WRITE,
            EXIT_UNVERIFIED,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
