use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (duplicate layout position, empty column name, etc.).
    ConfigValidation(String),
    /// Missing required column in a source table.
    MissingColumn { source: String, column: String },
    /// Primary header names the same column twice.
    DuplicateColumn { column: String },
    /// Inserted columns cannot be placed into the primary header.
    Layout(String),
    /// Duplicate canonical key under the `reject` collision policy.
    /// `rows` are 1-based data row numbers.
    DuplicateKey { source: String, key: String, rows: Vec<usize> },
    /// IO error (file read, CSV decode, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { source, column } => {
                write!(f, "source '{source}': missing column '{column}'")
            }
            Self::DuplicateColumn { column } => {
                write!(f, "primary source: column '{column}' appears more than once")
            }
            Self::Layout(msg) => write!(f, "layout error: {msg}"),
            Self::DuplicateKey { source, key, rows } => {
                let rows: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
                write!(
                    f,
                    "source '{source}': key '{key}' appears on rows {}",
                    rows.join(", ")
                )
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
