use serde::Serialize;

use crate::error::ReconError;

/// Immutable snapshot of one source sheet: a header row plus data rows.
///
/// Cells are kept as text exactly as loaded (blank = missing). Typing happens
/// later, in the engine, against an explicit column schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Build a table from a header row and row-major cell grid, e.g. one
    /// read from a spreadsheet. The first row is the header; trailing rows
    /// with no content are dropped.
    pub fn from_grid(name: impl Into<String>, mut grid: Vec<Vec<String>>) -> Self {
        while grid
            .last()
            .is_some_and(|row| row.iter().all(|c| c.trim().is_empty()))
        {
            grid.pop();
        }
        if grid.is_empty() {
            return Self::new(name, Vec::new(), Vec::new());
        }
        let headers: Vec<String> = grid.remove(0).into_iter().map(|h| h.trim().to_string()).collect();
        Self::new(name, headers, grid)
    }

    /// Parse CSV text with a header row.
    pub fn from_csv_str(name: &str, data: &str, delimiter: u8) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(data.as_bytes());

        let mut grid = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ReconError::Io(format!("{name}: {e}")))?;
            grid.push(record.iter().map(|f| f.to_string()).collect());
        }
        Ok(Self::from_grid(name, grid))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column with this header.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, ReconError> {
        self.column(name).ok_or_else(|| ReconError::MissingColumn {
            source: self.name.clone(),
            column: name.to_string(),
        })
    }

    /// Cell text, `""` when the row is shorter than the header.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    /// Cell text, or `None` if the cell is blank after trimming.
    pub fn value(&self, row: usize, col: usize) -> Option<&str> {
        let v = self.cell(row, col).trim();
        if v.is_empty() {
            None
        } else {
            Some(v)
        }
    }
}
