//! Explicit cell typing for declared-numeric columns.

use std::fmt;

use crate::config::NumberParsing;

/// A non-blank cell that is not a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionError {
    pub value: String,
}

impl fmt::Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a number: '{}'", self.value)
    }
}

impl std::error::Error for CoercionError {}

/// Coerce a cell to a number.
///
/// Blank ⇒ `Ok(None)`. Non-numeric or non-finite text ⇒ `Err`; callers
/// treat that as missing.
pub fn coerce_number(raw: &str, mode: NumberParsing) -> Result<Option<f64>, CoercionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let parsed = match mode {
        NumberParsing::Strict => parse_plain_number(trimmed),
        NumberParsing::Financial => parse_financial_number(trimmed),
    };

    match parsed {
        Some(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(CoercionError {
            value: trimmed.to_string(),
        }),
    }
}

/// Placeholder text spreadsheet exports use for an absent value.
pub const NA_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// True when a text cell holds no usable value.
pub fn is_na_token(raw: &str) -> bool {
    NA_TOKENS.contains(&raw.trim())
}

/// Integer-if-digits: all-ASCII-digit text becomes a number, anything else
/// stays text. Used for listing numbers that are sometimes alphanumeric.
pub fn integer_if_digits(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Decimal or scientific notation with an optional sign. Rejects the
/// textual `inf`/`nan` forms that `f64::from_str` would otherwise accept.
fn parse_plain_number(s: &str) -> Option<f64> {
    let body = s.strip_prefix(['-', '+']).unwrap_or(s);
    if !body.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    s.parse().ok()
}

/// Parse a financial number string:
/// - Strip `$`, commas, whitespace
/// - Handle `(123.45)` → `-123.45`
/// - Returns None if non-numeric characters remain after stripping
pub fn parse_financial_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (is_negative, inner) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        (true, &trimmed[1..trimmed.len() - 1])
    } else {
        (false, trimmed)
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    for (i, c) in cleaned.chars().enumerate() {
        match c {
            '0'..='9' | '.' => {}
            '-' | '+' if i == 0 && !is_negative => {}
            _ => return None,
        }
    }

    let value: f64 = cleaned.parse().ok()?;
    Some(if is_negative { -value } else { value })
}
