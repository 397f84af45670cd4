//! Parcel identifier normalization.
//!
//! Primary rolls carry identifiers such as `392800.12-34-34-567-8-0`: a
//! survey code followed by section, block, lot and sub-lot fields,
//! punctuated with any mix of `.`, `-` and `/`. The sales register and assessment roll
//! carry the same parcel in print-key form, `12.34-567-8`-style. This module
//! turns the former into the latter so the sources can be joined.

use std::fmt;

use serde::Serialize;

/// Minimum number of numeric tokens an identifier must contain.
pub const MIN_NUMERIC_TOKENS: usize = 7;

/// Normalized join key: `<part1>.<part2>-<part3>-<part4>[.<extension>]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a raw parcel identifier. Returns `None` when it cannot be parsed.
///
/// Every `.`, `-` and `/` acts as a separator; tokens that are not purely
/// ASCII digits are dropped. With fewer than [`MIN_NUMERIC_TOKENS`] numeric
/// tokens the identifier is unparseable. Otherwise the 1st token (survey
/// code) is discarded and tokens 2..=6 build the key:
///
/// - part1 = integer value of token 2
/// - part2 = integer value of token 3, zero-padded to width 2
/// - part3 = integer value of token 4
/// - part4 = integer value of token 5, plus `.<token 6>` when token 6 is nonzero
pub fn normalize(raw: &str) -> Option<CanonicalKey> {
    if raw.is_empty() {
        return None;
    }

    let numbers: Vec<&str> = raw
        .split(['.', '-', '/'])
        .filter(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()))
        .collect();

    if numbers.len() < MIN_NUMERIC_TOKENS {
        return None;
    }

    let part1 = integer_text(numbers[1]);
    let part2 = format!("{:0>2}", integer_text(numbers[2]));
    let part3 = integer_text(numbers[3]);
    let mut part4 = integer_text(numbers[4]).to_string();
    let extension = integer_text(numbers[5]);
    if extension != "0" {
        part4.push('.');
        part4.push_str(extension);
    }

    Some(CanonicalKey(format!("{part1}.{part2}-{part3}-{part4}")))
}

/// Normalize an optional cell; a missing cell is unparseable.
pub fn normalize_cell(raw: Option<&str>) -> Option<CanonicalKey> {
    raw.and_then(normalize)
}

/// Decimal text of a digit string's integer value (leading zeros removed).
/// Works on the text directly so arbitrarily long tokens never overflow.
fn integer_text(digits: &str) -> &str {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> Option<String> {
        normalize(raw).map(|k| k.to_string())
    }

    #[test]
    fn seven_tokens_with_extension() {
        assert_eq!(key("392800.12-34-567.8-0-0").as_deref(), Some("12.34-567-8"));
        assert_eq!(key("392800.12-34-567.8-1-9").as_deref(), Some("12.34-567-8.1"));
    }

    #[test]
    fn zero_extension_is_omitted() {
        assert_eq!(key("392800/033.00-2-15.000-0000-7").as_deref(), Some("33.00-2-15"));
    }

    #[test]
    fn part2_is_padded_to_two_digits() {
        assert_eq!(key("392800-12-3-45-6-0-0").as_deref(), Some("12.03-45-6"));
        assert_eq!(key("392800-12-123-45-6-0-0").as_deref(), Some("12.123-45-6"));
    }

    #[test]
    fn leading_zeros_are_dropped() {
        assert_eq!(key("392800.0012-0004-0567.008-02-0").as_deref(), Some("12.04-567-8.2"));
        assert_eq!(key("392800.000-00-000.000-000-0").as_deref(), Some("0.00-0-0"));
    }

    #[test]
    fn fewer_than_seven_tokens_is_unparseable() {
        assert_eq!(key("392800.12-34-567.8"), None);
        assert_eq!(key("392800.12-34-567.0"), None);
        assert_eq!(key("1-2-3-4-5-6"), None);
    }

    #[test]
    fn non_numeric_tokens_are_ignored() {
        assert_eq!(key("SBL 392800.12-34-567.8-0-0"), None, "'SBL 392800' is not numeric");
        assert_eq!(key("392800.12-34-567.8-A-0-0").as_deref(), Some("12.34-567-8"));
        assert_eq!(key("392800..12--34//567.8-0-0").as_deref(), Some("12.34-567-8"));
    }

    #[test]
    fn empty_and_missing_are_unparseable() {
        assert_eq!(key(""), None);
        assert_eq!(key("nan"), None);
        assert_eq!(normalize_cell(None), None);
    }

    #[test]
    fn huge_tokens_do_not_overflow() {
        let raw = "1.99999999999999999999999999-1-1-1-0-0";
        assert_eq!(key(raw).as_deref(), Some("99999999999999999999999999.01-1-1"));
    }

    #[test]
    fn deterministic() {
        let raw = "392800.12-34-567.8-0-0";
        assert_eq!(normalize(raw), normalize(raw));
    }
}
