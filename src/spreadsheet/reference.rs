//! Excel-style cell reference algebra.
//!
//! Columns and rows are 1-based, as they appear in SpreadsheetML (`A1` is
//! column 1, row 1). Column letters are bijective base-26: there is no zero
//! digit, so `Z` is 26 and `AA` is 27.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Errors related to cell reference parsing
#[derive(Error, Debug, PartialEq)]
pub enum ReferenceError {
    #[error("Malformed cell address '{0}'")]
    MalformedAddress(String),
}

static CELL_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+)(\d+)$").expect("Hardcode regex pattern"));

/// Converts a 1-based column index to its letter name (`1` → `A`, `27` → `AA`).
pub fn column_name(index: u32) -> String {
    let mut dividend = index;
    let mut letters = Vec::new();
    while dividend > 0 {
        let modulo = (dividend - 1) % 26;
        letters.push(b'A' + modulo as u8);
        dividend = (dividend - modulo - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Converts column letters to a 1-based column index, case-insensitively.
pub fn column_index(name: &str) -> Result<u32, ReferenceError> {
    let malformed = || ReferenceError::MalformedAddress(name.to_owned());
    if name.is_empty() {
        return Err(malformed());
    }
    name.bytes().try_fold(0u32, |index, letter| {
        if !letter.is_ascii_alphabetic() {
            return Err(malformed());
        }
        let digit = u32::from(letter.to_ascii_uppercase() - b'A' + 1);
        index
            .checked_mul(26)
            .and_then(|index| index.checked_add(digit))
            .ok_or_else(malformed)
    })
}

/// Splits a cell reference such as `C12` into `(column, row)`.
pub fn parse_reference(reference: &str) -> Result<(u32, u32), ReferenceError> {
    let malformed = || ReferenceError::MalformedAddress(reference.to_owned());
    let captures = CELL_REFERENCE.captures(reference).ok_or_else(malformed)?;
    let column = column_index(&captures[1])?;
    let row = captures[2].parse::<u32>().map_err(|_| malformed())?;
    if row == 0 {
        return Err(malformed());
    }
    Ok((column, row))
}

/// Builds a cell reference from a 1-based column and row.
pub fn build_reference(column: u32, row: u32) -> String {
    format!("{}{}", column_name(column), row)
}

/// Returns the reference one row further down (`B7` → `B8`).
pub fn increment_row(reference: &str) -> Result<String, ReferenceError> {
    let (column, row) = parse_reference(reference)?;
    let row = row
        .checked_add(1)
        .ok_or_else(|| ReferenceError::MalformedAddress(reference.to_owned()))?;
    Ok(build_reference(column, row))
}

/// Returns the reference one column further right (`Z3` → `AA3`).
pub fn increment_column(reference: &str) -> Result<String, ReferenceError> {
    let (column, row) = parse_reference(reference)?;
    let column = column
        .checked_add(1)
        .ok_or_else(|| ReferenceError::MalformedAddress(reference.to_owned()))?;
    Ok(build_reference(column, row))
}

/// Returns the reference one row further up (`B7` → `B6`); row 1 is malformed to move.
pub(crate) fn decrement_row(reference: &str) -> Result<String, ReferenceError> {
    let (column, row) = parse_reference(reference)?;
    if row <= 1 {
        return Err(ReferenceError::MalformedAddress(reference.to_owned()));
    }
    Ok(build_reference(column, row - 1))
}

/// Row number of a cell reference
pub(crate) fn reference_row(reference: &str) -> Result<u32, ReferenceError> {
    parse_reference(reference).map(|(_, row)| row)
}

/// Splits a range such as `A1:C4` into its two corners; a single cell is its own range.
pub(crate) fn parse_range(range: &str) -> Result<(String, String), ReferenceError> {
    let (start, end) = range.split_once(':').unwrap_or((range, range));
    parse_reference(start)?;
    parse_reference(end)?;
    Ok((start.to_owned(), end.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn column_names() {
        assert_eq!(column_name(1), "A");
        assert_eq!(column_name(26), "Z");
        assert_eq!(column_name(27), "AA");
        assert_eq!(column_name(52), "AZ");
        assert_eq!(column_name(703), "AAA");
        assert_eq!(column_name(16384), "XFD");
    }

    #[test]
    fn column_indexes() {
        assert_eq!(column_index("A"), Ok(1));
        assert_eq!(column_index("z"), Ok(26));
        assert_eq!(column_index("AA"), Ok(27));
        assert_eq!(column_index("XFD"), Ok(16384));
        assert!(column_index("").is_err());
        assert!(column_index("A1").is_err());
        assert!(column_index("ZZZZZZZZZZ").is_err());
    }

    #[test]
    fn parse_references() {
        assert_eq!(parse_reference("A1"), Ok((1, 1)));
        assert_eq!(parse_reference("AB12"), Ok((28, 12)));
        assert_eq!(
            parse_reference("12"),
            Err(ReferenceError::MalformedAddress("12".to_string()))
        );
        assert!(parse_reference("AB").is_err());
        assert!(parse_reference("A0").is_err());
        assert!(parse_reference("A1B").is_err());
    }

    #[test]
    fn increments() {
        assert_eq!(increment_row("C9").unwrap(), "C10");
        assert_eq!(increment_column("C9").unwrap(), "D9");
        assert_eq!(increment_column("Z1").unwrap(), "AA1");
        assert_eq!(increment_column("AZ1").unwrap(), "BA1");
        assert_eq!(increment_column("ZZ1").unwrap(), "AAA1");
        assert_eq!(decrement_row("C10").unwrap(), "C9");
        assert!(decrement_row("C1").is_err());
    }

    #[test]
    fn increment_past_last_row_is_malformed() {
        assert_eq!(increment_row("A4294967294").unwrap(), "A4294967295");
        assert_eq!(
            increment_row("A4294967295"),
            Err(ReferenceError::MalformedAddress("A4294967295".to_string()))
        );
    }

    #[test]
    fn ranges() {
        assert_eq!(parse_range("A2:C5").unwrap(), ("A2".to_string(), "C5".to_string()));
        assert_eq!(parse_range("B3").unwrap(), ("B3".to_string(), "B3".to_string()));
        assert!(parse_range("A2:").is_err());
    }

    proptest! {
        #[test]
        fn column_name_round_trips(index in 1u32..=16384) {
            prop_assert_eq!(column_index(&column_name(index)), Ok(index));
        }
    }
}
