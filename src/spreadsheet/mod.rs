//! # Spreadsheet Document Model
//!
//! Reads an xlsx package into memory and exposes the parts the table codec
//! works on: worksheets as rows of cells with their merge ranges and
//! hyperlinks, the shared string pool and the style tables. Edited parts are
//! written back by streaming the original XML and replacing only the
//! elements that changed.
use thiserror::Error;

pub(crate) mod cell;
pub(crate) mod reference;
pub(crate) mod shared_strings;
pub(crate) mod sheet;
pub(crate) mod styles;
pub(crate) mod workbook;

/// Errors related to the workbook package
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Missing part '{0}' in workbook package")]
    FileError(String),

    #[error("Spreadsheet '{0}' has no worksheet")]
    SpreadsheetEmptyError(String),
}
