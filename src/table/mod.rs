//! # Table Codec
//!
//! Maps a header-labelled block of worksheet rows to an intermediate table
//! and back. The header row is found by matching cell texts against the
//! bound column labels; the body is the contiguous run of non-blank rows
//! right below it. Writing inserts new body rows directly under the header.
//!
//! Bindings are referred to by position in the label list handed to the
//! locator, so this layer stays independent of the record type.
use crate::error::RustyTableError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::shared_strings::SharedStrings;

pub(crate) mod body;
pub(crate) mod header;
pub(crate) mod writer;

/// A header column bound to a record field
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct ColumnSlot {
    /// Column number (1-based)
    pub(crate) column: u32,
    /// Position of the binding in the label list
    pub(crate) binding: usize,
}

/// Located header row and its bound columns; no slots means no header was found.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct HeaderMap {
    pub(crate) row: u32,
    pub(crate) slots: Vec<ColumnSlot>,
}

impl HeaderMap {
    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Decoded value of one header slot in a body row
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DataCell {
    /// Position of the binding in the label list
    pub(crate) binding: usize,
    /// Trimmed text, empty when the cell is absent or blank
    pub(crate) value: String,
}

/// A body row: one cell per header slot, in slot order
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DataRow {
    pub(crate) index: u32,
    pub(crate) cells: Vec<DataCell>,
}

impl DataRow {
    pub(crate) fn is_blank(&self) -> bool {
        self.cells.iter().all(|cell| cell.value.is_empty())
    }
}

pub(crate) type DataTable = Vec<DataRow>;

/// One (label, text) pair of a row to write
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FilterValue {
    pub(crate) label: &'static str,
    pub(crate) text: String,
}

/// The write-side row: the first set of a batch carries the header labels themselves
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct FilterSet {
    pub(crate) values: Vec<FilterValue>,
}

impl FilterSet {
    pub(crate) fn labels(&self) -> Vec<&'static str> {
        self.values.iter().map(|value| value.label).collect()
    }

    pub(crate) fn text(&self, label: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|value| value.label == label)
            .map(|value| value.text.as_str())
    }
}

/// Decodes a worksheet cell to trimmed text through the shared string pool
pub(crate) fn decode_cell(cell: &Cell, strings: &SharedStrings) -> Result<String, RustyTableError> {
    strings.decode(&cell.value, cell.kind == CellType::SharedString)
}

/// Encodes text for a new cell: a pool reference when the document has a
/// shared string part, an inline string otherwise.
pub(crate) fn encode_text(text: &str, strings: &mut SharedStrings) -> (CellType, String) {
    if strings.is_present() {
        (CellType::SharedString, strings.intern(text).to_string())
    } else {
        (CellType::InlineString, text.to_owned())
    }
}
