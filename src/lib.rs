//! # Rusty Table
//!
//! Reads and writes header-labelled tables in Excel 2007+ workbooks (`.xlsx`,
//! `.xlsm`) and maps their rows to plain record types.
//!
//! ## Features
//!
//! - **Header detection**: The header row is found anywhere in a sheet by
//!   matching cell texts against the column labels of a record type
//! - **Multiple sources**: Any number of files, copies, glob matches or
//!   in-memory streams can be bound to one parser and read as one table
//! - **Parallel extraction**: Sources and rows are decoded on the rayon pool
//! - **In-place writing**: New rows are inserted directly below the header;
//!   merged ranges and hyperlinks below the insertion point move with them
//! - **Cell edits**: Single cells can be overwritten and rows deleted
//! - **Shared strings**: Written text is interned into the workbook's string
//!   pool when it has one, and stored inline otherwise
//!
//! ## Example
//!
//! ```no_run
//! use rusty_table::DataParser;
//! use rusty_table::RowStyle;
//!
//! #[derive(Clone, Debug, Default)]
//! struct Order {
//!     region: String,
//!     rep: String,
//!     units: String,
//! }
//!
//! rusty_table::data_columns!(Order {
//!     "Region" => region,
//!     "Rep" => rep,
//!     "Units" => units,
//! });
//!
//! # fn main() -> Result<(), rusty_table::RustyTableError> {
//! let mut parser = DataParser::<Order>::new();
//! parser.bind("orders.xlsx", true)?;
//! let east: Vec<Order> = parser
//!     .extract_filtered(|order| order.region == "East", "Orders")?
//!     .to_vec();
//! parser.write(&east, RowStyle::Bordered, "Orders")?;
//! # Ok(())
//! # }
//! ```
mod binding;
mod error;
mod helpers;
mod parser;
mod spreadsheet;
mod table;
#[cfg(test)]
mod testing;

pub use binding::ColumnBinding;
pub use binding::Record;
pub use error::RustyTableError;
pub use helpers::reader::SourceStream;
pub use helpers::xml::XmlError;
pub use parser::DataParser;
pub use parser::ParserError;
pub use parser::RowStyle;
pub use parser::SourceSummary;
pub use spreadsheet::reference::build_reference;
pub use spreadsheet::reference::column_index;
pub use spreadsheet::reference::column_name;
pub use spreadsheet::reference::increment_column;
pub use spreadsheet::reference::increment_row;
pub use spreadsheet::reference::parse_reference;
pub use spreadsheet::reference::ReferenceError;
pub use spreadsheet::shared_strings::SharedStringsError;
pub use spreadsheet::sheet::SheetError;
pub use spreadsheet::SpreadsheetError;
pub use table::writer::CellTemplate;
