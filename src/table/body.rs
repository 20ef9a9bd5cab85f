use crate::error::RustyTableError;
use crate::spreadsheet::sheet::Row;
use crate::spreadsheet::shared_strings::SharedStrings;
use crate::table::decode_cell;
use crate::table::DataCell;
use crate::table::DataRow;
use crate::table::DataTable;
use crate::table::HeaderMap;
use rayon::prelude::*;

/// Reads the rows below the header up to the first gap or fully blank row.
pub(crate) fn extract_body(header: &HeaderMap, rows: &[Row], strings: &SharedStrings) -> Result<DataTable, RustyTableError> {
    let rows = rows
        .iter()
        .filter(|row| row.index > header.row)
        .map(|row| (row.index, read_row(header, row, strings)));
    take_contiguous(header, rows)
}

/// Same result as [`extract_body`], with the rows decoded in parallel.
///
/// Every row below the header is decoded, then the rows are put back in
/// row order before the gap and blank row rules apply. A decoding error in a
/// row past the end of the table is never reported.
pub(crate) fn extract_body_parallel(header: &HeaderMap, rows: &[Row], strings: &SharedStrings) -> Result<DataTable, RustyTableError> {
    let mut decoded: Vec<(u32, Result<DataRow, RustyTableError>)> = rows
        .par_iter()
        .filter(|row| row.index > header.row)
        .map(|row| (row.index, read_row(header, row, strings)))
        .collect();
    decoded.sort_by_key(|(index, _)| *index);
    take_contiguous(header, decoded)
}

fn take_contiguous<I>(header: &HeaderMap, rows: I) -> Result<DataTable, RustyTableError>
where
    I: IntoIterator<Item = (u32, Result<DataRow, RustyTableError>)>,
{
    let mut table = DataTable::new();
    let mut previous = header.row;
    for (index, row) in rows {
        if index > previous.saturating_add(1) {
            break;
        }
        let row = row?;
        if row.is_blank() {
            break;
        }
        previous = row.index;
        table.push(row);
    }
    Ok(table)
}

/// Decodes the header slots of one row; absent cells read as empty text.
fn read_row(header: &HeaderMap, row: &Row, strings: &SharedStrings) -> Result<DataRow, RustyTableError> {
    let mut cells = Vec::with_capacity(header.slots.len());
    for slot in &header.slots {
        let value = match row.cell(slot.column) {
            Some(cell) => decode_cell(cell, strings)?,
            None => String::new(),
        };
        cells.push(DataCell { binding: slot.binding, value });
    }
    Ok(DataRow { index: row.index, cells })
}
