use crate::error::RustyTableError;
use crate::spreadsheet::sheet::Row;
use crate::spreadsheet::shared_strings::SharedStrings;
use crate::table::decode_cell;
use crate::table::ColumnSlot;
use crate::table::HeaderMap;

/// Finds the first row whose non-empty cells all name distinct bound columns.
///
/// Blank rows are skipped. Slots are returned in column order. No matching row
/// yields an empty [`HeaderMap`], which is not an error.
pub(crate) fn locate_header(rows: &[Row], strings: &SharedStrings, labels: &[&str]) -> Result<HeaderMap, RustyTableError> {
    'rows: for row in rows {
        let mut slots = Vec::new();
        let mut used = vec![false; labels.len()];
        for cell in &row.cells {
            let text = decode_cell(cell, strings)?;
            if text.is_empty() {
                continue;
            }
            let binding = labels
                .iter()
                .enumerate()
                .position(|(binding, label)| !used[binding] && *label == text);
            match binding {
                Some(binding) => {
                    used[binding] = true;
                    slots.push(ColumnSlot { column: cell.col, binding });
                }
                None => continue 'rows,
            }
        }
        if !slots.is_empty() {
            log::debug!("header located at row {} with {} of {} columns", row.index, slots.len(), labels.len());
            return Ok(HeaderMap { row: row.index, slots });
        }
    }
    Ok(HeaderMap::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::sheet::Worksheet;

    const LABELS: [&str; 3] = ["Region", "Rep", "Units"];

    fn worksheet(rows: &str) -> Worksheet {
        Worksheet::parse(format!("<worksheet><sheetData>{rows}</sheetData></worksheet>").as_bytes()).unwrap()
    }

    fn inline(reference: &str, text: &str) -> String {
        format!(r#"<c r="{reference}" t="inlineStr"><is><t>{text}</t></is></c>"#)
    }

    #[test]
    fn skips_blank_and_foreign_rows() {
        let sheet = worksheet(&format!(
            r#"<row r="1">{}</row><row r="2">{}</row><row r="3">{}{}</row><row r="4">{}{}{}</row>"#,
            inline("A1", "  "),
            inline("B2", "Quarterly report"),
            inline("B3", "Units"),
            inline("D3", " Region "),
            inline("A4", "Region"),
            inline("B4", "Rep"),
            inline("C4", "Units"),
        ));
        let header = locate_header(sheet.rows(), &SharedStrings::default(), &LABELS).unwrap();
        assert_eq!(header.row, 3);
        assert_eq!(header.slots, vec![
            ColumnSlot { column: 2, binding: 2 },
            ColumnSlot { column: 4, binding: 0 },
        ]);
    }

    #[test]
    fn duplicate_label_rejects_row() {
        let sheet = worksheet(&format!(
            r#"<row r="1">{}{}</row><row r="2">{}</row>"#,
            inline("A1", "Rep"),
            inline("B1", "Rep"),
            inline("C2", "Rep"),
        ));
        let header = locate_header(sheet.rows(), &SharedStrings::default(), &LABELS).unwrap();
        assert_eq!(header.row, 2);
        assert_eq!(header.slots, vec![ColumnSlot { column: 3, binding: 1 }]);
    }

    #[test]
    fn decodes_shared_strings() {
        let strings = SharedStrings::from_items(&["Units", "Rep"]);
        let sheet = worksheet(r#"<row r="5"><c r="A5" t="s"><v>1</v></c><c r="B5" t="s"><v>0</v></c></row>"#);
        let header = locate_header(sheet.rows(), &strings, &LABELS).unwrap();
        assert_eq!(header.row, 5);
        assert_eq!(header.slots.iter().map(|slot| slot.binding).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn valueless_shared_cells_are_blank() {
        let strings = SharedStrings::from_items(&["Region", "Units"]);
        let sheet = worksheet(concat!(
            r#"<row r="1"><c r="A1" t="s" s="2"/></row>"#,
            r#"<row r="2"><c r="A2" t="s"><v>0</v></c><c r="B2" t="s"><v></v></c><c r="C2" t="s"><v>1</v></c></row>"#,
        ));
        let header = locate_header(sheet.rows(), &strings, &LABELS).unwrap();
        assert_eq!(header.row, 2);
        assert_eq!(header.slots, vec![
            ColumnSlot { column: 1, binding: 0 },
            ColumnSlot { column: 3, binding: 2 },
        ]);
    }

    #[test]
    fn no_match_is_empty() {
        let sheet = worksheet(&format!(r#"<row r="1">{}</row>"#, inline("A1", "Something else")));
        let header = locate_header(sheet.rows(), &SharedStrings::default(), &LABELS).unwrap();
        assert!(header.is_empty());
        assert_eq!(header, HeaderMap::default());
    }
}
