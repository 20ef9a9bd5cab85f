use crate::error::RustyTableError;
use crate::spreadsheet::reference::column_index;
use crate::spreadsheet::reference::ReferenceError;
use crate::spreadsheet::sheet::Row;
use crate::spreadsheet::sheet::Worksheet;
use crate::spreadsheet::sheet::MAX_ROWS;
use crate::spreadsheet::shared_strings::SharedStrings;
use crate::spreadsheet::styles::Styles;
use crate::table::encode_text;
use crate::table::header::locate_header;
use crate::table::FilterSet;

/// A single cell edit addressed by column letters and row number.
#[derive(Clone, Debug, PartialEq)]
pub struct CellTemplate {
    /// Column letters, e.g. `"C"` or `"AB"`
    pub column: String,
    /// Row number (1-based)
    pub row: u32,
    /// New text of the cell
    pub value: String,
}

impl CellTemplate {
    pub fn new(column: &str, row: u32, value: &str) -> Self {
        Self {
            column: column.to_owned(),
            row,
            value: value.to_owned(),
        }
    }
}

/// Inserts body rows directly below the header located by the first filter set.
///
/// With `styles` given, one bordered cell format is allocated and applied to
/// every written cell. Values whose label is not a header column are skipped.
/// Returns the number of rows written; zero when no header matches.
pub(crate) fn write_table(
    worksheet: &mut Worksheet,
    strings: &mut SharedStrings,
    styles: Option<&mut Styles>,
    filter_sets: &[FilterSet],
) -> Result<usize, RustyTableError> {
    let (header_set, body) = match filter_sets.split_first() {
        Some(sets) => sets,
        None => return Ok(0),
    };
    let labels = header_set.labels();
    let header = locate_header(worksheet.rows(), strings, &labels)?;
    if header.is_empty() {
        log::warn!("no header row matches columns {labels:?}, nothing written");
        return Ok(0);
    }

    let style = match styles {
        Some(styles) => {
            let style = styles.append_bordered_style();
            if style.is_none() {
                log::warn!("styles part has no border or cell format table, rows are written unstyled");
            }
            style
        }
        None => None,
    };

    for (offset, filter_set) in body.iter().enumerate() {
        let mut row = Row::new(header.row + 1 + offset as u32);
        for slot in &header.slots {
            let text = match filter_set.text(labels[slot.binding]) {
                Some(text) => text,
                None => continue,
            };
            let (kind, value) = encode_text(text, strings);
            let cell = row.cell_or_insert(slot.column);
            cell.set_value(kind, value);
            if let Some(style) = style {
                cell.set_style(style.0);
            }
        }
        worksheet.insert_row(row)?;
    }
    log::debug!("{} rows inserted below header row {}, {} pooled strings", body.len(), header.row, strings.len());
    Ok(body.len())
}

/// Overwrites individually addressed cells, creating missing rows and cells.
///
/// Existing cell attributes such as the style are kept.
pub(crate) fn update_cells(
    worksheet: &mut Worksheet,
    strings: &mut SharedStrings,
    templates: &[CellTemplate],
) -> Result<usize, RustyTableError> {
    for template in templates {
        let col = column_index(&template.column)?;
        if template.row == 0 || template.row > MAX_ROWS {
            Err(ReferenceError::MalformedAddress(format!("{}{}", template.column, template.row)))?
        }
        let (kind, value) = encode_text(&template.value, strings);
        worksheet
            .row_or_insert(template.row)
            .cell_or_insert(col)
            .set_value(kind, value);
    }
    Ok(templates.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellType;
    use crate::table::body::extract_body;
    use crate::table::FilterValue;

    const LABELS: [&str; 3] = ["Region", "Rep", "Units"];

    fn filter_set(texts: &[&str]) -> FilterSet {
        FilterSet {
            values: LABELS
                .iter()
                .copied()
                .zip(texts)
                .map(|(label, text)| FilterValue { label, text: text.to_string() })
                .collect(),
        }
    }

    fn worksheet() -> Worksheet {
        let xml = r#"<worksheet><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>Orders</t></is></c></row><row r="2"><c r="A2" t="s"><v>0</v></c><c r="C2" t="s"><v>1</v></c></row><row r="3"><c r="A3" t="s"><v>2</v></c><c r="C3"><v>12</v></c></row></sheetData><mergeCells count="1"><mergeCell ref="A3:C3"/></mergeCells></worksheet>"#;
        Worksheet::parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn rows_inserted_below_header_and_read_back() {
        let mut sheet = worksheet();
        let mut strings = SharedStrings::from_items(&["Region", "Units", "North"]);
        let sets = vec![filter_set(&LABELS), filter_set(&["East", "Jones", "95"]), filter_set(&["West", "Smith", "50"])];

        assert_eq!(write_table(&mut sheet, &mut strings, None, &sets).unwrap(), 2);

        let rows = sheet.rows();
        assert_eq!(rows.iter().map(|row| row.index).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        // `Rep` is not a header column, so column B stays empty
        assert_eq!(rows[2].cells.iter().map(|cell| cell.col).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(rows[2].cells[0].kind, CellType::SharedString);
        assert_eq!(sheet.merges(), &["A5:C5"]);

        let header = locate_header(sheet.rows(), &strings, &LABELS).unwrap();
        let table = extract_body(&header, sheet.rows(), &strings).unwrap();
        let values: Vec<Vec<&str>> = table
            .iter()
            .map(|row| row.cells.iter().map(|cell| cell.value.as_str()).collect())
            .collect();
        assert_eq!(values, vec![vec!["East", "95"], vec!["West", "50"], vec!["North", "12"]]);
    }

    #[test]
    fn interning_reuses_existing_entries() {
        let mut sheet = worksheet();
        let mut strings = SharedStrings::from_items(&["Region", "Units", "North"]);
        let sets = vec![filter_set(&LABELS), filter_set(&["North", "", "1"]), filter_set(&["North", "", "2"])];
        write_table(&mut sheet, &mut strings, None, &sets).unwrap();

        assert_eq!(strings.len(), 5);
        assert_eq!(sheet.rows()[2].cells[0].value, "2");
        assert_eq!(sheet.rows()[3].cells[0].value, "2");
    }

    #[test]
    fn inline_strings_without_pool() {
        let xml = r#"<worksheet><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>Region</t></is></c></row></sheetData></worksheet>"#;
        let mut sheet = Worksheet::parse(xml.as_bytes()).unwrap();
        let mut strings = SharedStrings::default();
        write_table(&mut sheet, &mut strings, None, &[filter_set(&LABELS), filter_set(&["East"])]).unwrap();

        let cell = &sheet.rows()[1].cells[0];
        assert_eq!(cell.kind, CellType::InlineString);
        assert_eq!(cell.value, "East");
        assert_eq!(strings.len(), 0);
    }

    #[test]
    fn bordered_rows_share_one_style() {
        let mut sheet = worksheet();
        let mut strings = SharedStrings::from_items(&["Region", "Units", "North"]);
        let mut styles = Styles::load(br#"<styleSheet><borders count="1"><border/></borders><cellXfs count="1"><xf/></cellXfs></styleSheet>"#).unwrap();
        let sets = vec![filter_set(&LABELS), filter_set(&["East", "", "1"]), filter_set(&["West", "", "2"])];
        write_table(&mut sheet, &mut strings, Some(&mut styles), &sets).unwrap();

        let style = ("s".to_owned(), "1".to_owned());
        for row in &sheet.rows()[2..4] {
            assert!(row.cells.iter().all(|cell| cell.attributes.contains(&style)));
        }
        assert_eq!(styles.append_bordered_style().map(|handle| handle.0), Some(2));
    }

    #[test]
    fn unmatched_header_writes_nothing() {
        let mut sheet = worksheet();
        let mut strings = SharedStrings::from_items(&["Region", "Units", "North"]);
        let sets = vec![
            FilterSet { values: vec![FilterValue { label: "Country", text: "Country".to_owned() }] },
            FilterSet { values: vec![FilterValue { label: "Country", text: "France".to_owned() }] },
        ];
        assert_eq!(write_table(&mut sheet, &mut strings, None, &sets).unwrap(), 0);
        assert_eq!(sheet.rows().len(), 3);
        assert!(!strings.is_dirty());
    }

    #[test]
    fn update_cells_creates_missing_rows_and_cells() {
        let mut sheet = worksheet();
        let mut strings = SharedStrings::default();
        let templates = vec![
            CellTemplate::new("B", 3, "Jones"),
            CellTemplate::new("c", 3, "13"),
            CellTemplate::new("AA", 10, "far"),
        ];
        assert_eq!(update_cells(&mut sheet, &mut strings, &templates).unwrap(), 3);

        let rows = sheet.rows();
        assert_eq!(rows.iter().map(|row| row.index).collect::<Vec<_>>(), vec![1, 2, 3, 10]);
        assert_eq!(rows[2].cells.iter().map(|cell| cell.reference()).collect::<Vec<_>>(), vec!["A3", "B3", "C3"]);
        assert_eq!(rows[2].cells[2].value, "13");
        assert_eq!(rows[3].cells[0].reference(), "AA10");
        assert_eq!(sheet.merges(), &["A3:C3"]);
    }

    #[test]
    fn update_cells_rejects_bad_addresses() {
        let mut sheet = worksheet();
        let mut strings = SharedStrings::default();
        for template in [CellTemplate::new("1", 1, "x"), CellTemplate::new("A", 0, "x")] {
            assert!(matches!(
                update_cells(&mut sheet, &mut strings, &[template]),
                Err(RustyTableError::ReferenceError(ReferenceError::MalformedAddress(_)))
            ));
        }
    }
}
