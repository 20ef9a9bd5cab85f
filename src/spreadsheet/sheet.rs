use crate::error::RustyTableError;
use crate::helpers::xml::replace_attributes;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::xml::XmlWriterHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::reference::build_reference;
use crate::spreadsheet::reference::decrement_row;
use crate::spreadsheet::reference::increment_row;
use crate::spreadsheet::reference::parse_range;
use crate::spreadsheet::reference::parse_reference;
use crate::spreadsheet::reference::reference_row;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Writer;
use std::io::BufRead;
use std::io::Write;
use thiserror::Error;

// XML tag names for parsing and rewriting worksheet parts
const TAG_DIMENSION: QName = QName(b"dimension");       // Used range of the sheet
const TAG_SHEET_DATA: QName = QName(b"sheetData");      // Row container
const TAG_ROW: QName = QName(b"row");                   // Row in worksheet
const TAG_CELL: QName = QName(b"c");                    // Cell in worksheet
const TAG_VALUE: QName = QName(b"v");                   // Cell value content
const TAG_TEXT: QName = QName(b"t");                    // Text within an inline string
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");         // Phonetic text for Asian languages
const TAG_MERGE_CELLS: QName = QName(b"mergeCells");    // Merge range container
const TAG_MERGE_CELL: QName = QName(b"mergeCell");      // Single merge range
const TAG_HYPERLINKS: QName = QName(b"hyperlinks");     // Hyperlink container
const TAG_HYPERLINK: QName = QName(b"hyperlink");       // Single hyperlink anchor

/// Last row number a worksheet can address
pub(crate) const MAX_ROWS: u32 = 1_048_576;

/// Errors related to worksheet structure
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Row edit left the worksheet inconsistent: {0}")]
    StructuralInsertFailure(String),

    #[error("Malformed worksheet: {0}")]
    MalformedWorksheet(String),
}

/// One `<row>` of a worksheet, cells ordered by column.
#[derive(Clone, Debug, Default)]
pub(crate) struct Row {
    /// Row number (1-based)
    pub(crate) index: u32,
    /// Attributes other than `r` and `spans`
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) cells: Vec<Cell>,
}

impl Row {
    pub(crate) fn new(index: u32) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Moves the row and all of its cells to a new row number.
    pub(crate) fn renumber(&mut self, index: u32) {
        self.index = index;
        for cell in &mut self.cells {
            cell.row = index;
        }
    }

    /// Finds the cell in a column
    pub(crate) fn cell(&self, col: u32) -> Option<&Cell> {
        self.cells
            .binary_search_by_key(&col, |cell| cell.col)
            .ok()
            .map(|position| &self.cells[position])
    }

    /// Finds the cell in a column, creating an empty one in column order when missing.
    pub(crate) fn cell_or_insert(&mut self, col: u32) -> &mut Cell {
        let position = match self.cells.binary_search_by_key(&col, |cell| cell.col) {
            Ok(position) => position,
            Err(position) => {
                self.cells.insert(position, Cell::new(self.index, col, CellType::Number, String::new()));
                position
            }
        };
        &mut self.cells[position]
    }
}

/// A hyperlink anchored on a cell or range.
#[derive(Clone, Debug)]
pub(crate) struct Hyperlink {
    pub(crate) reference: String,
    /// Attributes other than `ref` (relationship id, location, tooltip...)
    pub(crate) attributes: Vec<(String, String)>,
}

/// Row-level model of a worksheet part.
///
/// Only the structures that carry absolute row numbers are modelled: rows and
/// their cells, merge ranges and hyperlinks. Everything else in the part is
/// streamed through untouched by [`Worksheet::to_xml`].
#[derive(Debug, Default)]
pub(crate) struct Worksheet {
    rows: Vec<Row>,
    merges: Vec<String>,
    hyperlinks: Vec<Hyperlink>,
}

impl Worksheet {
    /// Parses a worksheet part.
    ///
    /// Rows and cells without an `r` attribute follow the previous one.
    pub(crate) fn parse(xml: &[u8]) -> Result<Worksheet, RustyTableError> {
        let mut reader = XmlReader::new(xml);
        let mut worksheet = Worksheet::default();
        let mut next_row = 1u32;
        let mut next_col = 1u32;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                let index = event.parse_attribute_value::<u32>("r")?.unwrap_or(next_row);
                let attributes = event.owned_attributes(&["r", "spans"])?;
                worksheet.rows.push(Row { index, attributes, cells: Vec::new() });
                next_row = index.saturating_add(1);
                next_col = 1;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                let row = worksheet.rows.last_mut()
                    .ok_or_else(|| SheetError::MalformedWorksheet("cell outside of a row".to_owned()))?;
                let (col, index) = match event.get_attribute_value("r")? {
                    Some(reference) => parse_reference(&reference)?,
                    None => (next_col, row.index),
                };
                if index != row.index {
                    Err(SheetError::MalformedWorksheet(format!("cell {} inside row {}", build_reference(col, index), row.index)))?
                }
                let kind = CellType::parse(event.get_attribute_value("t")?.as_deref());
                let attributes = event.owned_attributes(&["r", "t"])?;
                let (value, inner) = read_cell_content(&mut reader)?;
                row.cells.push(Cell {
                    row: index,
                    col,
                    kind,
                    value,
                    attributes,
                    inner: Some(inner),
                });
                next_col = col.saturating_add(1);
            }
            Event::Start(event) if event.name() == TAG_MERGE_CELL => {
                if let Some(reference) = event.get_attribute_value("ref")? {
                    worksheet.merges.push(reference.into_owned());
                }
            }
            Event::Start(event) if event.name() == TAG_HYPERLINK => {
                if let Some(reference) = event.get_attribute_value("ref")? {
                    let attributes = event.owned_attributes(&["ref"])?;
                    worksheet.hyperlinks.push(Hyperlink { reference: reference.into_owned(), attributes });
                }
            }
        });

        worksheet.rows.sort_by_key(|row| row.index);
        for row in &mut worksheet.rows {
            row.cells.sort_by_key(|cell| cell.col);
        }
        Ok(worksheet)
    }

    pub(crate) fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub(crate) fn merges(&self) -> &[String] {
        &self.merges
    }

    pub(crate) fn hyperlinks(&self) -> &[Hyperlink] {
        &self.hyperlinks
    }

    /// Finds the row with the given number, creating it in sorted position when missing.
    /// Never shifts existing rows.
    pub(crate) fn row_or_insert(&mut self, index: u32) -> &mut Row {
        let position = match self.rows.binary_search_by_key(&index, |row| row.index) {
            Ok(position) => position,
            Err(position) => {
                self.rows.insert(position, Row::new(index));
                position
            }
        };
        &mut self.rows[position]
    }

    /// Inserts a row at `row.index`.
    ///
    /// When that row number is taken, every row at or below it moves down by one
    /// first, and merge ranges and hyperlinks are moved along with them.
    pub(crate) fn insert_row(&mut self, mut row: Row) -> Result<(), RustyTableError> {
        let target = row.index;
        row.renumber(target);
        match self.rows.binary_search_by_key(&target, |row| row.index) {
            Ok(position) => {
                for existing in &mut self.rows[position..] {
                    existing.renumber(existing.index.saturating_add(1));
                }
                self.merges = self.merges
                    .iter()
                    .map(|range| map_range(range, |start| shift_down(start, target), |end| shift_down(end, target)))
                    .collect::<Result<_, _>>()?;
                for hyperlink in &mut self.hyperlinks {
                    hyperlink.reference = map_range(
                        &hyperlink.reference,
                        |start| shift_down(start, target),
                        |end| shift_down(end, target),
                    )?;
                }
                self.rows.insert(position, row);
            }
            Err(position) => self.rows.insert(position, row),
        }
        self.validate()
    }

    /// Deletes row `target`; rows below move up by one.
    ///
    /// Merge ranges and hyperlinks lying entirely on the deleted row are dropped,
    /// the others are shrunk or moved up. Returns whether the row existed.
    pub(crate) fn remove_row(&mut self, target: u32) -> Result<bool, RustyTableError> {
        if target == 0 || target > MAX_ROWS {
            Err(SheetError::StructuralInsertFailure(format!("row {target} is outside the sheet")))?
        }
        let position = self.rows.partition_point(|row| row.index < target);
        let existed = self.rows.get(position).map(|row| row.index == target).unwrap_or(false);
        if existed {
            self.rows.remove(position);
        }
        for row in &mut self.rows[position..] {
            row.renumber(row.index - 1);
        }

        let mut merges = Vec::with_capacity(self.merges.len());
        for range in &self.merges {
            if !on_single_row(range, target)? {
                merges.push(map_range(range, |start| shift_up(start, target), |end| shrink_end(end, target))?);
            }
        }
        self.merges = merges;

        let mut hyperlinks = Vec::with_capacity(self.hyperlinks.len());
        for hyperlink in &self.hyperlinks {
            if !on_single_row(&hyperlink.reference, target)? {
                hyperlinks.push(Hyperlink {
                    reference: map_range(
                        &hyperlink.reference,
                        |start| shift_up(start, target),
                        |end| shrink_end(end, target),
                    )?,
                    attributes: hyperlink.attributes.clone(),
                });
            }
        }
        self.hyperlinks = hyperlinks;

        self.validate()?;
        Ok(existed)
    }

    /// Checks that row numbers are unique and increasing and that every
    /// row-indexed reference still parses and stays inside the sheet.
    fn validate(&self) -> Result<(), RustyTableError> {
        let failure = |message: String| RustyTableError::SheetError(SheetError::StructuralInsertFailure(message));
        let mut previous = 0u32;
        for row in &self.rows {
            if row.index <= previous || row.index > MAX_ROWS {
                return Err(failure(format!("row {} follows row {}", row.index, previous)));
            }
            if let Some(cell) = row.cells.iter().find(|cell| cell.row != row.index) {
                return Err(failure(format!("cell {} inside row {}", cell.reference(), row.index)));
            }
            previous = row.index;
        }

        let references = self.merges
            .iter()
            .chain(self.hyperlinks.iter().map(|hyperlink| &hyperlink.reference));
        for range in references {
            let (start, end) = parse_range(range).map_err(|_| failure(format!("range {range} is malformed")))?;
            let last = reference_row(&start)?.max(reference_row(&end)?);
            if last > MAX_ROWS {
                return Err(failure(format!("range {range} is beyond the last row")));
            }
        }
        Ok(())
    }

    /// Used range of the sheet, `A1` when it holds no cells
    pub(crate) fn dimension(&self) -> String {
        let bounds = self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .fold(None, |bounds: Option<(u32, u32, u32, u32)>, cell| match bounds {
                None => Some((cell.row, cell.col, cell.row, cell.col)),
                Some((top, left, bottom, right)) => Some((
                    top.min(cell.row),
                    left.min(cell.col),
                    bottom.max(cell.row),
                    right.max(cell.col),
                )),
            });
        match bounds {
            Some((top, left, bottom, right)) if (top, left) == (bottom, right) => build_reference(left, top),
            Some((top, left, bottom, right)) => format!("{}:{}", build_reference(left, top), build_reference(right, bottom)),
            None => "A1".to_owned(),
        }
    }

    /// Re-emits the original part with `sheetData`, `mergeCells`, `hyperlinks`
    /// and `dimension` replaced by the current model.
    pub(crate) fn to_xml(&self, original: &[u8]) -> Result<Vec<u8>, RustyTableError> {
        let mut reader = XmlReader::new(original);
        let mut writer = Writer::new(Vec::with_capacity(original.len() + 1024));
        while let Some(event) = reader.next()? {
            match event {
                Event::Start(event) if event.name() == TAG_DIMENSION => {
                    let start = replace_attributes(&event, &[("ref", &self.dimension())])?;
                    writer.write_event(Event::Start(start))?;
                }
                Event::Start(event) if event.name() == TAG_SHEET_DATA => {
                    writer.write_event(Event::Start(event))?;
                    skip_element(&mut reader, TAG_SHEET_DATA)?;
                    self.write_rows(&mut writer)?;
                    writer.write_end("sheetData")?;
                }
                Event::Start(event) if event.name() == TAG_MERGE_CELLS => {
                    skip_element(&mut reader, TAG_MERGE_CELLS)?;
                    if !self.merges.is_empty() {
                        let count = self.merges.len().to_string();
                        writer.write_start("mergeCells", &[("count", &count)])?;
                        for range in &self.merges {
                            writer.write_empty("mergeCell", &[("ref", range)])?;
                        }
                        writer.write_end("mergeCells")?;
                    }
                }
                Event::Start(event) if event.name() == TAG_HYPERLINKS => {
                    skip_element(&mut reader, TAG_HYPERLINKS)?;
                    if !self.hyperlinks.is_empty() {
                        writer.write_start("hyperlinks", &[])?;
                        for hyperlink in &self.hyperlinks {
                            let mut attributes = vec![("ref", hyperlink.reference.as_str())];
                            attributes.extend(hyperlink.attributes.iter().map(|(key, value)| (key.as_str(), value.as_str())));
                            writer.write_empty("hyperlink", &attributes)?;
                        }
                        writer.write_end("hyperlinks")?;
                    }
                }
                event => writer.write_event(event)?,
            }
        }
        Ok(writer.into_inner())
    }

    fn write_rows<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), RustyTableError> {
        for row in &self.rows {
            let index = row.index.to_string();
            let mut attributes = vec![("r", index.as_str())];
            attributes.extend(row.attributes.iter().map(|(key, value)| (key.as_str(), value.as_str())));
            writer.write_start("row", &attributes)?;
            for cell in &row.cells {
                write_cell(writer, cell)?;
            }
            writer.write_end("row")?;
        }
        Ok(())
    }
}

fn write_cell<W: Write>(writer: &mut Writer<W>, cell: &Cell) -> Result<(), RustyTableError> {
    let reference = cell.reference();
    let mut attributes = vec![("r", reference.as_str())];
    if let Some(kind) = cell.kind.as_attribute() {
        attributes.push(("t", kind));
    }
    attributes.extend(cell.attributes.iter().map(|(key, value)| (key.as_str(), value.as_str())));

    match &cell.inner {
        Some(inner) => {
            writer.write_start("c", &attributes)?;
            writer.write_event(Event::Text(BytesText::from_escaped(inner.as_str())))?;
            writer.write_end("c")?;
        }
        None if cell.kind == CellType::Number && cell.value.is_empty() => {
            writer.write_empty("c", &attributes)?;
        }
        None if cell.kind == CellType::InlineString => {
            writer.write_start("c", &attributes)?;
            writer.write_start("is", &[])?;
            writer.write_start("t", &[("xml:space", "preserve")])?;
            writer.write_text(&cell.value)?;
            writer.write_end("t")?;
            writer.write_end("is")?;
            writer.write_end("c")?;
        }
        None => {
            writer.write_start("c", &attributes)?;
            writer.write_start("v", &[])?;
            writer.write_text(&cell.value)?;
            writer.write_end("v")?;
            writer.write_end("c")?;
        }
    }
    Ok(())
}

/// Reads the children of a `<c>` element up to its end tag.
///
/// Returns the cell's text (from `<v>` or the runs of `<is>`, phonetic runs
/// skipped) and the raw child XML so the cell can be written back verbatim.
fn read_cell_content<R: BufRead>(reader: &mut XmlReader<R>) -> Result<(String, String), RustyTableError> {
    let mut writer = Writer::new(Vec::new());
    let mut value = String::new();
    let mut is_phonetic_text = false;
    let mut is_text = false;
    while let Some(event) = reader.next()? {
        match &event {
            Event::End(end) if end.name() == TAG_CELL => break,
            Event::Start(start) if start.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
            Event::End(end) if end.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
            Event::Start(start) if !is_phonetic_text && (start.name() == TAG_VALUE || start.name() == TAG_TEXT) => is_text = true,
            Event::End(end) if end.name() == TAG_VALUE || end.name() == TAG_TEXT => is_text = false,
            Event::Text(text) if is_text => value.push_bytes_text(text)?,
            Event::CData(data) if is_text => value.push_str(&data.xml_content()?),
            Event::GeneralRef(reference) if is_text => value.push_bytes_ref(reference)?,
            _ => (),
        }
        writer.write_event(event)?;
    }
    Ok((value, String::from_utf8(writer.into_inner())?))
}

/// Consumes events up to and including the end tag of the current element
fn skip_element<R: BufRead>(reader: &mut XmlReader<R>, tag: QName) -> Result<(), RustyTableError> {
    match_xml_events!(reader => {
        Event::End(event) if event.name() == tag => break,
    });
    Ok(())
}

/// Applies `shift_start` and `shift_end` to the corners of a range; a single-cell
/// reference only goes through `shift_start`.
fn map_range<S, E>(range: &str, shift_start: S, shift_end: E) -> Result<String, RustyTableError>
where
    S: Fn(&str) -> Result<String, RustyTableError>,
    E: Fn(&str) -> Result<String, RustyTableError>,
{
    let (start, end) = parse_range(range)?;
    if range.contains(':') {
        Ok(format!("{}:{}", shift_start(&start)?, shift_end(&end)?))
    } else {
        shift_start(&start)
    }
}

/// Moves a reference down one row when it sits at or below `target`
fn shift_down(reference: &str, target: u32) -> Result<String, RustyTableError> {
    if reference_row(reference)? >= target {
        Ok(increment_row(reference)?)
    } else {
        Ok(reference.to_owned())
    }
}

/// Moves a reference up one row when it sits below `target`
fn shift_up(reference: &str, target: u32) -> Result<String, RustyTableError> {
    if reference_row(reference)? > target {
        Ok(decrement_row(reference)?)
    } else {
        Ok(reference.to_owned())
    }
}

/// Like [`shift_up`] for the end corner of a range: an end on `target` moves up too,
/// so the range loses the deleted row.
fn shrink_end(reference: &str, target: u32) -> Result<String, RustyTableError> {
    if reference_row(reference)? >= target {
        Ok(decrement_row(reference)?)
    } else {
        Ok(reference.to_owned())
    }
}

/// Whether both corners of a range sit on row `target`
fn on_single_row(range: &str, target: u32) -> Result<bool, RustyTableError> {
    let (start, end) = parse_range(range)?;
    Ok(reference_row(&start)? == target && reference_row(&end)? == target)
}
