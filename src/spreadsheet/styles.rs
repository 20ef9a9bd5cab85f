use crate::error::RustyTableError;
use crate::helpers::xml::replace_attributes;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlWriterHelper;
use crate::match_xml_events;
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Writer;
use std::io::Write;

pub(crate) const STYLES_PATH: &str = "xl/styles.xml";

const TAG_BORDERS: QName = QName(b"borders");         // Border definitions container
const TAG_BORDER: QName = QName(b"border");           // Individual border definition
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");  // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");         // Individual cell format index

/// Index of a cell format (`xf`) in `cellXfs`, stored in a cell's `s` attribute
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct StyleHandle(pub(crate) u32);

/// Border and cell format tables of `xl/styles.xml`, as far as new entries need them.
#[derive(Debug, Default)]
pub(crate) struct Styles {
    /// Border definitions present in the part, `None` without a `<borders>` element
    borders: Option<u32>,
    /// Cell formats present in the part, `None` without a `<cellXfs>` element
    formats: Option<u32>,
    /// Appended borders
    new_borders: u32,
    /// Border id of each appended cell format
    new_formats: Vec<u32>,
}

impl Styles {
    /// Counts the entries of `<borders>` and `<cellXfs>`.
    ///
    /// `border` elements also appear in differential formats and `xf` in
    /// `cellStyleXfs`, so only children of the two tables are counted.
    pub(crate) fn load(xml: &[u8]) -> Result<Styles, RustyTableError> {
        let mut reader = XmlReader::new(xml);
        let mut styles = Styles::default();
        let mut borders_context = false;
        let mut formats_context = false;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_BORDERS => {
                borders_context = true;
                styles.borders = Some(0);
            }
            Event::End(event) if event.name() == TAG_BORDERS => borders_context = false,
            Event::Start(event) if borders_context && event.name() == TAG_BORDER => {
                styles.borders = styles.borders.map(|count| count + 1);
            }
            Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => {
                formats_context = true;
                styles.formats = Some(0);
            }
            Event::End(event) if event.name() == TAG_FORMAT_INDEXES => formats_context = false,
            Event::Start(event) if formats_context && event.name() == TAG_FORMAT_INDEX => {
                styles.formats = styles.formats.map(|count| count + 1);
            }
        });
        Ok(styles)
    }

    /// Appends a thin border on all four sides and a cell format using it.
    /// Returns `None` when the part lacks either table.
    pub(crate) fn append_bordered_style(&mut self) -> Option<StyleHandle> {
        let (borders, formats) = self.borders.zip(self.formats)?;
        let border_id = borders + self.new_borders;
        self.new_borders += 1;
        let format_id = formats + self.new_formats.len() as u32;
        self.new_formats.push(border_id);
        Some(StyleHandle(format_id))
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.new_borders > 0 || !self.new_formats.is_empty()
    }

    /// Re-emits the styles part with appended borders and cell formats and updated counts.
    pub(crate) fn to_xml(&self, original: &[u8]) -> Result<Vec<u8>, RustyTableError> {
        let mut reader = XmlReader::new(original);
        let mut writer = Writer::new(Vec::with_capacity(original.len() + 256));
        let border_count = (self.borders.unwrap_or(0) + self.new_borders).to_string();
        let format_count = (self.formats.unwrap_or(0) + self.new_formats.len() as u32).to_string();
        while let Some(event) = reader.next()? {
            match event {
                Event::Start(event) if event.name() == TAG_BORDERS => {
                    writer.write_event(Event::Start(replace_attributes(&event, &[("count", &border_count)])?))?;
                }
                Event::End(event) if event.name() == TAG_BORDERS => {
                    for _ in 0..self.new_borders {
                        write_thin_border(&mut writer)?;
                    }
                    writer.write_event(Event::End(event))?;
                }
                Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => {
                    writer.write_event(Event::Start(replace_attributes(&event, &[("count", &format_count)])?))?;
                }
                Event::End(event) if event.name() == TAG_FORMAT_INDEXES => {
                    for border_id in &self.new_formats {
                        let border_id = border_id.to_string();
                        writer.write_empty("xf", &[
                            ("numFmtId", "0"),
                            ("fontId", "0"),
                            ("fillId", "0"),
                            ("borderId", &border_id),
                            ("xfId", "0"),
                            ("applyBorder", "1"),
                        ])?;
                    }
                    writer.write_event(Event::End(event))?;
                }
                event => writer.write_event(event)?,
            }
        }
        Ok(writer.into_inner())
    }
}

fn write_thin_border<W: Write>(writer: &mut Writer<W>) -> Result<(), RustyTableError> {
    writer.write_start("border", &[])?;
    for side in ["left", "right", "top", "bottom"] {
        writer.write_start(side, &[("style", "thin")])?;
        writer.write_empty("color", &[("indexed", "64")])?;
        writer.write_end(side)?;
    }
    writer.write_empty("diagonal", &[])?;
    writer.write_end("border")
}
