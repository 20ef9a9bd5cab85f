//! Shared string pool of a workbook (`xl/sharedStrings.xml`).
//!
//! Cells with `t="s"` store an index into this pool instead of their text. The
//! pool is read once per document; strings interned while writing are appended
//! and emitted at the end of the `<sst>` element on save.

use crate::error::RustyTableError;
use crate::helpers::xml::replace_attributes;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::xml::XmlWriterHelper;
use crate::helpers::zip::Package;
use crate::match_xml_events;
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Writer;
use std::io::BufRead;
use thiserror::Error;

pub(crate) const SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";

const TAG_SHARED_STRINGS: QName = QName(b"sst");       // Shared string table root
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings

/// Errors related to shared string resolution
#[derive(Error, Debug, PartialEq)]
pub enum SharedStringsError {
    #[error("Shared string index {index} is out of range, the pool holds {size} strings")]
    PoolIndexOutOfRange { index: usize, size: usize },
}

/// The shared string pool of one document.
#[derive(Debug, Default)]
pub(crate) struct SharedStrings {
    /// Pool entries, original ones first
    items: Vec<String>,
    /// Number of entries read from the part
    loaded: usize,
    /// `count` attribute: total references from cells
    references: usize,
    /// Whether the document has a shared string part at all
    present: bool,
}

impl SharedStrings {
    /// Loads the pool from the package; a package without the part yields an absent, empty pool.
    pub(crate) fn load(package: &Package) -> Result<SharedStrings, RustyTableError> {
        let mut reader = match package.xml_reader(SHARED_STRINGS_PATH) {
            Some(reader) => reader,
            None => return Ok(SharedStrings::default()),
        };

        let mut items = Vec::new();
        let mut references = 0usize;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_SHARED_STRINGS => {
                references = event.parse_attribute_value("count")?.unwrap_or(0);
            }
            Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
                items.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
            }
        });
        Ok(SharedStrings {
            loaded: items.len(),
            references: references.max(items.len()),
            items,
            present: true,
        })
    }

    /// Whether the document encodes strings by shared reference
    pub(crate) fn is_present(&self) -> bool {
        self.present
    }

    /// Number of entries in the pool
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether entries were appended since loading
    pub(crate) fn is_dirty(&self) -> bool {
        self.items.len() > self.loaded
    }

    /// Decodes a raw cell value: a pool lookup when `is_shared`, otherwise the raw text.
    /// The result is trimmed either way; a shared cell without a value reads as empty.
    pub(crate) fn decode(&self, raw: &str, is_shared: bool) -> Result<String, RustyTableError> {
        let raw = raw.trim();
        if !is_shared || raw.is_empty() {
            return Ok(raw.to_owned());
        }
        let index = raw.parse::<usize>()?;
        let text = self.items.get(index).ok_or(SharedStringsError::PoolIndexOutOfRange {
            index,
            size: self.items.len(),
        })?;
        Ok(text.trim().to_owned())
    }

    /// Finds `text` in the pool (exact match) or appends it, returning its index.
    pub(crate) fn intern(&mut self, text: &str) -> usize {
        self.references += 1;
        match self.items.iter().position(|item| item == text) {
            Some(index) => index,
            None => {
                self.items.push(text.to_owned());
                self.items.len() - 1
            }
        }
    }

    /// Re-emits the shared string part with appended entries and updated counts.
    pub(crate) fn to_xml(&self, original: &[u8]) -> Result<Vec<u8>, RustyTableError> {
        let mut reader = XmlReader::new(original);
        let mut writer = Writer::new(Vec::with_capacity(original.len() + 64 * (self.items.len() - self.loaded)));
        let references = self.references.to_string();
        let unique = self.items.len().to_string();
        while let Some(event) = reader.next()? {
            match event {
                Event::Start(event) if event.name() == TAG_SHARED_STRINGS => {
                    let start = replace_attributes(&event, &[("count", &references), ("uniqueCount", &unique)])?;
                    writer.write_event(Event::Start(start))?;
                }
                Event::End(event) if event.name() == TAG_SHARED_STRINGS => {
                    for item in &self.items[self.loaded..] {
                        writer.write_start("si", &[])?;
                        writer.write_start("t", &[("xml:space", "preserve")])?;
                        writer.write_text(item)?;
                        writer.write_end("t")?;
                        writer.write_end("si")?;
                    }
                    writer.write_event(Event::End(event))?;
                }
                event => writer.write_event(event)?,
            }
        }
        Ok(writer.into_inner())
    }
}

#[cfg(test)]
impl SharedStrings {
    /// Builds a present pool from literal entries
    pub(crate) fn from_items(items: &[&str]) -> SharedStrings {
        SharedStrings {
            items: items.iter().map(|item| item.to_string()).collect(),
            loaded: items.len(),
            references: items.len(),
            present: true,
        }
    }
}

/// Reads string value from XML content, handling text and CDATA sections
///
/// Extracts string content from XML elements, skipping phonetic text annotations
/// and properly handling both text nodes and CDATA sections.
///
/// # Arguments
/// * `reader` - XML reader positioned at the start of the string content
/// * `end_tag` - XML tag that marks the end of the string content
/// * `is_text_content` - Whether to treat the content as text by default
pub(crate) fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, RustyTableError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
