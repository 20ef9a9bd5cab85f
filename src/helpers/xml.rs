//! XML parsing and rewriting utilities for SpreadsheetML parts
//! Provides the XML reader wrapper, attribute/text helper traits and the writer
//! helpers used when a part is re-emitted with edited elements

use crate::error::RustyTableError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::BufRead;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),
}

/// XML reader wrapper with the configuration shared by every part parser
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    /// Creates a new XML reader; empty elements are expanded into start/end pairs
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event from the reader
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, RustyTableError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(RustyTableError::XmlError(error)),
        }
    }
}

/// Helper trait for XML attributes providing convenient value extraction and parsing
pub(crate) trait XmlAttributeHelper<'a> {
    /// Gets the unescaped attribute value as a string
    fn get_value(&self) -> Result<Cow<'a, str>, RustyTableError>;

    /// Parses the attribute value to the specified type
    fn parse_value<T: FromStr>(&self) -> Result<T, RustyTableError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, RustyTableError> {
        Ok(self.unescape_value()?)
    }

    fn parse_value<T: FromStr>(&self) -> Result<T, RustyTableError> {
        self.get_value()?
            .parse()
            .map_err(|_| match std::str::from_utf8(&self.value) {
                Ok(value) => RustyTableError::XmlHelperError(XmlError::ParseAttributeValueError(value.to_string())),
                Err(error) => RustyTableError::StringEncodingError(error),
            })
    }
}

/// Helper trait for XML nodes providing attribute access methods
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an attribute value by name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, RustyTableError>;

    /// Parses an attribute value to the specified type
    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, RustyTableError>;

    /// Collects every attribute as owned (qualified name, unescaped value) pairs,
    /// skipping the names listed in `except`
    fn owned_attributes(&self, except: &[&str]) -> Result<Vec<(String, String)>, RustyTableError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, RustyTableError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, RustyTableError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.parse_value())
            .transpose()
    }

    fn owned_attributes(&self, except: &[&str]) -> Result<Vec<(String, String)>, RustyTableError> {
        let mut attributes = Vec::new();
        for result in self.attributes() {
            let attribute = result?;
            let key = std::str::from_utf8(attribute.key.as_ref())?.to_owned();
            if except.contains(&key.as_str()) {
                continue;
            }
            attributes.push((key, attribute.get_value()?.into_owned()));
        }
        Ok(attributes)
    }
}

/// Helper trait for building text content from XML events
pub(crate) trait XmlTextContextHelper {
    /// Appends text content from BytesText event
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), RustyTableError>;

    /// Appends text content from BytesRef event (handles entities and character references)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), RustyTableError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), RustyTableError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), RustyTableError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = std::char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

/// Writer helpers used when a part is re-emitted
pub(crate) trait XmlWriterHelper {
    /// Writes a start tag carrying the given attributes
    fn write_start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), RustyTableError>;

    /// Writes an end tag
    fn write_end(&mut self, name: &str) -> Result<(), RustyTableError>;

    /// Writes an empty element carrying the given attributes
    fn write_empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), RustyTableError>;

    /// Writes escaped text content
    fn write_text(&mut self, text: &str) -> Result<(), RustyTableError>;
}

impl<W: Write> XmlWriterHelper for Writer<W> {
    fn write_start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), RustyTableError> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.write_event(Event::Start(start))?;
        Ok(())
    }

    fn write_end(&mut self, name: &str) -> Result<(), RustyTableError> {
        self.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn write_empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), RustyTableError> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.write_event(Event::Empty(start))?;
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> Result<(), RustyTableError> {
        self.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }
}

/// Copies `start` with the attributes in `replacements` overwritten (or appended when absent)
pub(crate) fn replace_attributes(start: &BytesStart, replacements: &[(&str, &str)]) -> Result<BytesStart<'static>, RustyTableError> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_owned();
    let mut attributes = start.owned_attributes(&[])?;
    for (key, value) in replacements {
        match attributes.iter_mut().find(|(name, _)| name == key) {
            Some(attribute) => attribute.1 = value.to_string(),
            None => attributes.push((key.to_string(), value.to_string())),
        }
    }
    let mut replaced = BytesStart::new(name);
    for (key, value) in &attributes {
        replaced.push_attribute((key.as_str(), value.as_str()));
    }
    Ok(replaced)
}

#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}
