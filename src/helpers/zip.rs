//! ZIP package helper for Excel (.xlsx) workbooks
//! Holds every part of the package in memory so edited parts can be written back

use crate::error::RustyTableError;
use crate::helpers::xml::XmlReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;

/// In-memory OPC package: part names and their bytes, in archive order
pub(crate) struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    /// Reads every file entry of the archive into memory
    pub(crate) fn open<RS: Read + Seek>(reader: RS) -> Result<Package, RustyTableError> {
        let mut zip = ZipArchive::new(reader)?;
        let mut parts = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            let mut file = zip.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_owned();
            let mut bytes = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut bytes)?;
            parts.push((name, bytes));
        }
        Ok(Package { parts })
    }

    /// Finds the stored name of a part (case-insensitive, path separator agnostic)
    fn position(&self, name: &str) -> Option<usize> {
        let pattern = name.replace('\\', "/");
        let pattern = pattern.trim_start_matches('/');
        self.parts
            .iter()
            .position(|(part_name, _)| pattern.eq_ignore_ascii_case(part_name))
    }

    /// Gets the bytes of a part by name
    pub(crate) fn part(&self, name: &str) -> Option<&[u8]> {
        self.position(name).map(|index| self.parts[index].1.as_slice())
    }

    /// Creates an XML reader over a part
    pub(crate) fn xml_reader(&self, name: &str) -> Option<XmlReader<&[u8]>> {
        self.part(name).map(XmlReader::new)
    }

    /// Replaces the bytes of an existing part, or appends a new part
    pub(crate) fn set_part(&mut self, name: &str, bytes: Vec<u8>) {
        match self.position(name) {
            Some(index) => self.parts[index].1 = bytes,
            None => self.parts.push((name.trim_start_matches('/').to_owned(), bytes)),
        }
    }

    /// Serializes the package back into a ZIP archive
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, RustyTableError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, bytes) in &self.parts {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes)?;
        }
        Ok(zip.finish()?.into_inner())
    }
}
