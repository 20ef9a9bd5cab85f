//! Excel 2007+ (.xlsx, .xlsm) workbook package
use crate::error::RustyTableError;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::Package;
use crate::match_xml_events;
use crate::spreadsheet::shared_strings::SharedStrings;
use crate::spreadsheet::shared_strings::SHARED_STRINGS_PATH;
use crate::spreadsheet::sheet::Worksheet;
use crate::spreadsheet::styles::Styles;
use crate::spreadsheet::styles::STYLES_PATH;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;

const TAG_RELATIONSHIP: &[u8] = b"Relationship";  // Package relationship
const TAG_SHEET: QName = QName(b"sheet");         // Worksheet definition

const WORKBOOK_PATH: &str = "xl/workbook.xml";
const WORKBOOK_RELATIONSHIPS_PATH: &str = "xl/_rels/workbook.xml.rels";

/// An opened workbook: every part of the package plus its worksheet directory.
pub(crate) struct XlsxDocument {
    /// Name the document was bound under
    pub(crate) name: String,
    package: Package,
    /// Worksheets in workbook order with (name, zip_path) pairs
    sheets: Vec<(String, String)>,
}

impl XlsxDocument {
    /// Reads the package and its worksheet directory.
    pub(crate) fn open<RS: Read + Seek>(name: &str, reader: RS) -> Result<XlsxDocument, RustyTableError> {
        let package = Package::open(reader)?;
        let sheets = load_workbook(&package)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(name.to_owned()))?
        }
        Ok(XlsxDocument {
            name: name.to_owned(),
            package,
            sheets,
        })
    }

    pub(crate) fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|(name, _)| name.as_str())
    }

    /// Resolves a sheet selector to the zip path of a worksheet.
    ///
    /// An empty selector means the last sheet. An unknown name also falls back
    /// to the last sheet, with a warning.
    pub(crate) fn sheet_path(&self, selector: &str) -> Result<&str, RustyTableError> {
        let (last_name, last_path) = self.sheets
            .last()
            .ok_or_else(|| SpreadsheetError::SpreadsheetEmptyError(self.name.to_owned()))?;
        if selector.is_empty() {
            return Ok(last_path);
        }
        match self.sheets.iter().find(|(name, _)| name == selector) {
            Some((_, path)) => Ok(path),
            None => {
                let names = self.sheet_names().collect::<Vec<_>>();
                log::warn!("{}: sheet '{}' not found in {:?}, using '{}'", self.name, selector, names, last_name);
                Ok(last_path)
            }
        }
    }

    /// Parses the selected worksheet, returning it with its zip path.
    pub(crate) fn worksheet(&self, selector: &str) -> Result<(String, Worksheet), RustyTableError> {
        let path = self.sheet_path(selector)?;
        let xml = self.package
            .part(path)
            .ok_or_else(|| SpreadsheetError::FileError(path.to_owned()))?;
        Ok((path.to_owned(), Worksheet::parse(xml)?))
    }

    pub(crate) fn shared_strings(&self) -> Result<SharedStrings, RustyTableError> {
        SharedStrings::load(&self.package)
    }

    /// Loads the style tables, `None` when the package has no styles part.
    pub(crate) fn styles(&self) -> Result<Option<Styles>, RustyTableError> {
        self.package.part(STYLES_PATH).map(Styles::load).transpose()
    }

    pub(crate) fn store_worksheet(&mut self, path: &str, worksheet: &Worksheet) -> Result<(), RustyTableError> {
        let original = self.package
            .part(path)
            .ok_or_else(|| SpreadsheetError::FileError(path.to_owned()))?;
        let xml = worksheet.to_xml(original)?;
        self.package.set_part(path, xml);
        Ok(())
    }

    /// Writes appended shared strings back; a no-op when nothing was interned.
    pub(crate) fn store_shared_strings(&mut self, shared_strings: &SharedStrings) -> Result<(), RustyTableError> {
        if !shared_strings.is_dirty() {
            return Ok(());
        }
        let original = self.package
            .part(SHARED_STRINGS_PATH)
            .ok_or_else(|| SpreadsheetError::FileError(SHARED_STRINGS_PATH.to_owned()))?;
        let xml = shared_strings.to_xml(original)?;
        self.package.set_part(SHARED_STRINGS_PATH, xml);
        Ok(())
    }

    pub(crate) fn store_styles(&mut self, styles: &Styles) -> Result<(), RustyTableError> {
        if !styles.is_dirty() {
            return Ok(());
        }
        let original = self.package
            .part(STYLES_PATH)
            .ok_or_else(|| SpreadsheetError::FileError(STYLES_PATH.to_owned()))?;
        let xml = styles.to_xml(original)?;
        self.package.set_part(STYLES_PATH, xml);
        Ok(())
    }

    /// Serializes the package back into xlsx bytes
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, RustyTableError> {
        self.package.to_bytes()
    }
}

/// Loads worksheet relationships from the package
///
/// # Arguments
/// * `package` - Package holding the relationships part
/// * `path` - Path to the relationships XML file within the archive
///
/// # Returns
/// Mapping of relationship IDs to worksheet paths
fn load_relationships(package: &Package, path: &str) -> Result<HashMap<String, String>, RustyTableError> {
    let mut reader = package.xml_reader(path)
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            // Only process worksheet relationships
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Loads worksheet names and their zip paths from `xl/workbook.xml`, in workbook order
fn load_workbook(package: &Package) -> Result<Vec<(String, String)>, RustyTableError> {
    let relationships = load_relationships(package, WORKBOOK_RELATIONSHIPS_PATH)?;
    let mut reader = package.xml_reader(WORKBOOK_PATH)
        .ok_or_else(|| SpreadsheetError::FileError(WORKBOOK_PATH.to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&id.to_string()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
    });
    Ok(sheets)
}

/// Normalizes a relationship target to a path inside the package
fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(absolute) = path.strip_prefix('/') {
        absolute.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}
