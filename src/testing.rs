//! In-memory xlsx packages for tests
use crate::spreadsheet::reference::build_reference;
use crate::spreadsheet::reference::parse_reference;
use quick_xml::escape::escape;
use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

const MAIN_NAMESPACE: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIP_NAMESPACE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PACKAGE_RELATIONSHIP_NAMESPACE: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const STYLES: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// Contents of one worksheet
#[derive(Default)]
pub(crate) struct SheetBuilder {
    cells: Vec<(u32, u32, String)>,
    merges: Vec<String>,
    hyperlinks: Vec<(String, String)>,
}

impl SheetBuilder {
    /// Fills a row from column `A`; empty texts leave the cell out.
    pub(crate) fn row(mut self, index: u32, texts: &[&str]) -> Self {
        for (offset, text) in texts.iter().enumerate() {
            if !text.is_empty() {
                self.cells.push((index, offset as u32 + 1, text.to_string()));
            }
        }
        self
    }

    pub(crate) fn cell(mut self, reference: &str, text: &str) -> Self {
        let (col, row) = parse_reference(reference).expect("test cell reference");
        self.cells.push((row, col, text.to_owned()));
        self
    }

    pub(crate) fn merge(mut self, range: &str) -> Self {
        self.merges.push(range.to_owned());
        self
    }

    /// Adds an in-document hyperlink
    pub(crate) fn hyperlink(mut self, reference: &str, location: &str) -> Self {
        self.hyperlinks.push((reference.to_owned(), location.to_owned()));
        self
    }

    fn to_xml(&self, shared_strings: Option<&mut Vec<String>>) -> String {
        let mut cells = self.cells.clone();
        cells.sort_by_key(|(row, col, _)| (*row, *col));

        let mut rows = String::new();
        let mut shared_strings = shared_strings;
        let mut current = None::<u32>;
        for (row, col, text) in &cells {
            if current != Some(*row) {
                if current.is_some() {
                    rows.push_str("</row>");
                }
                rows.push_str(&format!(r#"<row r="{row}">"#));
                current = Some(*row);
            }
            let reference = build_reference(*col, *row);
            match shared_strings.as_mut() {
                Some(pool) => {
                    let index = match pool.iter().position(|item| item == text) {
                        Some(index) => index,
                        None => {
                            pool.push(text.clone());
                            pool.len() - 1
                        }
                    };
                    rows.push_str(&format!(r#"<c r="{reference}" t="s"><v>{index}</v></c>"#));
                }
                None => rows.push_str(&format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                    escape(text.as_str())
                )),
            }
        }
        if current.is_some() {
            rows.push_str("</row>");
        }

        let mut xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{MAIN_NAMESPACE}" xmlns:r="{RELATIONSHIP_NAMESPACE}"><dimension ref="A1"/><sheetData>{rows}</sheetData>"#
        );
        if !self.merges.is_empty() {
            xml.push_str(&format!(r#"<mergeCells count="{}">"#, self.merges.len()));
            for range in &self.merges {
                xml.push_str(&format!(r#"<mergeCell ref="{range}"/>"#));
            }
            xml.push_str("</mergeCells>");
        }
        if !self.hyperlinks.is_empty() {
            xml.push_str("<hyperlinks>");
            for (reference, location) in &self.hyperlinks {
                xml.push_str(&format!(r#"<hyperlink ref="{reference}" location="{}"/>"#, escape(location.as_str())));
            }
            xml.push_str("</hyperlinks>");
        }
        xml.push_str("</worksheet>");
        xml
    }
}

/// Builds a minimal but complete xlsx package.
///
/// By default text cells go through a shared string part and a default
/// stylesheet is included.
pub(crate) struct WorkbookBuilder {
    sheets: Vec<(String, SheetBuilder)>,
    inline_strings: bool,
    raw_shared_strings: Option<String>,
    styles: bool,
}

impl WorkbookBuilder {
    pub(crate) fn new() -> Self {
        Self {
            sheets: Vec::new(),
            inline_strings: false,
            raw_shared_strings: None,
            styles: true,
        }
    }

    /// Writes text cells as inline strings and leaves the shared string part out
    pub(crate) fn inline_strings(mut self) -> Self {
        self.inline_strings = true;
        self
    }

    /// Uses the given shared string part verbatim; sheet cells become inline strings
    pub(crate) fn raw_shared_strings(mut self, xml: &str) -> Self {
        self.raw_shared_strings = Some(xml.to_owned());
        self
    }

    pub(crate) fn without_styles(mut self) -> Self {
        self.styles = false;
        self
    }

    pub(crate) fn sheet<F>(mut self, name: &str, build: F) -> Self
    where
        F: FnOnce(SheetBuilder) -> SheetBuilder,
    {
        self.sheets.push((name.to_owned(), build(SheetBuilder::default())));
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut parts = Vec::<(String, String)>::new();
        let mut pool = Vec::<String>::new();
        let use_pool = !self.inline_strings && self.raw_shared_strings.is_none();

        for (position, (_, sheet)) in self.sheets.iter().enumerate() {
            let xml = sheet.to_xml(if use_pool { Some(&mut pool) } else { None });
            parts.push((format!("xl/worksheets/sheet{}.xml", position + 1), xml));
        }

        let shared_strings = match (&self.raw_shared_strings, use_pool) {
            (Some(xml), _) => Some(xml.clone()),
            (None, true) => {
                let items: String = pool
                    .iter()
                    .map(|item| format!(r#"<si><t xml:space="preserve">{}</t></si>"#, escape(item.as_str())))
                    .collect();
                Some(format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="{MAIN_NAMESPACE}" count="{0}" uniqueCount="{0}">{items}</sst>"#,
                    pool.len()
                ))
            }
            (None, false) => None,
        };

        let mut content_types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        );
        let mut sheets = String::new();
        let mut relationships = String::new();
        for (position, (name, _)) in self.sheets.iter().enumerate() {
            let id = position + 1;
            content_types.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{id}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            ));
            sheets.push_str(&format!(r#"<sheet name="{}" sheetId="{id}" r:id="rId{id}"/>"#, escape(name.as_str())));
            relationships.push_str(&format!(
                r#"<Relationship Id="rId{id}" Type="{RELATIONSHIP_NAMESPACE}/worksheet" Target="worksheets/sheet{id}.xml"/>"#
            ));
        }
        if self.styles {
            content_types.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
            relationships.push_str(&format!(
                r#"<Relationship Id="rIdStyles" Type="{RELATIONSHIP_NAMESPACE}/styles" Target="styles.xml"/>"#
            ));
            parts.push(("xl/styles.xml".to_owned(), STYLES.to_owned()));
        }
        if let Some(xml) = shared_strings {
            content_types.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
            relationships.push_str(&format!(
                r#"<Relationship Id="rIdStrings" Type="{RELATIONSHIP_NAMESPACE}/sharedStrings" Target="sharedStrings.xml"/>"#
            ));
            parts.push(("xl/sharedStrings.xml".to_owned(), xml));
        }
        content_types.push_str("</Types>");

        parts.insert(0, ("[Content_Types].xml".to_owned(), content_types));
        parts.insert(1, (
            "_rels/.rels".to_owned(),
            format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PACKAGE_RELATIONSHIP_NAMESPACE}"><Relationship Id="rId1" Type="{RELATIONSHIP_NAMESPACE}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#),
        ));
        parts.insert(2, (
            "xl/workbook.xml".to_owned(),
            format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{MAIN_NAMESPACE}" xmlns:r="{RELATIONSHIP_NAMESPACE}"><sheets>{sheets}</sheets></workbook>"#),
        ));
        parts.insert(3, (
            "xl/_rels/workbook.xml.rels".to_owned(),
            format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PACKAGE_RELATIONSHIP_NAMESPACE}">{relationships}</Relationships>"#),
        ));

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, xml) in parts {
            zip.start_file(name, options).expect("start zip entry");
            zip.write_all(xml.as_bytes()).expect("write zip entry");
        }
        zip.finish().expect("finish zip").into_inner()
    }
}
