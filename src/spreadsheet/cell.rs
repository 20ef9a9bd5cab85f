use crate::spreadsheet::reference::build_reference;

/// Types of cell data in SpreadsheetML worksheets, taken from the `t` attribute.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    /// Numeric values (no `t` attribute)
    #[default]
    Number,
    /// Boolean values (`t="b"`)
    Boolean,
    /// ISO 8601 date/time strings (`t="d"`)
    IsoDateTime,
    /// Inline string values (`t="inlineStr"`)
    InlineString,
    /// Formula string results (`t="str"`)
    FormulaString,
    /// Shared string table references (`t="s"`)
    SharedString,
    /// Error values (`t="e"`)
    Error,
}

impl CellType {
    /// Parses the `t` attribute of a cell.
    pub(crate) fn parse(kind: Option<&str>) -> Self {
        match kind {
            Some("b") => Self::Boolean,
            Some("d") => Self::IsoDateTime,
            Some("inlineStr") => Self::InlineString,
            Some("str") => Self::FormulaString,
            Some("s") => Self::SharedString,
            Some("e") => Self::Error,
            _ => Self::Number,
        }
    }

    /// Value of the `t` attribute, `None` for numbers.
    pub(crate) const fn as_attribute(&self) -> Option<&'static str> {
        match self {
            Self::Number => None,
            Self::Boolean => Some("b"),
            Self::IsoDateTime => Some("d"),
            Self::InlineString => Some("inlineStr"),
            Self::FormulaString => Some("str"),
            Self::SharedString => Some("s"),
            Self::Error => Some("e"),
        }
    }
}

/// A single worksheet cell.
///
/// `value` is the raw value: the `<v>` text, or the `<is>` text for inline strings.
/// For shared strings it is the pool index. `inner` keeps the original child XML of
/// cells read from a file so they survive a rewrite untouched; it is `None` for cells
/// built or edited in memory.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row number (1-based)
    pub(crate) row: u32,
    /// Column number (1-based)
    pub(crate) col: u32,
    /// Cell data type
    pub(crate) kind: CellType,
    /// Raw cell value
    pub(crate) value: String,
    /// Attributes other than `r` and `t`
    pub(crate) attributes: Vec<(String, String)>,
    /// Original child XML
    pub(crate) inner: Option<String>,
}

impl Cell {
    /// Creates an in-memory cell.
    pub(crate) fn new(row: u32, col: u32, kind: CellType, value: String) -> Self {
        Self {
            row,
            col,
            kind,
            value,
            attributes: Vec::new(),
            inner: None,
        }
    }

    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        build_reference(self.col, self.row)
    }

    /// Sets the `s` (style) attribute.
    pub(crate) fn set_style(&mut self, style: u32) {
        let style = style.to_string();
        match self.attributes.iter_mut().find(|(key, _)| key == "s") {
            Some(attribute) => attribute.1 = style,
            None => self.attributes.push(("s".to_owned(), style)),
        }
    }

    /// Replaces the value, dropping the original child XML.
    pub(crate) fn set_value(&mut self, kind: CellType, value: String) {
        self.kind = kind;
        self.value = value;
        self.inner = None;
    }
}
