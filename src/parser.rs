//! # Data Parser
//!
//! Session over one or more bound workbooks. Records are extracted from the
//! header-labelled table of a sheet in every source and concatenated; writes,
//! cell updates and row deletions are applied to every source in turn.
//!
//! A session moves through these states:
//!
//! - unbound: only binding and [`DataParser::clear`] are accepted
//! - bound: sources are attached, extraction and writing are possible
//! - extracted: the latest result set can be read and projected
//!
//! Clearing releases every source and the result set.
use crate::binding::filter_set;
use crate::binding::header_set;
use crate::binding::labels;
use crate::binding::project;
use crate::binding::ColumnBinding;
use crate::binding::Record;
use crate::error::RustyTableError;
use crate::helpers::reader::read_all;
use crate::helpers::reader::replace_all;
use crate::helpers::reader::SourceStream;
use crate::spreadsheet::shared_strings::SharedStrings;
use crate::spreadsheet::sheet::Worksheet;
use crate::spreadsheet::styles::Styles;
use crate::spreadsheet::workbook::XlsxDocument;
use crate::table::body::extract_body;
use crate::table::body::extract_body_parallel;
use crate::table::header::locate_header;
use crate::table::writer::update_cells;
use crate::table::writer::write_table;
use crate::table::writer::CellTemplate;
use crate::table::DataTable;
use rayon::prelude::*;
use std::fs::OpenOptions;
use std::io::Cursor;
use std::path::Path;
use std::sync::mpsc;
use thiserror::Error;

/// Errors related to the parser session
#[derive(Error, Debug, PartialEq)]
pub enum ParserError {
    #[error("Source '{0}' not found")]
    SourceNotFound(String),

    #[error("No source is bound, bind a file or stream first")]
    NotBound,

    #[error("Result is not evaluated, extract data first")]
    ResultNotEvaluated,

    #[error("Source '{0}' is bound read-only")]
    ReadOnlyViolation(String),

    #[error("Copy target '{0}' is the source file itself")]
    SameCopyTarget(String),
}

/// Style of rows inserted by [`DataParser::write`]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum RowStyle {
    #[default]
    Plain,
    /// Thin border around every written cell
    Bordered,
}

/// Outcome of the latest extraction for one source.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceSummary {
    pub name: String,
    /// Row of the located header, `None` when no row matches the bound columns
    pub header_row: Option<u32>,
    /// Number of body rows read
    pub rows: usize,
}

struct Source {
    name: String,
    stream: Box<dyn SourceStream>,
    writable: bool,
}

/// Binds spreadsheet tables to records of type `T`.
pub struct DataParser<T: Record> {
    columns: Vec<ColumnBinding<T>>,
    sources: Vec<Source>,
    result: Option<Vec<T>>,
    summaries: Vec<SourceSummary>,
}

impl<T: Record> Default for DataParser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> DataParser<T> {
    pub fn new() -> Self {
        Self {
            columns: T::columns(),
            sources: Vec::new(),
            result: None,
            summaries: Vec::new(),
        }
    }

    /// Binds a file. Writing requires `writable`.
    pub fn bind<P: AsRef<Path>>(&mut self, path: P, writable: bool) -> Result<&mut Self, RustyTableError> {
        let path = path.as_ref();
        if !path.is_file() {
            Err(ParserError::SourceNotFound(path.display().to_string()))?
        }
        let file = OpenOptions::new().read(true).write(writable).open(path)?;
        Ok(self.attach(path.display().to_string(), Box::new(file), writable))
    }

    /// Copies `path` to `copy_path`, overwriting it, and binds the copy.
    pub fn bind_copy<P, Q>(&mut self, path: P, copy_path: Q, writable: bool) -> Result<&mut Self, RustyTableError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let path = path.as_ref();
        if !path.is_file() {
            Err(ParserError::SourceNotFound(path.display().to_string()))?
        }
        let copy_path = copy_path.as_ref();
        if copy_path.exists() && path.canonicalize()? == copy_path.canonicalize()? {
            Err(ParserError::SameCopyTarget(copy_path.display().to_string()))?
        }
        std::fs::copy(path, copy_path)?;
        self.bind(copy_path, writable)
    }

    /// Binds an already open stream under a display name.
    pub fn bind_stream<S: SourceStream + 'static>(&mut self, name: &str, stream: S, writable: bool) -> &mut Self {
        self.attach(name.to_owned(), Box::new(stream), writable)
    }

    /// Binds every file matching a glob pattern, in path order.
    pub fn bind_glob(&mut self, pattern: &str, writable: bool) -> Result<&mut Self, RustyTableError> {
        let mut count = 0usize;
        for entry in glob::glob(pattern)? {
            let path = entry?;
            if path.is_file() {
                self.bind(&path, writable)?;
                count += 1;
            }
        }
        if count == 0 {
            Err(ParserError::SourceNotFound(pattern.to_owned()))?
        }
        Ok(self)
    }

    fn attach(&mut self, name: String, stream: Box<dyn SourceStream>, writable: bool) -> &mut Self {
        log::debug!("bound '{}' ({})", name, if writable { "writable" } else { "read-only" });
        self.sources.push(Source { name, stream, writable });
        self
    }

    pub fn is_bound(&self) -> bool {
        !self.sources.is_empty()
    }

    /// Extracts every record from the selected sheet of every source, in binding order.
    ///
    /// An empty `sheet` selects the last sheet of each workbook.
    pub fn extract(&mut self, sheet: &str) -> Result<&[T], RustyTableError> {
        self.extract_filtered(|_| true, sheet)
    }

    /// Like [`DataParser::extract`], keeping only records accepted by `filter`.
    pub fn extract_filtered<F>(&mut self, filter: F, sheet: &str) -> Result<&[T], RustyTableError>
    where
        F: Fn(&T) -> bool + Sync + Send,
    {
        self.ensure_bound()?;
        self.reset_result();
        let labels = labels(&self.columns);
        let tables = self.sources
            .iter_mut()
            .map(|source| read_source(source, &labels, sheet, false))
            .collect::<Result<Vec<_>, _>>()?;
        self.finish_extraction(tables, filter)
    }

    /// Extracts from all sources concurrently.
    ///
    /// Rows of one source keep their order; sources are concatenated in
    /// completion order. Any failing source fails the whole extraction.
    pub fn extract_parallel(&mut self, sheet: &str) -> Result<&[T], RustyTableError> {
        self.extract_parallel_filtered(|_| true, sheet)
    }

    /// Like [`DataParser::extract_parallel`], keeping only records accepted by `filter`.
    pub fn extract_parallel_filtered<F>(&mut self, filter: F, sheet: &str) -> Result<&[T], RustyTableError>
    where
        F: Fn(&T) -> bool + Sync + Send,
    {
        self.ensure_bound()?;
        self.reset_result();
        let labels = labels(&self.columns);
        let count = self.sources.len();
        let (sender, receiver) = mpsc::channel();
        {
            let labels = &labels;
            let sources = &mut self.sources;
            rayon::scope(move |scope| {
                for source in sources {
                    let sender = sender.clone();
                    scope.spawn(move |_| {
                        sender.send(read_source(source, labels, sheet, true)).ok();
                    });
                }
            });
        }

        let mut tables = Vec::with_capacity(count);
        for outcome in receiver.iter().take(count) {
            tables.push(outcome?);
        }
        self.finish_extraction(tables, filter)
    }

    fn finish_extraction<F>(&mut self, tables: Vec<(SourceSummary, DataTable)>, filter: F) -> Result<&[T], RustyTableError>
    where
        F: Fn(&T) -> bool + Sync + Send,
    {
        let mut rows = DataTable::new();
        for (summary, table) in tables {
            self.summaries.push(summary);
            rows.extend(table);
        }
        let columns = &self.columns;
        let records: Vec<T> = rows
            .par_iter()
            .map(|row| project(columns, row))
            .filter(|record| filter(record))
            .collect();
        log::debug!("{} records extracted from {} sources", records.len(), self.summaries.len());
        Ok(self.result.insert(records).as_slice())
    }

    fn reset_result(&mut self) {
        self.result = None;
        self.summaries.clear();
    }

    /// The latest result set
    pub fn result(&self) -> Result<&[T], RustyTableError> {
        self.ensure_bound()?;
        match &self.result {
            Some(records) => Ok(records),
            None => Err(ParserError::ResultNotEvaluated)?,
        }
    }

    /// Per-source outcome of the latest successful extraction
    pub fn summaries(&self) -> &[SourceSummary] {
        &self.summaries
    }

    /// Maps every record of the latest result set, in order.
    pub fn each<R, F>(&self, callback: F) -> Result<Vec<R>, RustyTableError>
    where
        F: FnMut(&T) -> R,
    {
        Ok(self.result()?.iter().map(callback).collect())
    }

    /// Maps every record of the latest result set on the thread pool; the output keeps record order.
    pub fn each_parallel<R, F>(&self, callback: F) -> Result<Vec<R>, RustyTableError>
    where
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        Ok(self.result()?.par_iter().map(callback).collect())
    }

    /// Inserts `records` directly below the header row of the selected sheet of
    /// every source. Returns the number of rows written over all sources.
    ///
    /// Every source must be writable; otherwise nothing is touched.
    pub fn write(&mut self, records: &[T], style: RowStyle, sheet: &str) -> Result<usize, RustyTableError> {
        self.ensure_writable()?;
        let mut filter_sets = Vec::with_capacity(records.len() + 1);
        filter_sets.push(header_set(&self.columns));
        filter_sets.extend(records.iter().map(|record| filter_set(&self.columns, record)));

        let mut written = 0usize;
        for source in &mut self.sources {
            let rows = edit_source(source, sheet, style == RowStyle::Bordered, |worksheet, strings, styles| {
                write_table(worksheet, strings, styles, &filter_sets)
            })?;
            if rows > 0 {
                log::info!("{}: {} rows written", source.name, rows);
            }
            written += rows;
        }
        Ok(written)
    }

    /// Overwrites individually addressed cells in the selected sheet of every source.
    pub fn update_cells(&mut self, templates: &[CellTemplate], sheet: &str) -> Result<&mut Self, RustyTableError> {
        self.ensure_writable()?;
        for source in &mut self.sources {
            let cells = edit_source(source, sheet, false, |worksheet, strings, _| {
                update_cells(worksheet, strings, templates)
            })?;
            log::info!("{}: {} cells updated", source.name, cells);
        }
        Ok(self)
    }

    /// Deletes a row from the selected sheet of every source; rows below move up.
    pub fn delete_row(&mut self, row: u32, sheet: &str) -> Result<&mut Self, RustyTableError> {
        self.ensure_writable()?;
        for source in &mut self.sources {
            edit_source(source, sheet, false, |worksheet, _, _| {
                let existed = worksheet.remove_row(row)?;
                log::debug!(
                    "row {} {}, {} merge ranges and {} hyperlinks remain",
                    row,
                    if existed { "removed" } else { "was empty" },
                    worksheet.merges().len(),
                    worksheet.hyperlinks().len()
                );
                Ok(1)
            })?;
            log::info!("{}: row {} deleted", source.name, row);
        }
        Ok(self)
    }

    /// Releases every source and the result set.
    pub fn clear(&mut self) -> &mut Self {
        log::debug!("released {} sources", self.sources.len());
        self.sources.clear();
        self.reset_result();
        self
    }

    fn ensure_bound(&self) -> Result<(), RustyTableError> {
        if self.sources.is_empty() {
            Err(ParserError::NotBound)?
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), RustyTableError> {
        self.ensure_bound()?;
        if let Some(source) = self.sources.iter().find(|source| !source.writable) {
            Err(ParserError::ReadOnlyViolation(source.name.to_owned()))?
        }
        Ok(())
    }
}

/// Locates the header and reads the body table of one source.
fn read_source(source: &mut Source, labels: &[&str], sheet: &str, parallel: bool) -> Result<(SourceSummary, DataTable), RustyTableError> {
    read_table(source, labels, sheet, parallel)
        .inspect_err(|error| log::warn!("{}: extraction failed: {}", source.name, error))
}

fn read_table(source: &mut Source, labels: &[&str], sheet: &str, parallel: bool) -> Result<(SourceSummary, DataTable), RustyTableError> {
    let bytes = read_all(source.stream.as_mut())?;
    let document = XlsxDocument::open(&source.name, Cursor::new(bytes))?;
    let (_, worksheet) = document.worksheet(sheet)?;
    let strings = document.shared_strings()?;
    let header = locate_header(worksheet.rows(), &strings, labels)?;
    if header.is_empty() {
        log::warn!("{}: no header row matches the bound columns", source.name);
        let summary = SourceSummary { name: source.name.to_owned(), header_row: None, rows: 0 };
        return Ok((summary, DataTable::new()));
    }

    let table = if parallel {
        extract_body_parallel(&header, worksheet.rows(), &strings)?
    } else {
        extract_body(&header, worksheet.rows(), &strings)?
    };
    log::debug!("{}: header at row {}, {} body rows", source.name, header.row, table.len());
    let summary = SourceSummary {
        name: source.name.to_owned(),
        header_row: Some(header.row),
        rows: table.len(),
    };
    Ok((summary, table))
}

/// Loads the selected worksheet of a source, applies `edit` and saves the
/// package back into the stream when `edit` reports changes.
fn edit_source<F>(source: &mut Source, sheet: &str, with_styles: bool, edit: F) -> Result<usize, RustyTableError>
where
    F: FnOnce(&mut Worksheet, &mut SharedStrings, Option<&mut Styles>) -> Result<usize, RustyTableError>,
{
    let bytes = read_all(source.stream.as_mut())?;
    let mut document = XlsxDocument::open(&source.name, Cursor::new(bytes))?;
    let (path, mut worksheet) = document.worksheet(sheet)?;
    let mut strings = document.shared_strings()?;
    let mut styles = if with_styles { document.styles()? } else { None };
    if with_styles && styles.is_none() {
        log::warn!("{}: workbook has no styles part, rows are written unstyled", source.name);
    }

    let changes = edit(&mut worksheet, &mut strings, styles.as_mut())?;
    if changes == 0 {
        return Ok(0);
    }
    document.store_worksheet(&path, &worksheet)?;
    document.store_shared_strings(&strings)?;
    if let Some(styles) = &styles {
        document.store_styles(styles)?;
    }
    replace_all(source.stream.as_mut(), &document.to_bytes()?)?;
    Ok(changes)
}
