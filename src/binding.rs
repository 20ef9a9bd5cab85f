//! Static column bindings between header labels and record fields.
//!
//! Every field of a record is text. A record type lists its columns once,
//! usually through [`data_columns!`](crate::data_columns), and the parser
//! uses that table both to recognise the header row and to move values
//! between cells and fields.
use crate::table::DataRow;
use crate::table::FilterSet;
use crate::table::FilterValue;
use std::fmt;

/// A record type that can be read from and written to a spreadsheet table.
pub trait Record: Default + Send + Sync + 'static {
    /// The column bindings of the record, in declaration order
    fn columns() -> Vec<ColumnBinding<Self>>;
}

/// Pairs a column label with the accessors of one text field.
pub struct ColumnBinding<T> {
    /// Header text of the column
    pub label: &'static str,
    /// Name of the bound field
    pub field: &'static str,
    pub get: fn(&T) -> String,
    pub set: fn(&mut T, String),
}

impl<T> Clone for ColumnBinding<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ColumnBinding<T> {}

impl<T> fmt::Debug for ColumnBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnBinding")
            .field("label", &self.label)
            .field("field", &self.field)
            .finish()
    }
}

/// Implements [`Record`] for a struct of `String` fields.
///
/// ```
/// #[derive(Default)]
/// struct Order {
///     region: String,
///     units: String,
/// }
///
/// rusty_table::data_columns!(Order {
///     "Region" => region,
///     "Units" => units,
/// });
/// ```
#[macro_export]
macro_rules! data_columns {
    ($record:ty { $($label:literal => $field:ident),* $(,)? }) => {
        impl $crate::Record for $record {
            fn columns() -> Vec<$crate::ColumnBinding<Self>> {
                vec![$(
                    $crate::ColumnBinding {
                        label: $label,
                        field: stringify!($field),
                        get: |record: &$record| record.$field.clone(),
                        set: |record: &mut $record, value: String| record.$field = value,
                    }
                ),*]
            }
        }
    };
}

/// Header labels in binding order
pub(crate) fn labels<T>(columns: &[ColumnBinding<T>]) -> Vec<&'static str> {
    columns.iter().map(|column| column.label).collect()
}

/// Builds a record from a body row
pub(crate) fn project<T: Record>(columns: &[ColumnBinding<T>], row: &DataRow) -> T {
    let mut record = T::default();
    for cell in &row.cells {
        if let Some(column) = columns.get(cell.binding) {
            (column.set)(&mut record, cell.value.clone());
        }
    }
    record
}

/// The header filter set: every label paired with itself
pub(crate) fn header_set<T>(columns: &[ColumnBinding<T>]) -> FilterSet {
    FilterSet {
        values: columns
            .iter()
            .map(|column| FilterValue { label: column.label, text: column.label.to_owned() })
            .collect(),
    }
}

/// The filter set of one record
pub(crate) fn filter_set<T>(columns: &[ColumnBinding<T>], record: &T) -> FilterSet {
    FilterSet {
        values: columns
            .iter()
            .map(|column| FilterValue { label: column.label, text: (column.get)(record) })
            .collect(),
    }
}
