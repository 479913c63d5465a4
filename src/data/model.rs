use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use super::error::{QueryError, Result};

/// Name of the column the loader coerces to [`Value::Date`].
pub const DATE_COLUMN: &str = "date";

/// Canonical rendering of dates on output.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the dtypes a CSV column can take.
///
/// Integers and floats form a single numeric class: `Integer(1)` equals
/// `Float(1.0)`, so grouping keys and filters match on numeric value.
/// Ordering across classes is `Null < numeric < String < Date`.
#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so Value can key a BTreeMap --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        fn class(v: &Value) -> u8 {
            match v {
                Null => 0,
                Integer(_) | Float(_) => 1,
                String(_) => 2,
                Date(_) => 3,
            }
        }
        let ca = class(self);
        let cb = class(other);
        if ca != cb {
            return ca.cmp(&cb);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Integer(a), Float(b)) => cmp_int_float(*a, *b),
            (Float(a), Integer(b)) => cmp_int_float(*b, *a).reverse(),
            (Float(a), Float(b)) => a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b)),
            _ => Ordering::Equal,
        }
    }
}

/// Exact comparison of an integer with a float. Integers above 2^53 are
/// never rounded through `f64`.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    // 2^63, the first float above i64::MAX.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() {
        return (i as f64).total_cmp(&f);
    }
    if f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    i.cmp(&(whole as i64)).then_with(|| {
        let frac = f - whole;
        if frac > 0.0 {
            Ordering::Less
        } else if frac < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

/// Text rendering used for CSV export and for matching query-string values.
///
/// Floats keep a fractional part (`100.0`) so that a reload infers the
/// same type; nulls render as the empty string.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Null => Ok(()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(v) if v.is_finite() => serializer.serialize_f64(*v),
            Value::Float(_) | Value::Null => serializer.serialize_none(),
            Value::Date(d) => serializer.collect_str(&d.format(DATE_FORMAT)),
        }
    }
}

impl Value {
    /// Numeric view of the value; `None` for non-numeric cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Exact-match predicate used by filters.
    ///
    /// A null cell never matches. A textual `expected` value (as parsed from
    /// a query string) also matches a non-string cell whose canonical
    /// rendering is identical, so `year=2024` matches `Integer(2024)`.
    pub fn matches(&self, expected: &Value) -> bool {
        if self.is_null() {
            return false;
        }
        if self == expected {
            return true;
        }
        match (self, expected) {
            (Value::String(_), _) => false,
            (cell, Value::String(text)) => cell.to_string() == *text,
            _ => false,
        }
    }

    /// Round to `places` decimal digits. Non-numeric values pass through;
    /// non-finite floats become null.
    pub fn rounded(&self, places: i32) -> Value {
        match self {
            Value::Float(v) if v.is_finite() => Value::Float(round_to(*v, places)),
            Value::Float(_) => Value::Null,
            other => other.clone(),
        }
    }
}

/// Round half away from zero to `places` decimal digits.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Table – rows sharing one column schema
// ---------------------------------------------------------------------------

/// One row, positionally aligned with [`Table::columns`].
pub type Row = Vec<Value>;

/// An ordered sequence of rows sharing one column schema.
///
/// Query operations never mutate a table; each returns a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// An empty table with the given columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Table {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table, checking every row's arity.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Row>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Table::new(columns);
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Append a row. Fails if it does not carry one value per column.
    pub fn push_row(&mut self, row: Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(QueryError::ArityMismatch {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Like [`Table::column_index`] but reports a [`QueryError::MissingColumn`].
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| QueryError::MissingColumn(name.to_string()))
    }

    /// Cell at (`row`, `column`), `None` if either is out of range.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// All cells of one column in row order.
    pub fn column_values<'a>(
        &'a self,
        name: &str,
    ) -> Option<impl Iterator<Item = &'a Value> + 'a> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    /// Sorted set of distinct non-null values in a column (empty if absent).
    pub fn distinct_values(&self, name: &str) -> BTreeSet<Value> {
        self.column_values(name)
            .map(|values| values.filter(|v| !v.is_null()).cloned().collect())
            .unwrap_or_default()
    }

    pub fn row(&self, idx: usize) -> Option<RowRef<'_>> {
        self.rows.get(idx).map(|values| RowRef { table: self, values })
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(move |values| RowRef { table: self, values })
    }

    /// New table holding the rows at `indices`, in the order given.
    pub fn take_rows<I: IntoIterator<Item = usize>>(&self, indices: I) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices
                .into_iter()
                .filter_map(|i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// New table with a column computed per row. An existing column of the
    /// same name is replaced in place; otherwise the column is appended.
    pub fn with_column<F>(&self, name: &str, f: F) -> Table
    where
        F: FnMut(RowRef<'_>) -> Value,
    {
        let computed: Vec<Value> = self.iter_rows().map(f).collect();
        let mut out = self.clone();
        match out.column_index(name) {
            Some(idx) => {
                for (row, value) in out.rows.iter_mut().zip(computed) {
                    row[idx] = value;
                }
            }
            None => {
                out.columns.push(name.to_string());
                for (row, value) in out.rows.iter_mut().zip(computed) {
                    row.push(value);
                }
            }
        }
        out
    }
}

/// Serializes as `[{col: value, ...}, ...]` with keys in column order.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in self.iter_rows() {
            seq.serialize_element(&row)?;
        }
        seq.end()
    }
}

// ---------------------------------------------------------------------------
// RowRef – borrowed view of one row with name lookup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    table: &'a Table,
    values: &'a [Value],
}

impl<'a> RowRef<'a> {
    /// Cell by column name; `None` if the table has no such column.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.table.column_index(column).map(|i| &self.values[i])
    }

    /// Cell by column name, treating an absent column as null.
    pub fn get_or_null(&self, column: &str) -> &'a Value {
        static NULL: Value = Value::Null;
        self.get(column).unwrap_or(&NULL)
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }
}

impl Serialize for RowRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.table.columns.iter().zip(self.values) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
