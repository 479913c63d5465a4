use std::collections::{BTreeMap, BTreeSet};

use super::error::QueryError;
use super::model::{Row, Table, Value};

// ---------------------------------------------------------------------------
// Reducer – collapses one column of a partition into a scalar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Sum,
    Mean,
    /// Sample standard deviation (n - 1 denominator).
    Std,
    Min,
    Max,
    /// Last non-null value in row order.
    Last,
    /// Number of non-null values.
    Count,
    CountDistinct,
}

impl Reducer {
    /// Suffix used when one column is reduced several ways (`revenue_sum`).
    pub fn suffix(&self) -> &'static str {
        match self {
            Reducer::Sum => "sum",
            Reducer::Mean => "mean",
            Reducer::Std => "std",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::Last => "last",
            Reducer::Count => "count",
            Reducer::CountDistinct => "nunique",
        }
    }

    /// Reduce a sequence of cells.
    ///
    /// Nulls are skipped, and so are non-numeric cells for the numeric
    /// reducers. With nothing left to reduce the result is null, except for
    /// the two counting reducers which yield 0.
    pub fn reduce<'a, I>(&self, values: I) -> Value
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let present = values.into_iter().filter(|v| !v.is_null());
        match self {
            Reducer::Sum => sum(present),
            Reducer::Mean => {
                let (n, total) = present
                    .filter_map(Value::as_f64)
                    .fold((0usize, 0.0f64), |(n, t), v| (n + 1, t + v));
                if n == 0 {
                    Value::Null
                } else {
                    Value::Float(total / n as f64)
                }
            }
            Reducer::Std => std_dev(present.filter_map(Value::as_f64)),
            Reducer::Min => present.min().cloned().unwrap_or(Value::Null),
            Reducer::Max => present.max().cloned().unwrap_or(Value::Null),
            Reducer::Last => present.last().cloned().unwrap_or(Value::Null),
            Reducer::Count => Value::Integer(present.count() as i64),
            Reducer::CountDistinct => {
                Value::Integer(present.collect::<BTreeSet<_>>().len() as i64)
            }
        }
    }
}

/// Integer sum while every input is an integer and nothing overflows,
/// float sum otherwise.
fn sum<'a>(values: impl Iterator<Item = &'a Value>) -> Value {
    let mut int_total: Option<i64> = Some(0);
    let mut float_total = 0.0f64;
    let mut seen = false;
    for value in values {
        match value {
            Value::Integer(i) => {
                int_total = int_total.and_then(|t| t.checked_add(*i));
                float_total += *i as f64;
                seen = true;
            }
            Value::Float(f) => {
                int_total = None;
                float_total += f;
                seen = true;
            }
            _ => {}
        }
    }
    match (seen, int_total) {
        (false, _) => Value::Null,
        (true, Some(total)) => Value::Integer(total),
        (true, None) => Value::Float(float_total),
    }
}

/// Welford's online variance, finalized as a sample standard deviation.
fn std_dev(values: impl Iterator<Item = f64>) -> Value {
    let mut count = 0u64;
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for x in values {
        count += 1;
        let delta = x - mean;
        mean += delta / count as f64;
        m2 += delta * (x - mean);
    }
    if count < 2 {
        return Value::Null;
    }
    Value::Float((m2 / (count - 1) as f64).sqrt())
}

// ---------------------------------------------------------------------------
// AggregationSpec – grouping key + per-column reducers
// ---------------------------------------------------------------------------

/// One output column: `reducer(source column)` stored under `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub column: String,
    pub reducer: Reducer,
    pub output: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationSpec {
    pub group_by: Vec<String>,
    pub aggregations: Vec<Aggregation>,
}

impl AggregationSpec {
    /// Group by the given key columns (none = one summary row).
    pub fn by<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AggregationSpec {
            group_by: keys.into_iter().map(Into::into).collect(),
            aggregations: Vec::new(),
        }
    }

    /// Reduce `column`, keeping the column's own name for the output.
    pub fn agg(self, column: &str, reducer: Reducer) -> Self {
        self.agg_as(column, reducer, column)
    }

    pub fn agg_as(mut self, column: &str, reducer: Reducer, output: &str) -> Self {
        self.aggregations.push(Aggregation {
            column: column.to_string(),
            reducer,
            output: output.to_string(),
        });
        self
    }

    /// Reduce `column` several ways, naming outputs `{column}_{suffix}`.
    pub fn agg_each(mut self, column: &str, reducers: &[Reducer]) -> Self {
        for reducer in reducers {
            let output = format!("{column}_{}", reducer.suffix());
            self = self.agg_as(column, *reducer, &output);
        }
        self
    }
}

/// Partition rows by the grouping key and reduce each aggregation's column.
///
/// Output: one row per distinct key, sorted ascending, key columns first.
/// Aggregations over a column the table lacks are left out of the output.
/// A grouping column the table lacks yields an empty table.
pub fn group_and_aggregate(table: &Table, spec: &AggregationSpec) -> Table {
    let mut active: Vec<(usize, &Aggregation)> = Vec::with_capacity(spec.aggregations.len());
    for agg in &spec.aggregations {
        match table.require_column(&agg.column) {
            Ok(idx) => active.push((idx, agg)),
            Err(err) => log::debug!("omitting aggregation '{}': {err}", agg.output),
        }
    }

    let columns: Vec<String> = spec
        .group_by
        .iter()
        .cloned()
        .chain(active.iter().map(|(_, agg)| agg.output.clone()))
        .collect();

    let key_idx = match spec
        .group_by
        .iter()
        .map(|k| table.require_column(k))
        .collect::<Result<Vec<_>, QueryError>>()
    {
        Ok(idx) => idx,
        Err(err) => {
            log::debug!("cannot group: {err}");
            return Table::new(columns);
        }
    };

    let mut partitions: BTreeMap<Vec<Value>, Vec<usize>> = BTreeMap::new();
    for (row_idx, row) in table.rows().iter().enumerate() {
        let key: Vec<Value> = key_idx.iter().map(|&i| row[i].clone()).collect();
        partitions.entry(key).or_default().push(row_idx);
    }

    let rows: Vec<Row> = partitions
        .into_iter()
        .map(|(key, members)| {
            let mut row = key;
            for (col, agg) in &active {
                let cells = members.iter().map(|&i| &table.rows()[i][*col]);
                row.push(agg.reducer.reduce(cells));
            }
            row
        })
        .collect();

    let mut out = Table::new(columns);
    for row in rows {
        // Arity holds by construction: keys + active aggregations.
        if let Err(err) = out.push_row(row) {
            log::warn!("dropping malformed group row: {err}");
        }
    }
    out
}

/// Two-level group-by producing one row per (`row_key`, `col_key`) pair
/// with the reduced `value_column` – the long format a heatmap consumes.
///
/// Empty input, or any of the three columns missing, yields an empty table.
pub fn cross_tabulate(
    table: &Table,
    row_key: &str,
    col_key: &str,
    value_column: &str,
    reducer: Reducer,
) -> Table {
    let columns = [row_key, col_key, value_column];
    if let Some(missing) = columns.iter().find(|c| !table.has_column(c)) {
        log::debug!("cross_tabulate: {}", QueryError::MissingColumn(missing.to_string()));
        return Table::new(columns);
    }
    let spec = AggregationSpec::by([row_key, col_key]).agg(value_column, reducer);
    group_and_aggregate(table, &spec)
}

/// Reduce a whole column to a scalar; `None` if the table lacks the column.
pub fn reduce_column(table: &Table, column: &str, reducer: Reducer) -> Option<Value> {
    table
        .column_values(column)
        .map(|values| reducer.reduce(values))
}
