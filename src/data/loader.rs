use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Date32Type, Float32Type, Float64Type, Int32Type, Int64Type};
use arrow::util::display::array_value_to_string;
use chrono::{NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::QueryError;
use super::model::{DATE_COLUMN, DATE_FORMAT, Row, Table, Value};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the backing file of a data source.
///
/// Any I/O or parse failure is reported as [`QueryError::DataUnavailable`];
/// callers are expected to degrade to an empty table.
pub fn load(source_id: &str, path: &Path) -> std::result::Result<Table, QueryError> {
    match load_file(path) {
        Ok(table) => {
            log::info!(
                "loaded {} rows x {} columns for '{source_id}' from {}",
                table.len(),
                table.columns().len(),
                path.display()
            );
            Ok(table)
        }
        Err(err) => Err(QueryError::DataUnavailable {
            source_id: source_id.to_string(),
            reason: format!("{err:#}"),
        }),
    }
}

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one record per line
/// * `.json`    – `[{ "date": "...", "region": "...", ... }, ...]`
/// * `.parquet` – flat columns (strings, integers, floats, dates)
///
/// Reading never writes to or locks the file.
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// Parse a date cell. Accepts `YYYY-MM-DD` and the two common timestamp
/// spellings, keeping only the calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
                .ok()
                .map(|dt| dt.date())
        })
}

/// Text is parsed; anything other than a date or null is rejected so the
/// column always compares chronologically.
fn coerce_date(value: Value, row: usize) -> Result<Value> {
    match value {
        Value::String(s) => parse_date(&s)
            .map(Value::Date)
            .with_context(|| format!("Row {row}: '{s}' is not a date")),
        Value::Date(_) | Value::Null => Ok(value),
        other => bail!("Row {row}: {other:?} is not a date"),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Inferred type of a CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Text,
    Date,
}

/// CSV layout: header row with column names, one record per row.
///
/// Column types are inferred over the whole column: integer if every
/// non-empty cell parses as `i64`, float if every one parses as `f64`,
/// text otherwise. The `date` column is always parsed as a date. Empty
/// cells are null.
fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let records = reader
        .records()
        .enumerate()
        .map(|(row_no, result)| result.with_context(|| format!("CSV row {row_no}")))
        .collect::<Result<Vec<_>>>()?;

    let kinds: Vec<ColumnKind> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| infer_kind(name, records.iter().map(|r| r.get(idx).unwrap_or(""))))
        .collect();

    let mut table = Table::new(headers.iter().cloned());
    for (row_no, record) in records.iter().enumerate() {
        let row = kinds
            .iter()
            .enumerate()
            .map(|(idx, kind)| {
                parse_cell(*kind, record.get(idx).unwrap_or(""))
                    .with_context(|| format!("CSV row {row_no}, column '{}'", headers[idx]))
            })
            .collect::<Result<Row>>()?;
        table.push_row(row)?;
    }

    Ok(table)
}

fn infer_kind<'a, I>(name: &str, cells: I) -> ColumnKind
where
    I: Iterator<Item = &'a str>,
{
    if name == DATE_COLUMN {
        return ColumnKind::Date;
    }
    let mut all_int = true;
    let mut all_float = true;
    let mut seen = false;
    for cell in cells.map(str::trim).filter(|c| !c.is_empty()) {
        seen = true;
        if all_int && cell.parse::<i64>().is_err() {
            all_int = false;
        }
        if cell.parse::<f64>().is_err() {
            all_float = false;
            break;
        }
    }
    match (seen, all_int, all_float) {
        (false, _, _) => ColumnKind::Text,
        (true, true, _) => ColumnKind::Integer,
        (true, false, true) => ColumnKind::Float,
        _ => ColumnKind::Text,
    }
}

fn parse_cell(kind: ColumnKind, raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    Ok(match kind {
        ColumnKind::Integer => Value::Integer(trimmed.parse().context("not an integer")?),
        ColumnKind::Float => Value::Float(trimmed.parse().context("not a number")?),
        ColumnKind::Text => Value::String(raw.to_string()),
        ColumnKind::Date => Value::Date(
            parse_date(trimmed).with_context(|| format!("'{trimmed}' is not a date"))?,
        ),
    })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "date": "2024-01-01", "region": "East", "revenue": 100 },
///   ...
/// ]
/// ```
///
/// The column set is the union of all record keys, in first-seen order;
/// a key missing from a record is null.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut table = Table::new(columns.iter().cloned());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        let row = columns
            .iter()
            .map(|col| {
                let value = obj.get(col).map(json_to_value).unwrap_or(Value::Null);
                if col == DATE_COLUMN {
                    coerce_date(value, i)
                } else {
                    Ok(value)
                }
            })
            .collect::<Result<Row>>()?;
        table.push_row(row)?;
    }

    Ok(table)
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::String(b.to_string()),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat columns.
///
/// Utf8, Int32/Int64, Float32/Float64 and Date32 map onto the matching
/// [`Value`] variants; any other type is rendered to a string. A string
/// `date` column is parsed like the CSV loader does.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let date_idx = columns.iter().position(|c| c == DATE_COLUMN);
    let reader = builder.build().context("building parquet reader")?;

    let mut table = Table::new(columns.iter().cloned());
    let mut row_offset = 0;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let mut values = Row::with_capacity(columns.len());
            for (col_idx, col_array) in batch.columns().iter().enumerate() {
                let value = extract_value(col_array, row);
                if Some(col_idx) == date_idx {
                    values.push(coerce_date(value, row_offset + row)?);
                } else {
                    values.push(value);
                }
            }
            table.push_row(values)?;
        }
        row_offset += batch.num_rows();
    }

    Ok(table)
}

/// Extract a single value from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    match col.data_type() {
        DataType::Utf8 => Value::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => Value::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => Value::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => Value::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Value::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Date32 => col.as_primitive::<Date32Type>().value_as_date(row).into(),
        _ => array_value_to_string(col, row)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use arrow::array::{Date32Array, Float64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn ymd(y: i32, m: u32, d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn csv_infers_column_types() {
        let file = write_temp(
            ".csv",
            "date,region,revenue,score,year\n\
             2024-01-01,East,100,1.5,2024\n\
             2024-02-01,West,200,,2024\n",
        );
        let table = load_file(file.path()).unwrap();

        assert_eq!(table.columns(), ["date", "region", "revenue", "score", "year"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "date"), Some(&ymd(2024, 1, 1)));
        assert!(matches!(table.value(0, "revenue"), Some(Value::Integer(100))));
        assert!(matches!(table.value(0, "score"), Some(Value::Float(_))));
        assert!(table.value(1, "score").unwrap().is_null());
        assert_eq!(table.value(1, "region"), Some(&Value::from("West")));
    }

    #[test]
    fn csv_mixed_numeric_column_becomes_float() {
        let file = write_temp(".csv", "x\n1\n2.5\n");
        let table = load_file(file.path()).unwrap();
        assert!(matches!(table.value(0, "x"), Some(Value::Float(_))));
    }

    #[test]
    fn csv_accepts_timestamp_dates() {
        let file = write_temp(".csv", "date,v\n2024-03-05 00:00:00,1\n");
        let table = load_file(file.path()).unwrap();
        assert_eq!(table.value(0, "date"), Some(&ymd(2024, 3, 5)));
    }

    #[test]
    fn csv_bad_date_is_unavailable() {
        let file = write_temp(".csv", "date,v\nnot-a-date,1\n");
        let err = load("sales", file.path()).unwrap_err();
        assert!(matches!(err, QueryError::DataUnavailable { .. }));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load("sales", &dir.path().join("nope.csv")).unwrap_err();
        match err {
            QueryError::DataUnavailable { source_id, .. } => assert_eq!(source_id, "sales"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let file = write_temp(".xlsx", "");
        assert!(load_file(file.path()).is_err());
    }

    #[test]
    fn json_records_union_columns() {
        let file = write_temp(
            ".json",
            r#"[{"date":"2024-01-01","region":"East","revenue":100},
                {"date":"2024-02-01","revenue":2.5}]"#,
        );
        let table = load_file(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.has_column("region"));
        assert!(table.value(1, "region").unwrap().is_null());
        assert_eq!(table.value(1, "date"), Some(&ymd(2024, 2, 1)));
        assert_eq!(table.value(1, "revenue"), Some(&Value::Float(2.5)));
    }

    #[test]
    fn json_numeric_date_is_unavailable() {
        let file = write_temp(".json", r#"[{"date":20240101,"revenue":1}]"#);
        let err = load("business", file.path()).unwrap_err();
        assert!(matches!(err, QueryError::DataUnavailable { .. }));
    }

    #[test]
    fn parquet_flat_columns() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("date", DataType::Date32, false),
            Field::new("region", DataType::Utf8, true),
            Field::new("revenue", DataType::Float64, true),
        ]));
        let days = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .signed_duration_since(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
            .num_days() as i32;
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Date32Array::from(vec![days, days + 31])),
                Arc::new(StringArray::from(vec![Some("East"), None])),
                Arc::new(Float64Array::from(vec![100.0, 200.0])),
            ],
        )
        .unwrap();

        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer = ArrowWriter::try_new(file.reopen().unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_file(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "date"), Some(&ymd(2024, 1, 1)));
        assert_eq!(table.value(1, "date"), Some(&ymd(2024, 2, 1)));
        assert!(table.value(1, "region").unwrap().is_null());
        assert_eq!(table.value(1, "revenue"), Some(&Value::Float(200.0)));
    }
}
