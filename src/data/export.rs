use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Date32Builder, Float64Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Date32Type, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::model::{Table, Value};

/// Write `table` as CSV: a header row, then one record per row.
///
/// Cells use [`Value`]'s display form, so floats keep their fractional
/// part, dates are `YYYY-MM-DD` and nulls are empty. A reload through the
/// loader yields an equal table as long as every text column still holds a
/// non-numeric cell: CSV carries no types, so a text column whose cells all
/// look numeric reloads as numbers, and blank text reloads as null.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    if !table.columns().is_empty() {
        out.write_record(table.columns()).context("writing CSV header")?;
    }
    for (row_no, row) in table.rows().iter().enumerate() {
        out.write_record(row.iter().map(|v| v.to_string()))
            .with_context(|| format!("writing CSV row {row_no}"))?;
    }
    out.flush().context("flushing CSV output")?;
    Ok(())
}

/// Render `table` to an in-memory CSV document.
pub fn to_csv_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_csv(table, &mut buffer)?;
    Ok(buffer)
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Arrow type for a column: the widest kind among its non-null cells.
fn column_type(table: &Table, idx: usize) -> DataType {
    let mut kind = DataType::Null;
    for row in table.rows() {
        kind = match (&kind, &row[idx]) {
            (_, Value::Null) => continue,
            (DataType::Null, Value::Integer(_)) => DataType::Int64,
            (DataType::Null | DataType::Int64, Value::Float(_)) => DataType::Float64,
            (DataType::Null, Value::Date(_)) => DataType::Date32,
            (DataType::Int64, Value::Integer(_))
            | (DataType::Float64, Value::Integer(_) | Value::Float(_))
            | (DataType::Date32, Value::Date(_)) => continue,
            _ => return DataType::Utf8,
        };
    }
    if kind == DataType::Null {
        DataType::Utf8
    } else {
        kind
    }
}

fn build_array(table: &Table, idx: usize, data_type: &DataType) -> ArrayRef {
    let cells = table.rows().iter().map(|row| &row[idx]);
    match data_type {
        DataType::Int64 => {
            let mut builder = Int64Builder::with_capacity(table.len());
            for cell in cells {
                match cell {
                    Value::Integer(i) => builder.append_value(*i),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::with_capacity(table.len());
            for cell in cells {
                builder.append_option(cell.as_f64());
            }
            Arc::new(builder.finish())
        }
        DataType::Date32 => {
            let mut builder = Date32Builder::with_capacity(table.len());
            for cell in cells {
                builder.append_option(cell.as_date().map(Date32Type::from_naive_date));
            }
            Arc::new(builder.finish())
        }
        _ => {
            let mut builder = StringBuilder::new();
            for cell in cells {
                if cell.is_null() {
                    builder.append_null();
                } else {
                    builder.append_value(cell.to_string());
                }
            }
            Arc::new(builder.finish())
        }
    }
}

/// Convert `table` to a single Arrow record batch with nullable columns.
pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let types: Vec<DataType> = (0..table.columns().len())
        .map(|idx| column_type(table, idx))
        .collect();
    let schema = Arc::new(Schema::new(
        table
            .columns()
            .iter()
            .zip(&types)
            .map(|(name, data_type)| Field::new(name, data_type.clone(), true))
            .collect::<Vec<_>>(),
    ));
    let arrays: Vec<ArrayRef> = types
        .iter()
        .enumerate()
        .map(|(idx, data_type)| build_array(table, idx, data_type))
        .collect();
    RecordBatch::try_new(schema, arrays).context("building record batch")
}

/// Write `table` as a Parquet file with one row group.
pub fn write_parquet<W: Write + Send>(table: &Table, writer: W) -> Result<()> {
    let batch = to_record_batch(table)?;
    let mut out =
        ArrowWriter::try_new(writer, batch.schema(), None).context("creating parquet writer")?;
    out.write(&batch).context("writing parquet batch")?;
    out.close().context("closing parquet writer")?;
    Ok(())
}
