use super::traits::TableFile;
use crate::core::table::{Column, ResultTable, TableError};
use ::parquet::arrow::ArrowWriter;
use ::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use ::parquet::errors::ParquetError;
use arrow::array::{Array, ArrayRef, Float32Array, Float64Array, Int64Array, ListArray};
use arrow::datatypes::{DataType, Field, Float64Type, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableIoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),
    #[error("Column '{0}' is still in ragged engine layout; normalize the table before writing")]
    Unnormalized(String),
    #[error("Column '{name}' has unsupported type {data_type}")]
    UnsupportedType { name: String, data_type: DataType },
    #[error("Refusing to write a table without columns")]
    EmptyTable,
    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

/// Parquet persistence for result tables, one record batch per write.
pub struct ParquetFile;

impl TableFile for ParquetFile {
    type Error = TableIoError;

    fn write_to<W: Write + Send>(table: &ResultTable, writer: W) -> Result<(), Self::Error> {
        let batch = to_record_batch(table)?;
        let mut writer = ArrowWriter::try_new(writer, batch.schema(), None)?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }

    fn read_from(file: File) -> Result<ResultTable, Self::Error> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let schema = builder.schema().clone();
        let mut tables = Vec::new();
        for batch in builder.build()? {
            tables.push(from_record_batch(&batch?)?);
        }
        // Zero-row files carry no batches; keep the column set from the schema.
        if tables.is_empty() {
            tables.push(from_record_batch(&RecordBatch::new_empty(schema))?);
        }
        Ok(ResultTable::concat(tables)?)
    }
}

/// Atomically writes `table` to `path` as Parquet.
pub fn write_table(table: &ResultTable, path: impl AsRef<Path>) -> Result<(), TableIoError> {
    ParquetFile::write_to_path(table, path)
}

/// Loads a Parquet file written by [`write_table`].
pub fn read_table(path: impl AsRef<Path>) -> Result<ResultTable, TableIoError> {
    ParquetFile::read_from_path(path)
}

fn to_record_batch(table: &ResultTable) -> Result<RecordBatch, TableIoError> {
    if table.is_empty() {
        return Err(TableIoError::EmptyTable);
    }

    let mut fields = Vec::with_capacity(table.num_columns());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.num_columns());
    for (name, column) in table.columns() {
        let array: ArrayRef = match column {
            Column::Float64(values) => Arc::new(Float64Array::from(values.clone())),
            Column::Float32(values) => Arc::new(Float32Array::from(values.clone())),
            Column::Int64(values) => Arc::new(Int64Array::from(values.clone())),
            Column::List(rows) => Arc::new(ListArray::from_iter_primitive::<Float64Type, _, _>(
                rows.iter().map(|row| Some(row.iter().copied().map(Some))),
            )),
            Column::Jagged(_) => return Err(TableIoError::Unnormalized(name.to_string())),
        };
        fields.push(Field::new(name, array.data_type().clone(), false));
        arrays.push(array);
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

fn from_record_batch(batch: &RecordBatch) -> Result<ResultTable, TableIoError> {
    let schema = batch.schema();
    let mut table = ResultTable::new();
    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        let column = to_column(field.name(), array)?;
        table.push_column(field.name().as_str(), column)?;
    }
    Ok(table)
}

fn to_column(name: &str, array: &ArrayRef) -> Result<Column, TableIoError> {
    let unsupported = || TableIoError::UnsupportedType {
        name: name.to_string(),
        data_type: array.data_type().clone(),
    };

    let column = match array.data_type() {
        DataType::Float64 => {
            let values = downcast::<Float64Array>(array).ok_or_else(unsupported)?;
            Column::Float64(values.values().to_vec())
        }
        DataType::Float32 => {
            let values = downcast::<Float32Array>(array).ok_or_else(unsupported)?;
            Column::Float32(values.values().to_vec())
        }
        DataType::Int64 => {
            let values = downcast::<Int64Array>(array).ok_or_else(unsupported)?;
            Column::Int64(values.values().to_vec())
        }
        DataType::List(item) if item.data_type() == &DataType::Float64 => {
            let list = downcast::<ListArray>(array).ok_or_else(unsupported)?;
            let mut rows = Vec::with_capacity(list.len());
            for i in 0..list.len() {
                let row = list.value(i);
                let values = downcast::<Float64Array>(&row).ok_or_else(unsupported)?;
                rows.push(values.values().to_vec());
            }
            Column::List(rows)
        }
        _ => return Err(unsupported()),
    };
    Ok(column)
}

fn downcast<T: Array + 'static>(array: &ArrayRef) -> Option<&T> {
    array.as_any().downcast_ref::<T>()
}
