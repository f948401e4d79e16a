//! Canonical on-disk encoding of the table payload.
//!
//! Parquet is the default: numeric columns become nullable Float64, text
//! columns nullable Utf8, written with Parquet 2.0 and LZ4 compression.
//! A zero-row table produces a valid schema-only file. JSON is available
//! as a configurable alternative encoding.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::{WriterProperties, WriterVersion};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Column, ColumnValues, Table, TableError};

/// Encoding used for the canonical DATA stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    #[default]
    Parquet,
    Json,
}

impl DataFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::Json => "json",
        }
    }
}

/// Errors raised while encoding or decoding the DATA stream.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The stored file carries a column type this codec never writes.
    #[error("unsupported column type '{0}' in stored data")]
    UnsupportedColumnType(String),

    #[error(transparent)]
    MalformedTable(#[from] TableError),
}

/// Serialize a table with the selected encoding.
pub fn encode_table(table: &Table, format: DataFormat) -> Result<Vec<u8>, CodecError> {
    match format {
        DataFormat::Parquet => encode_parquet(table),
        DataFormat::Json => Ok(serde_json::to_vec_pretty(table)?),
    }
}

/// Deserialize a table previously written by [`encode_table`].
pub fn decode_table(data: &[u8], format: DataFormat) -> Result<Table, CodecError> {
    match format {
        DataFormat::Parquet => decode_parquet(data),
        DataFormat::Json => Ok(serde_json::from_slice(data)?),
    }
}

fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_writer_version(WriterVersion::PARQUET_2_0)
        .set_compression(Compression::LZ4)
        .build()
}

fn encode_parquet(table: &Table) -> Result<Vec<u8>, CodecError> {
    let fields: Vec<Field> = table
        .columns()
        .iter()
        .map(|c| match c.values {
            ColumnValues::Numeric(_) => Field::new(&c.name, DataType::Float64, true),
            ColumnValues::Text(_) => Field::new(&c.name, DataType::Utf8, true),
        })
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, schema.clone(), Some(writer_properties()))?;
    // A zero-row table is written as a schema-only file.
    if table.row_count() > 0 {
        let arrays: Vec<ArrayRef> = table
            .columns()
            .iter()
            .map(|c| match &c.values {
                ColumnValues::Numeric(v) => Arc::new(Float64Array::from(v.clone())) as ArrayRef,
                ColumnValues::Text(v) => Arc::new(StringArray::from(v.clone())) as ArrayRef,
            })
            .collect();
        let batch = RecordBatch::try_new(schema, arrays)?;
        writer.write(&batch)?;
    }
    writer.close()?;
    Ok(buf)
}

enum ColumnBuilder {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

fn decode_parquet(data: &[u8]) -> Result<Table, CodecError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(data))?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;

    let mut columns: Vec<(String, ColumnBuilder)> = schema
        .fields()
        .iter()
        .map(|f| match f.data_type() {
            DataType::Float64 => Ok((f.name().clone(), ColumnBuilder::Numeric(Vec::new()))),
            DataType::Utf8 => Ok((f.name().clone(), ColumnBuilder::Text(Vec::new()))),
            other => Err(CodecError::UnsupportedColumnType(other.to_string())),
        })
        .collect::<Result<_, _>>()?;

    for batch in reader {
        let batch = batch?;
        for (i, (name, builder)) in columns.iter_mut().enumerate() {
            let array = batch.column(i);
            match builder {
                ColumnBuilder::Numeric(values) => {
                    let array = array
                        .as_any()
                        .downcast_ref::<Float64Array>()
                        .ok_or_else(|| CodecError::UnsupportedColumnType(name.clone()))?;
                    values.extend(array.iter());
                }
                ColumnBuilder::Text(values) => {
                    let array = array
                        .as_any()
                        .downcast_ref::<StringArray>()
                        .ok_or_else(|| CodecError::UnsupportedColumnType(name.clone()))?;
                    values.extend(array.iter().map(|s| s.map(str::to_string)));
                }
            }
        }
    }

    let columns = columns
        .into_iter()
        .map(|(name, builder)| match builder {
            ColumnBuilder::Numeric(values) => Column::numeric(name, values),
            ColumnBuilder::Text(values) => Column::text(name, values),
        })
        .collect();
    Ok(Table::new(columns)?)
}
