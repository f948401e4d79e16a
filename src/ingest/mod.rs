//! CSV ingestion: raw upload bytes to a persisted dataset.

use uuid::Uuid;

use crate::dataset::{Dataset, DatasetError};
use crate::store::StreamStore;
use crate::table::codec::DataFormat;
use crate::table::{Column, Table};

/// Parse CSV bytes into a table.
///
/// The header row defines the column names. Types are inferred per column:
/// numeric when every non-empty cell parses as a number, text otherwise.
/// Empty cells are nulls. Ragged rows are rejected.
pub fn parse_csv(raw: &[u8]) -> Result<Table, DatasetError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(raw);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DatasetError::InvalidUpload(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(DatasetError::InvalidUpload("missing header row".to_string()));
    }

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        // The csv reader rejects ragged rows with an UnequalLengths error.
        let record = record.map_err(|e| DatasetError::InvalidUpload(e.to_string()))?;
        for (i, field) in record.iter().enumerate() {
            cells[i].push(if field.is_empty() {
                None
            } else {
                Some(field.to_string())
            });
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| infer_column(name, values))
        .collect();
    Ok(Table::new(columns)?)
}

/// Numeric iff every non-null cell parses as a number.
fn infer_column(name: String, values: Vec<Option<String>>) -> Column {
    let numeric: Option<Vec<Option<f64>>> = values
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(s) => s.trim().parse::<f64>().ok().map(Some),
        })
        .collect();
    match numeric {
        Some(parsed) => Column::numeric(name, parsed),
        None => Column::text(name, values),
    }
}

/// Constructs and persists datasets from uploaded CSV bytes.
#[derive(Debug, Clone)]
pub struct IngestWorker {
    store: StreamStore,
    format: DataFormat,
}

impl IngestWorker {
    pub fn new(store: StreamStore, format: DataFormat) -> Self {
        IngestWorker { store, format }
    }

    /// Parse an upload and persist it as a new dataset, returning the
    /// generated id. The declared name (typically the upload's filename)
    /// becomes the dataset name.
    pub fn ingest(&self, raw: &[u8], name: Option<&str>) -> Result<Uuid, DatasetError> {
        let table = parse_csv(raw)?;
        let rows = table.row_count();
        let dataset = Dataset::create(self.store.clone(), self.format, table, name)?;
        tracing::info!(dataset_id = %dataset.id(), rows, "ingested dataset");
        Ok(dataset.id())
    }
}
