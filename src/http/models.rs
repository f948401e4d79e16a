use serde::{Deserialize, Serialize};

use crate::table::stats::ColumnSummary;

/// Summary of one dataset, used by listings and GET /datasets/{id}
#[derive(Debug, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    pub name: String,
    pub row_count: usize,
}

/// Response body for GET /datasets
#[derive(Debug, Serialize, Deserialize)]
pub struct ListDatasetsResponse {
    pub datasets: Vec<DatasetSummary>,
}

/// Response body for POST /datasets and POST /parse
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateDatasetResponse {
    pub id: String,
}

/// Response body for GET /datasets/{id}/stats: one entry per numeric
/// column, in column order
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub columns: Vec<ColumnSummary>,
}

/// Query parameters accepted by the create and parse endpoints
#[derive(Debug, Deserialize)]
pub struct CreateDatasetParams {
    /// Dataset name; falls back to the X-Dataset-Name header
    pub name: Option<String>,
}
