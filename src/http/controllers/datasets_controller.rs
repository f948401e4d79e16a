use crate::dataset::Dataset;
use crate::http::app_server::AppState;
use crate::http::error::ApiError;
use crate::http::models::{
    CreateDatasetParams, CreateDatasetResponse, DatasetSummary, ListDatasetsResponse,
    StatsResponse,
};
use crate::store::Stream;
use axum::{
    body::Bytes,
    extract::{Path, Query as QueryParams, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Header carrying the dataset name on uploads.
const NAME_HEADER: &str = "x-dataset-name";

/// Resolve an id path segment. A malformed id names no possible dataset
/// and maps to 404.
fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    crate::id::parse_dataset_id(id)
        .ok_or_else(|| ApiError::not_found(format!("Dataset '{}' not found", id)))
}

fn open_dataset(state: &AppState, id: Uuid) -> Dataset {
    Dataset::open(state.store.clone(), state.format, id)
}

/// Dataset name for an upload: ?name= query parameter, then the
/// X-Dataset-Name header.
pub(crate) fn upload_name(params: &CreateDatasetParams, headers: &HeaderMap) -> Option<String> {
    params.name.clone().or_else(|| {
        headers
            .get(NAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    })
}

/// Handler for GET /datasets - list all datasets
#[tracing::instrument(
    name = "handler_list_datasets",
    skip(state),
    fields(datadock.dataset_count = tracing::field::Empty)
)]
pub async fn list_datasets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListDatasetsResponse>, ApiError> {
    let entries = state.store.list_ids().map_err(|e| {
        tracing::error!(error = %e, "failed to enumerate datasets");
        ApiError::internal_error("Internal storage error")
    })?;

    let mut datasets = Vec::new();
    for entry in entries {
        let id = match entry {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable store entry");
                continue;
            }
        };
        // One broken entry must not abort the listing.
        match open_dataset(&state, id).info() {
            Ok(info) => datasets.push(DatasetSummary {
                id: info.id.to_string(),
                name: info.name,
                row_count: info.row_count,
            }),
            Err(e) => tracing::warn!(dataset_id = %id, error = %e, "skipping dataset"),
        }
    }

    tracing::Span::current().record("datadock.dataset_count", datasets.len());

    Ok(Json(ListDatasetsResponse { datasets }))
}

/// Handler for POST /datasets - create a dataset from a CSV upload
#[tracing::instrument(
    name = "handler_create_dataset",
    skip(state, params, headers, body),
    fields(
        datadock.dataset_id = tracing::field::Empty,
        datadock.size_bytes = body.len(),
    )
)]
pub async fn create_dataset(
    State(state): State<Arc<AppState>>,
    QueryParams(params): QueryParams<CreateDatasetParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<CreateDatasetResponse>), ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("Upload cannot be empty"));
    }
    let name = upload_name(&params, &headers);

    // A configured worker endpoint owns parsing; otherwise ingest here.
    if let Some(endpoint) = state.worker_endpoint.clone() {
        let response = forward_to_worker(&state, &endpoint, name.as_deref(), body).await?;
        tracing::Span::current().record("datadock.dataset_id", response.id.clone());
        return Ok((StatusCode::CREATED, Json(response)));
    }

    let id = state.worker.ingest(&body, name.as_deref())?;
    tracing::Span::current().record("datadock.dataset_id", id.to_string());

    Ok((
        StatusCode::CREATED,
        Json(CreateDatasetResponse { id: id.to_string() }),
    ))
}

async fn forward_to_worker(
    state: &AppState,
    endpoint: &str,
    name: Option<&str>,
    body: Bytes,
) -> Result<CreateDatasetResponse, ApiError> {
    let url = format!("{}/parse", endpoint.trim_end_matches('/'));
    let mut request = state.client.post(&url).body(body);
    if let Some(name) = name {
        request = request.query(&[("name", name)]);
    }

    let response = request.send().await.map_err(|e| {
        tracing::error!(error = %e, "ingest worker unreachable");
        ApiError::bad_gateway("Ingest worker unreachable")
    })?;

    let status = response.status();
    if status.is_success() {
        response.json::<CreateDatasetResponse>().await.map_err(|e| {
            tracing::error!(error = %e, "invalid response from ingest worker");
            ApiError::bad_gateway("Invalid response from ingest worker")
        })
    } else if status == reqwest::StatusCode::BAD_REQUEST {
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| "Invalid upload".to_string());
        Err(ApiError::bad_request(message))
    } else {
        Err(ApiError::bad_gateway(format!(
            "Ingest worker returned status {}",
            status
        )))
    }
}

/// Handler for GET /datasets/{id} - metadata summary
#[tracing::instrument(name = "handler_get_dataset", skip(state), fields(datadock.dataset_id = %id))]
pub async fn get_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DatasetSummary>, ApiError> {
    let id = parse_id(&id)?;
    let info = open_dataset(&state, id).info()?;
    Ok(Json(DatasetSummary {
        id: info.id.to_string(),
        name: info.name,
        row_count: info.row_count,
    }))
}

/// Handler for DELETE /datasets/{id}
#[tracing::instrument(name = "handler_delete_dataset", skip(state), fields(datadock.dataset_id = %id))]
pub async fn delete_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    open_dataset(&state, id).delete()?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /datasets/{id}/stats - summary statistics
#[tracing::instrument(name = "handler_get_stats", skip(state), fields(datadock.dataset_id = %id))]
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatsResponse>, ApiError> {
    let id = parse_id(&id)?;
    let mut dataset = open_dataset(&state, id);
    // A dataset without METADATA does not exist, whatever else is present.
    dataset.metadata()?;
    let columns = dataset.summary_statistics()?;
    Ok(Json(StatsResponse { columns }))
}

/// Handler for GET /datasets/{id}/export - stored spreadsheet artifact
#[tracing::instrument(name = "handler_get_export", skip(state), fields(datadock.dataset_id = %id))]
pub async fn get_export(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let bytes = open_dataset(&state, id).stream_bytes(Stream::Export)?;
    Ok(([(header::CONTENT_TYPE, XLSX_CONTENT_TYPE)], bytes).into_response())
}

/// Handler for GET /datasets/{id}/plot - stored histogram document
#[tracing::instrument(name = "handler_get_plot", skip(state), fields(datadock.dataset_id = %id))]
pub async fn get_plot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let bytes = open_dataset(&state, id).stream_bytes(Stream::Plot)?;
    Ok(([(header::CONTENT_TYPE, PDF_CONTENT_TYPE)], bytes).into_response())
}
