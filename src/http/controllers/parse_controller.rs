use crate::http::app_server::AppState;
use crate::http::controllers::datasets_controller::upload_name;
use crate::http::error::ApiError;
use crate::http::models::{CreateDatasetParams, CreateDatasetResponse};
use axum::{
    body::Bytes,
    extract::{Query as QueryParams, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

/// Handler for POST /parse - parse a CSV upload into a new dataset
#[tracing::instrument(
    name = "handler_parse_dataset",
    skip(state, params, headers, body),
    fields(
        datadock.dataset_id = tracing::field::Empty,
        datadock.size_bytes = body.len(),
    )
)]
pub async fn parse_dataset(
    State(state): State<Arc<AppState>>,
    QueryParams(params): QueryParams<CreateDatasetParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<CreateDatasetResponse>), ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("Upload cannot be empty"));
    }
    let name = upload_name(&params, &headers);

    let id = state.worker.ingest(&body, name.as_deref())?;
    tracing::Span::current().record("datadock.dataset_id", id.to_string());

    Ok((
        StatusCode::CREATED,
        Json(CreateDatasetResponse { id: id.to_string() }),
    ))
}
