use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::config::AppConfig;
use crate::http::controllers::{datasets_controller, health_controller, parse_controller};
use crate::ingest::IngestWorker;
use crate::store::StreamStore;
use crate::table::codec::DataFormat;

pub const PATH_HEALTH: &str = "/health";
pub const PATH_DATASETS: &str = "/datasets";
pub const PATH_DATASET: &str = "/datasets/:id";
pub const PATH_DATASET_EXPORT: &str = "/datasets/:id/export";
pub const PATH_DATASET_STATS: &str = "/datasets/:id/stats";
pub const PATH_DATASET_PLOT: &str = "/datasets/:id/plot";
pub const PATH_PARSE: &str = "/parse";

/// Shared state for the HTTP layer.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: StreamStore,
    pub format: DataFormat,
    pub worker: IngestWorker,
    /// When set, the gateway forwards dataset creation to this worker
    /// endpoint instead of parsing in-process.
    pub worker_endpoint: Option<String>,
    pub client: reqwest::Client,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Self {
        let store = StreamStore::new(&config.storage.root);
        let format = config.storage.format;
        AppState {
            worker: IngestWorker::new(store.clone(), format),
            store,
            format,
            worker_endpoint: config.worker.endpoint.clone(),
            client: reqwest::Client::new(),
        }
    }
}

pub struct AppServer {
    pub router: Router,
    pub state: Arc<AppState>,
}

impl AppServer {
    /// Gateway router: dataset reads and writes, plus health.
    pub fn new(state: AppState) -> Self {
        let state = Arc::new(state);
        AppServer {
            router: Router::new()
                .route(PATH_HEALTH, get(health_controller::health))
                .route(
                    PATH_DATASETS,
                    get(datasets_controller::list_datasets)
                        .post(datasets_controller::create_dataset),
                )
                .route(
                    PATH_DATASET,
                    get(datasets_controller::get_dataset)
                        .delete(datasets_controller::delete_dataset),
                )
                .route(PATH_DATASET_EXPORT, get(datasets_controller::get_export))
                .route(PATH_DATASET_STATS, get(datasets_controller::get_stats))
                .route(PATH_DATASET_PLOT, get(datasets_controller::get_plot))
                .with_state(state.clone()),
            state,
        }
    }

    /// Worker router: the CSV parsing service, plus health.
    pub fn worker(state: AppState) -> Self {
        let state = Arc::new(state);
        AppServer {
            router: Router::new()
                .route(PATH_HEALTH, get(health_controller::health))
                .route(
                    PATH_PARSE,
                    axum::routing::post(parse_controller::parse_dataset),
                )
                .with_state(state.clone()),
            state,
        }
    }
}
