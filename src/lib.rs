pub mod config;
pub mod dataset;
pub mod derive;
pub mod http;
pub mod id;
pub mod ingest;
pub mod store;
pub mod table;

pub use dataset::{Dataset, DatasetError};
pub use ingest::IngestWorker;
pub use store::{Stream, StreamStore};
pub use table::Table;
