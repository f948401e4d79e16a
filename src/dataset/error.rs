//! Error taxonomy for dataset operations.

use uuid::Uuid;

use crate::store::{StoreError, Stream};
use crate::table::TableError;

/// Errors that can occur during dataset operations.
#[derive(Debug)]
pub enum DatasetError {
    /// Dataset, or one of its required streams, is missing.
    NotFound(Uuid),
    /// Upload bytes could not be parsed into a table.
    InvalidUpload(String),
    /// Malformed table supplied to an import path.
    InvalidTable(TableError),
    /// Storage error (reading, writing or deleting streams).
    Storage(anyhow::Error),
    /// A stored stream exists but cannot be decoded.
    Corrupt {
        stream: Stream,
        source: anyhow::Error,
    },
    /// A derived artifact failed to render.
    Render {
        stream: Stream,
        source: anyhow::Error,
    },
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "Dataset '{}' not found", id),
            Self::InvalidUpload(reason) => write!(f, "Invalid upload: {}", reason),
            Self::InvalidTable(e) => write!(f, "Invalid table: {}", e),
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::Corrupt { stream, source } => {
                write!(f, "Corrupt {} stream: {}", stream, source)
            }
            Self::Render { stream, source } => {
                write!(f, "Failed to render {} stream: {}", stream, source)
            }
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidTable(e) => Some(e),
            Self::Storage(e) | Self::Corrupt { source: e, .. } | Self::Render { source: e, .. } => {
                e.source()
            }
            Self::NotFound(_) | Self::InvalidUpload(_) => None,
        }
    }
}

impl DatasetError {
    /// Returns true if the dataset or a required stream is missing (404).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if the caller supplied bad input (400).
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidUpload(_) | Self::InvalidTable(_))
    }

    /// Returns true for storage-layer failures (500).
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Corrupt { .. } | Self::Render { .. }
        )
    }
}

impl From<StoreError> for DatasetError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { id, .. } => Self::NotFound(id),
            other => Self::Storage(other.into()),
        }
    }
}

impl From<TableError> for DatasetError {
    fn from(e: TableError) -> Self {
        Self::InvalidTable(e)
    }
}
