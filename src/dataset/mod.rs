//! The dataset aggregate: lazily loaded fields with write-through saves.
//!
//! A [`Dataset`] is either created fresh from a table (which immediately
//! persists all four streams) or opened as a lazy reference by id, whose
//! fields populate from storage on first access. Mutations flush before
//! returning: replacing the table rewrites DATA and then regenerates
//! EXPORT and PLOT from it; metadata edits rewrite METADATA alone.

pub mod error;

pub use error::DatasetError;

use std::collections::BTreeMap;
use std::io::{Read as _, Write as _};

use uuid::Uuid;

use crate::derive;
use crate::id;
use crate::store::{Stream, StreamStore};
use crate::table::codec::{decode_table, encode_table, DataFormat};
use crate::table::stats::{self, ColumnSummary};
use crate::table::Table;

/// Dataset metadata: an ordered string-to-string mapping. Always carries
/// at least [`META_ID`] and [`META_NAME`]; further keys are free-form.
pub type Metadata = BTreeMap<String, String>;

/// Metadata key holding the dataset id.
pub const META_ID: &str = "id";
/// Metadata key holding the dataset name.
pub const META_NAME: &str = "name";
/// Name reported when none was ever assigned.
pub const DEFAULT_NAME: &str = "Unnamed";

/// Lazy field state. A field is unloaded until first access and loaded
/// afterwards; mutations flush to storage before the mutating call
/// returns, so a loaded field is never left dirty.
#[derive(Debug)]
enum Slot<T> {
    Unloaded,
    Loaded(T),
}

impl<T> Slot<T> {
    fn get(&self) -> Option<&T> {
        match self {
            Slot::Loaded(value) => Some(value),
            Slot::Unloaded => None,
        }
    }

    fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Slot::Loaded(value) => Some(value),
            Slot::Unloaded => None,
        }
    }

    fn is_loaded(&self) -> bool {
        matches!(self, Slot::Loaded(_))
    }
}

/// Summary of one dataset: the metadata identity plus the row count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    pub id: Uuid,
    pub name: String,
    pub row_count: usize,
}

/// One dataset: id, lazily populated metadata and table, and the
/// orchestration of save/load/sync against the stream store.
///
/// Every handle is independently lazy; no state is shared between two
/// handles opened on the same id.
#[derive(Debug)]
pub struct Dataset {
    id: Uuid,
    store: StreamStore,
    format: DataFormat,
    metadata: Slot<Metadata>,
    table: Slot<Table>,
}

impl Dataset {
    /// Create a fresh dataset from a table, persisting all four streams
    /// before returning.
    pub fn create(
        store: StreamStore,
        format: DataFormat,
        table: Table,
        name: Option<&str>,
    ) -> Result<Self, DatasetError> {
        let id = id::generate_dataset_id();
        let mut metadata = Metadata::new();
        metadata.insert(META_ID.to_string(), id.to_string());
        metadata.insert(
            META_NAME.to_string(),
            name.unwrap_or(DEFAULT_NAME).to_string(),
        );

        let mut dataset = Dataset {
            id,
            store,
            format,
            metadata: Slot::Loaded(metadata),
            table: Slot::Loaded(table),
        };
        dataset.save(&[])?;
        tracing::debug!(dataset_id = %dataset.id, "created dataset");
        Ok(dataset)
    }

    /// Open a lazy reference by id. Touches no storage until a field is
    /// accessed.
    pub fn open(store: StreamStore, format: DataFormat, id: Uuid) -> Self {
        Dataset {
            id,
            store,
            format,
            metadata: Slot::Unloaded,
            table: Slot::Unloaded,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The metadata mapping, read through from METADATA on first access.
    pub fn metadata(&mut self) -> Result<&Metadata, DatasetError> {
        self.ensure_metadata()?;
        match self.metadata.get() {
            Some(metadata) => Ok(metadata),
            None => Err(DatasetError::NotFound(self.id)),
        }
    }

    /// The table payload, read through from DATA on first access.
    pub fn table(&mut self) -> Result<&Table, DatasetError> {
        self.ensure_table()?;
        match self.table.get() {
            Some(table) => Ok(table),
            None => Err(DatasetError::NotFound(self.id)),
        }
    }

    /// The dataset name, defaulting to "Unnamed".
    pub fn name(&mut self) -> Result<String, DatasetError> {
        Ok(self
            .metadata()?
            .get(META_NAME)
            .cloned()
            .unwrap_or_else(|| DEFAULT_NAME.to_string()))
    }

    /// Rename the dataset, flushing METADATA.
    pub fn set_name(&mut self, name: &str) -> Result<(), DatasetError> {
        self.set_metadata_field(META_NAME, name)
    }

    /// Mutate one metadata field and flush METADATA, as a single visible
    /// step. Only METADATA is rewritten; the table streams are untouched.
    pub fn set_metadata_field(&mut self, key: &str, value: &str) -> Result<(), DatasetError> {
        self.ensure_metadata()?;
        if let Some(metadata) = self.metadata.get_mut() {
            metadata.insert(key.to_string(), value.to_string());
        }
        self.save(&[Stream::Metadata])
    }

    /// Replace the table payload. DATA is rewritten first, then EXPORT and
    /// PLOT are regenerated from it, so a crash mid-way leaves DATA
    /// authoritative and the derived artifacts merely stale.
    pub fn set_table(&mut self, table: Table) -> Result<(), DatasetError> {
        self.table = Slot::Loaded(table);
        self.save(&[Stream::Data])
    }

    /// Row count of the (lazily loaded) table.
    pub fn row_count(&mut self) -> Result<usize, DatasetError> {
        Ok(self.table()?.row_count())
    }

    /// Per-numeric-column summary statistics of the (lazily loaded) table.
    pub fn summary_statistics(&mut self) -> Result<Vec<ColumnSummary>, DatasetError> {
        Ok(stats::summarize(self.table()?))
    }

    /// Listing summary: id, name and row count.
    pub fn info(&mut self) -> Result<DatasetInfo, DatasetError> {
        let name = self.name()?;
        let row_count = self.row_count()?;
        Ok(DatasetInfo {
            id: self.id,
            name,
            row_count,
        })
    }

    /// Raw bytes of a stored stream. Gated on METADATA presence: a dataset
    /// without METADATA does not exist, whatever else is on disk.
    pub fn stream_bytes(&mut self, stream: Stream) -> Result<Vec<u8>, DatasetError> {
        self.ensure_metadata()?;
        self.read_stream(stream)
    }

    /// Save the requested streams. An empty target list means all four;
    /// DATA implies EXPORT and PLOT and always lands before them. Each
    /// target is written independently: a failure leaves earlier targets
    /// in place, and re-issuing the same save is idempotent.
    pub fn save(&mut self, targets: &[Stream]) -> Result<(), DatasetError> {
        let targets = resolve_save_targets(targets);
        tracing::debug!(dataset_id = %self.id, ?targets, "saving dataset");
        for stream in targets {
            let bytes = self.serialize_stream(stream)?;
            self.write_stream(stream, &bytes)?;
        }
        Ok(())
    }

    /// Populate in-memory fields from storage. An empty target list means
    /// all; EXPORT and PLOT are derived, write-only projections and are
    /// skipped.
    pub fn load(&mut self, targets: &[Stream]) -> Result<(), DatasetError> {
        let targets: Vec<Stream> = if targets.is_empty() {
            Stream::ALL.to_vec()
        } else {
            targets.to_vec()
        };
        tracing::debug!(dataset_id = %self.id, ?targets, "loading dataset");
        for stream in targets {
            match stream {
                Stream::Data => {
                    let bytes = self.read_stream(Stream::Data)?;
                    let table = decode_table(&bytes, self.format).map_err(|e| {
                        DatasetError::Corrupt {
                            stream: Stream::Data,
                            source: e.into(),
                        }
                    })?;
                    self.table = Slot::Loaded(table);
                }
                Stream::Metadata => {
                    let bytes = self.read_stream(Stream::Metadata)?;
                    let metadata: Metadata = serde_json::from_slice(&bytes).map_err(|e| {
                        DatasetError::Corrupt {
                            stream: Stream::Metadata,
                            source: e.into(),
                        }
                    })?;
                    self.metadata = Slot::Loaded(metadata);
                }
                Stream::Export | Stream::Plot => {}
            }
        }
        Ok(())
    }

    /// Save then immediately reload the same targets, so the in-memory
    /// object reflects exactly what is durable, including any lossy
    /// round-trip effect of the storage encoding.
    pub fn sync(&mut self, targets: &[Stream]) -> Result<(), DatasetError> {
        self.save(targets)?;
        self.load(targets)
    }

    /// Delete the dataset and all of its streams. Verifies existence
    /// first, so deleting an unknown id reports `NotFound`.
    pub fn delete(mut self) -> Result<(), DatasetError> {
        self.ensure_metadata()?;
        self.store.delete_all(self.id)?;
        tracing::info!(dataset_id = %self.id, "deleted dataset");
        Ok(())
    }

    fn ensure_metadata(&mut self) -> Result<(), DatasetError> {
        if !self.metadata.is_loaded() {
            self.load(&[Stream::Metadata])?;
        }
        Ok(())
    }

    fn ensure_table(&mut self) -> Result<(), DatasetError> {
        if !self.table.is_loaded() {
            self.load(&[Stream::Data])?;
        }
        Ok(())
    }

    fn serialize_stream(&mut self, stream: Stream) -> Result<Vec<u8>, DatasetError> {
        match stream {
            Stream::Data => {
                let format = self.format;
                let table = self.table()?;
                encode_table(table, format).map_err(|e| DatasetError::Storage(e.into()))
            }
            Stream::Metadata => {
                let metadata = self.metadata()?;
                serde_json::to_vec_pretty(metadata).map_err(|e| DatasetError::Storage(e.into()))
            }
            Stream::Export => {
                let table = self.table()?;
                derive::render_export(table).map_err(|e| DatasetError::Render {
                    stream: Stream::Export,
                    source: e.into(),
                })
            }
            Stream::Plot => {
                let table = self.table()?;
                derive::render_plot(table).map_err(|e| DatasetError::Render {
                    stream: Stream::Plot,
                    source: e.into(),
                })
            }
        }
    }

    fn write_stream(&self, stream: Stream, bytes: &[u8]) -> Result<(), DatasetError> {
        let mut writer = self.store.open_write(self.id, stream)?;
        writer
            .write_all(bytes)
            .map_err(|e| DatasetError::Storage(e.into()))?;
        writer.commit()?;
        Ok(())
    }

    fn read_stream(&self, stream: Stream) -> Result<Vec<u8>, DatasetError> {
        let mut file = self.store.open_read(self.id, stream)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|e| DatasetError::Storage(e.into()))?;
        Ok(buf)
    }
}

/// Normalize a save target list: empty means all four, DATA pulls in
/// EXPORT and PLOT, and the result is deduplicated in save order (DATA
/// before the artifacts derived from it).
fn resolve_save_targets(targets: &[Stream]) -> Vec<Stream> {
    let mut resolved: Vec<Stream> = if targets.is_empty() {
        Stream::ALL.to_vec()
    } else {
        targets.to_vec()
    };
    if resolved.contains(&Stream::Data) {
        resolved.push(Stream::Export);
        resolved.push(Stream::Plot);
    }
    resolved.sort();
    resolved.dedup();
    resolved
}
