//! Filesystem-backed stream store.
//!
//! One directory per dataset, named by the dataset id, containing one file
//! per stream. Writes go to a temp file in the same directory and are
//! renamed into place on [`StreamWriter::commit`], so readers only ever
//! observe fully written streams, never a truncated one.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// The four byte-serializable projections of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stream {
    Data,
    Metadata,
    Export,
    Plot,
}

impl Stream {
    /// All streams, in save order: DATA lands before the artifacts derived
    /// from it.
    pub const ALL: [Stream; 4] = [
        Stream::Data,
        Stream::Metadata,
        Stream::Export,
        Stream::Plot,
    ];

    /// File name of this stream inside the dataset directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Stream::Data => "data.bin",
            Stream::Metadata => "metadata.json",
            Stream::Export => "export.xlsx",
            Stream::Plot => "plot.pdf",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stream::Data => "data",
            Stream::Metadata => "metadata",
            Stream::Export => "export",
            Stream::Plot => "plot",
        };
        write!(f, "{}", name)
    }
}

/// Errors raised by the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested stream file does not exist.
    #[error("stream '{stream}' not found for dataset '{id}'")]
    NotFound { id: Uuid, stream: Stream },

    /// An I/O failure on a specific stream.
    #[error("i/o failure on stream '{stream}' of dataset '{id}': {source}")]
    Io {
        id: Uuid,
        stream: Stream,
        #[source]
        source: io::Error,
    },

    /// Failure while enumerating dataset directories.
    #[error("failed to enumerate datasets: {0}")]
    List(#[source] io::Error),

    /// Failure while removing a dataset directory.
    #[error("failed to delete dataset '{id}': {source}")]
    Delete {
        id: Uuid,
        #[source]
        source: io::Error,
    },
}

/// Maps (dataset id, stream) to files under a root directory.
///
/// The root is injected, never read from ambient state, so multiple stores
/// can coexist in one process.
#[derive(Debug, Clone)]
pub struct StreamStore {
    root: PathBuf,
}

impl StreamStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StreamStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dataset_dir(&self, id: Uuid) -> PathBuf {
        self.root.join(id.to_string())
    }

    /// Full path of one stream file.
    pub fn stream_path(&self, id: Uuid, stream: Stream) -> PathBuf {
        self.dataset_dir(id).join(stream.file_name())
    }

    /// Open a stream for reading. Missing file or dataset directory is
    /// `NotFound`.
    pub fn open_read(&self, id: Uuid, stream: Stream) -> Result<File, StoreError> {
        File::open(self.stream_path(id, stream)).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound { id, stream },
            _ => StoreError::Io {
                id,
                stream,
                source: e,
            },
        })
    }

    /// Open a stream for writing, creating the dataset directory if
    /// needed. Nothing becomes visible under the final file name until
    /// [`StreamWriter::commit`].
    pub fn open_write(&self, id: Uuid, stream: Stream) -> Result<StreamWriter, StoreError> {
        let dir = self.dataset_dir(id);
        let io_err = |source| StoreError::Io { id, stream, source };
        fs::create_dir_all(&dir).map_err(io_err)?;

        let final_path = dir.join(stream.file_name());
        let tmp_path = dir.join(format!(".{}.tmp", stream.file_name()));
        let file = File::create(&tmp_path).map_err(io_err)?;
        tracing::debug!(dataset_id = %id, %stream, "opened stream for writing");
        Ok(StreamWriter {
            id,
            stream,
            file,
            tmp_path,
            final_path,
            committed: false,
        })
    }

    /// Whether any stream of this dataset has been written.
    pub fn exists(&self, id: Uuid) -> bool {
        self.dataset_dir(id).is_dir()
    }

    /// Remove the dataset directory and everything in it. Removing a
    /// dataset that was never written is not an error.
    pub fn delete_all(&self, id: Uuid) -> Result<(), StoreError> {
        match fs::remove_dir_all(self.dataset_dir(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Delete { id, source: e }),
        }
    }

    /// Lazily enumerate dataset ids, one per directory entry. Entries that
    /// do not parse as ids are skipped; order is unspecified and entries
    /// created during enumeration may or may not appear.
    pub fn list_ids(&self) -> Result<ListIds, StoreError> {
        match fs::read_dir(&self.root) {
            Ok(entries) => Ok(ListIds {
                entries: Some(entries),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ListIds { entries: None }),
            Err(e) => Err(StoreError::List(e)),
        }
    }
}

/// Lazy iterator over the dataset ids present in a store.
pub struct ListIds {
    entries: Option<fs::ReadDir>,
}

impl Iterator for ListIds {
    type Item = Result<Uuid, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entries = self.entries.as_mut()?;
        loop {
            match entries.next()? {
                Ok(entry) => {
                    let name = entry.file_name();
                    match name.to_str().and_then(crate::id::parse_dataset_id) {
                        Some(id) => return Some(Ok(id)),
                        None => continue,
                    }
                }
                Err(e) => return Some(Err(StoreError::List(e))),
            }
        }
    }
}

/// Write handle for one stream. Bytes land in a temp file; `commit`
/// flushes, syncs and renames it over the final path.
pub struct StreamWriter {
    id: Uuid,
    stream: Stream,
    file: File,
    tmp_path: PathBuf,
    final_path: PathBuf,
    committed: bool,
}

impl StreamWriter {
    /// Make the written bytes visible under the stream's final name.
    pub fn commit(mut self) -> Result<(), StoreError> {
        let (id, stream) = (self.id, self.stream);
        let io_err = |source| StoreError::Io { id, stream, source };
        self.file.flush().map_err(io_err)?;
        self.file.sync_all().map_err(io_err)?;
        fs::rename(&self.tmp_path, &self.final_path).map_err(io_err)?;
        self.committed = true;
        tracing::debug!(dataset_id = %self.id, stream = %self.stream, "committed stream");
        Ok(())
    }
}

impl io::Write for StreamWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Drop for StreamWriter {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}
