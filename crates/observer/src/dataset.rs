use blockscope_fees::{BlockRecord, Dataset};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Durable-storage failure while replacing the dataset. Fatal: the
/// orchestrator stops and the process exits non-zero.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The dataset could not be serialized.
    #[error("failed to serialize dataset: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Write, fsync or atomic rename failed.
    #[error("failed to replace dataset at {path}: {source}")]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Crash-safe writer for the per-block dataset.
///
/// Every merge is a full read-modify-write: serialize the whole document
/// to a sibling temporary file, fsync it, then atomically rename over the
/// canonical path. A reader never observes a half-written document and a
/// crash before the rename leaves the previous file untouched.
#[derive(Debug)]
pub struct DatasetWriter {
    path: PathBuf,
}

impl DatasetWriter {
    /// Writer for the dataset at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Canonical dataset path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current dataset. A missing file is an empty dataset; an
    /// unreadable or unparseable one is logged and treated as empty rather
    /// than failing the update.
    pub fn load(&self) -> Dataset {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Dataset::new(),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "dataset unreadable, starting empty");
                return Dataset::new();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(dataset) => dataset,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "dataset corrupted, starting empty");
                Dataset::new()
            }
        }
    }

    /// Merge one block's record into the dataset and replace the file
    /// atomically. Records below the current maximum height are refused
    /// (keys are never inserted out of increasing order); re-merging the
    /// maximum key itself is permitted and idempotent.
    pub fn merge(&self, block_number: u64, record: &BlockRecord) -> Result<(), DatasetError> {
        let mut dataset = self.load();
        if let Some(&max) = dataset.keys().next_back() {
            if block_number < max {
                warn!(block_number, max, "refusing out-of-order dataset insert");
                return Ok(());
            }
        }
        dataset.insert(block_number, record.clone());
        self.replace(&dataset)
    }

    fn replace(&self, dataset: &Dataset) -> Result<(), DatasetError> {
        let bytes = serde_json::to_vec_pretty(dataset)?;
        let tmp = self.temp_path();
        if let Err(source) = write_durable(&tmp, &self.path, &bytes) {
            // Leave the canonical file alone; only the temp is discarded.
            let _ = fs::remove_file(&tmp);
            return Err(DatasetError::Io {
                path: self.path.clone(),
                source,
            });
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut os = self.path.as_os_str().to_owned();
        os.push(".tmp");
        PathBuf::from(os)
    }
}

fn write_durable(tmp: &Path, canonical: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, canonical)
}
