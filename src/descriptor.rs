/// Write-once `.strm` descriptor files

use crate::naming::normalize_name;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};
use walkdir::WalkDir;

/// Extension of descriptor files
pub const DESCRIPTOR_EXTENSION: &str = "strm";

/// Result of a single descriptor write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new descriptor was written
    Created(PathBuf),
    /// A descriptor already existed and was left untouched
    Exists(PathBuf),
    /// The name cleaned to nothing, nothing was written
    EmptyName,
    /// The write failed; the error has been logged
    Failed(PathBuf),
}

impl WriteOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, WriteOutcome::Created(_))
    }
}

/// Creates descriptors inside one storage directory
#[derive(Debug, Clone)]
pub struct DescriptorWriter {
    storage_dir: PathBuf,
}

impl DescriptorWriter {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Path the descriptor for `stem` lives at
    pub fn descriptor_path(&self, stem: &str) -> PathBuf {
        self.storage_dir
            .join(format!("{}.{}", stem, DESCRIPTOR_EXTENSION))
    }

    /// Write a descriptor named after the normalized `display_name`
    pub async fn write(&self, display_name: &str, url: &str) -> WriteOutcome {
        let name = normalize_name(display_name);
        if name.is_empty() {
            warn!("Skipping descriptor with empty name (raw: {:?})", display_name);
            return WriteOutcome::EmptyName;
        }
        self.write_stem(&name, url).await
    }

    /// Write a descriptor using `stem` verbatim as the file name.
    ///
    /// An existing file is never opened, read or replaced. I/O failures are
    /// logged and reported as [`WriteOutcome::Failed`].
    pub async fn write_stem(&self, stem: &str, url: &str) -> WriteOutcome {
        if stem.trim().is_empty() {
            warn!("Skipping descriptor with empty file name");
            return WriteOutcome::EmptyName;
        }

        let path = self.descriptor_path(stem);
        if path.exists() {
            debug!("{}.{} already exists", stem, DESCRIPTOR_EXTENSION);
            return WriteOutcome::Exists(path);
        }

        match create_new_file(&path, url).await {
            Ok(()) => {
                debug!("Created {}.{}", stem, DESCRIPTOR_EXTENSION);
                WriteOutcome::Created(path)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("{}.{} appeared concurrently", stem, DESCRIPTOR_EXTENSION);
                WriteOutcome::Exists(path)
            }
            Err(e) => {
                error!("Failed to create descriptor {}: {}", path.display(), e);
                WriteOutcome::Failed(path)
            }
        }
    }

    /// Number of descriptor files currently in the storage directory
    pub fn count_existing(&self) -> usize {
        WalkDir::new(&self.storage_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .map_or(false, |ext| ext == DESCRIPTOR_EXTENSION)
            })
            .count()
    }
}

async fn create_new_file(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await
}
