use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::StorageError;
use crate::snapshot::Snapshot;
use crate::storage_traits::{MemoryStorage, StorageResult};

/// Flat-file snapshot backend storing pretty-printed JSON.
///
/// Layout for per-learner stores: `<root>/ace_memory_<learner>.json`
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Backend persisting to exactly `path`. Parent directories are created on save.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Backend for one learner's playbook under `root`.
    ///
    /// Characters outside `[A-Za-z0-9_-]` are replaced with `_`; an id without any
    /// usable character is rejected.
    pub fn for_learner(root: impl AsRef<Path>, learner_id: &str) -> StorageResult<Self> {
        let trimmed = learner_id.trim();
        if !trimmed
            .chars()
            .any(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StorageError::InvalidScope(learner_id.to_string()));
        }
        let safe: String = trimmed
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Ok(Self::new(
            root.as_ref().join(format!("ace_memory_{safe}.json")),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MemoryStorage for JsonFileStorage {
    fn load(&self) -> StorageResult<Option<Snapshot>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };
        let snapshot: Snapshot = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::Deserialization(e.to_string()))?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> StorageResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        // Atomic write: write to temp file in the same directory, then rename.
        let tmp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, snapshot)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!(
            path = %self.path.display(),
            bullets = snapshot.bullets.len(),
            "snapshot written"
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
