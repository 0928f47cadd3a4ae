//! Local filesystem store

use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};

use super::filename::{is_plain_name, numbered_candidate};
use super::types::{StorageError, StoredFile};

/// Upper bound on numeric suffixes tried before giving up on a name
pub const MAX_NAME_PROBES: usize = 10_000;

/// Flat directory holding uploaded files
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    max_probes: usize,
}

impl LocalStore {
    /// Open the store, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|source| StorageError::Io {
                path: root.clone(),
                source,
            })?;
        Ok(Self {
            root,
            max_probes: MAX_NAME_PROBES,
        })
    }

    /// Limit the numeric suffixes tried per name
    pub fn with_max_probes(mut self, max_probes: usize) -> Self {
        self.max_probes = max_probes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a new, empty file for `safe_name` without touching existing ones.
    ///
    /// Tries `safe_name`, then `stem_1.ext`, `stem_2.ext`, ... The file is
    /// opened create-new, so a name taken concurrently just moves the probe on.
    pub async fn create_unique(&self, safe_name: &str) -> Result<(StoredFile, File), StorageError> {
        for n in 0..=self.max_probes {
            let name = numbered_candidate(safe_name, n);
            let path = self.root.join(&name);

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    if n > 0 {
                        tracing::debug!(requested = %safe_name, stored = %name, "Name taken, using suffix");
                    }
                    return Ok((StoredFile { name, path }, file));
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(StorageError::Io { path, source }),
            }
        }

        Err(StorageError::NamesExhausted {
            name: safe_name.to_string(),
            attempts: self.max_probes + 1,
        })
    }

    /// Find a stored file by name.
    ///
    /// Names that are not plain flat names are never joined to the root and
    /// report as absent.
    pub async fn locate(&self, name: &str) -> Result<Option<PathBuf>, StorageError> {
        if !is_plain_name(name) {
            tracing::warn!(name = %name, "Refusing to resolve non-plain filename");
            return Ok(None);
        }

        let path = self.root.join(name);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    /// Delete a stored file
    pub async fn remove(&self, stored: &StoredFile) -> Result<(), StorageError> {
        fs::remove_file(&stored.path)
            .await
            .map_err(|source| StorageError::Io {
                path: stored.path.clone(),
                source,
            })
    }
}
