//! Durable registry: process memory mirrored to a single JSON file

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use super::{InMemoryRegistry, Registry, VolumeMap, VolumeRecord};
use crate::errors::{Result, VolmexError};

/// Registry persisted as one JSON document at a fixed path
///
/// The document maps volume names to records. There is no log and no
/// versioning: every `save` rewrites the whole file, every `load` replaces
/// the whole in-memory mapping.
#[derive(Debug)]
pub struct FileRegistry {
    memory: InMemoryRegistry,
    path: PathBuf,
}

impl FileRegistry {
    /// Create an empty registry backed by `path`. Nothing is read until `load`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            memory: InMemoryRegistry::new(),
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling path used to stage a save before renaming it into place
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("state"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn parse(&self, data: &[u8]) -> Result<VolumeMap> {
        let volumes: VolumeMap =
            serde_json::from_slice(data).map_err(|source| VolmexError::StateParse {
                path: self.path.clone(),
                source,
            })?;

        let nameless = volumes.iter().find(|(_, record)| record.name.is_empty());
        if let Some((key, _)) = nameless {
            return Err(VolmexError::StateParse {
                path: self.path.clone(),
                source: <serde_json::Error as serde::de::Error>::custom(format!(
                    "record {:?} has no name",
                    key
                )),
            });
        }

        Ok(volumes)
    }

    fn write_err(&self, source: io::Error) -> VolmexError {
        VolmexError::StateWrite {
            path: self.path.clone(),
            source,
        }
    }
}

impl Registry for FileRegistry {
    fn get(&self, name: &str) -> Result<VolumeRecord> {
        self.memory.get(name)
    }

    fn put(&self, name: &str, record: VolumeRecord) {
        self.memory.put(name, record)
    }

    fn remove(&self, name: &str) {
        self.memory.remove(name)
    }

    fn list(&self) -> Vec<VolumeRecord> {
        self.memory.list()
    }

    fn load(&self) -> Result<()> {
        let mut volumes = self.memory.lock();

        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No state at {} yet, keeping registry", self.path.display());
                return Ok(());
            }
            Err(source) => {
                return Err(VolmexError::StateRead {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        *volumes = self.parse(&data)?;
        debug!(
            "Loaded {} volume(s) from {}",
            volumes.len(),
            self.path.display()
        );
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let volumes = self.memory.lock();

        let out = serde_json::to_vec(&*volumes).map_err(|e| self.write_err(e.into()))?;
        let staging = self.staging_path();
        fs::write(&staging, &out).map_err(|e| self.write_err(e))?;
        if let Err(e) = fs::rename(&staging, &self.path) {
            let _ = fs::remove_file(&staging);
            return Err(self.write_err(e));
        }

        debug!(
            "Saved {} volume(s) to {}",
            volumes.len(),
            self.path.display()
        );
        Ok(())
    }
}
