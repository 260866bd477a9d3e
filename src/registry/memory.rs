//! Transient registry backed by process memory

use std::sync::{Mutex, MutexGuard};

use log::trace;

use super::{Registry, VolumeMap, VolumeRecord};
use crate::errors::{Result, VolmexError};

/// Registry that lives only as long as the process
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    volumes: Mutex<VolumeMap>,
}

impl InMemoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding `volumes`
    pub fn with_volumes(volumes: VolumeMap) -> Self {
        Self {
            volumes: Mutex::new(volumes),
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Acquire the registry lock.
    ///
    /// A panic while holding the lock cannot leave the map half-written (all
    /// mutations are single map operations), so poisoning is ignored.
    pub(crate) fn lock(&self) -> MutexGuard<'_, VolumeMap> {
        self.volumes
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl Registry for InMemoryRegistry {
    fn get(&self, name: &str) -> Result<VolumeRecord> {
        self.lock().get(name).cloned().ok_or(VolmexError::NotFound)
    }

    fn put(&self, name: &str, record: VolumeRecord) {
        trace!("registry put {}", name);
        self.lock().insert(name.to_string(), record);
    }

    fn remove(&self, name: &str) {
        trace!("registry remove {}", name);
        self.lock().remove(name);
    }

    fn list(&self) -> Vec<VolumeRecord> {
        self.lock().values().cloned().collect()
    }

    fn load(&self) -> Result<()> {
        Ok(())
    }

    fn save(&self) -> Result<()> {
        Ok(())
    }
}
