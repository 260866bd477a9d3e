//! Volume registry: the keyed store of volume records
//!
//! Two backends implement the same [`Registry`] capability set:
//!
//! - **InMemoryRegistry**: process memory only, `load`/`save` are no-ops
//! - **FileRegistry**: process memory mirrored to one JSON document
//!
//! Every backend guards its mapping with a single exclusive lock. The durable
//! backend holds that lock for the whole file read or write, so a concurrent
//! `get` never observes a half-replaced mapping.

pub mod file;
pub mod memory;

pub use file::FileRegistry;
pub use memory::InMemoryRegistry;

use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Volume options as supplied at creation
pub type VolumeOptions = BTreeMap<String, String>;

/// Name to record mapping, also the persisted document shape
pub type VolumeMap = BTreeMap<String, VolumeRecord>;

/// Option key holding the mount command line
pub const CMD_OPTION: &str = "cmd";

/// Persisted metadata for one volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeRecord {
    /// Unique key, chosen by the caller
    pub name: String,
    /// `<base>/<name>`, fixed at creation
    pub mountpoint: String,
    /// Creation options, never mutated
    #[serde(default)]
    pub options: VolumeOptions,
}

impl VolumeRecord {
    pub fn new(
        name: impl Into<String>,
        mountpoint: impl Into<String>,
        options: VolumeOptions,
    ) -> Self {
        Self {
            name: name.into(),
            mountpoint: mountpoint.into(),
            options,
        }
    }

    /// The `cmd` option, if present
    pub fn command(&self) -> Option<&str> {
        self.options.get(CMD_OPTION).map(String::as_str)
    }
}

/// Storage capability set the driver depends on
pub trait Registry: Send + Sync {
    /// Look up a record, `NotFound` on miss
    fn get(&self, name: &str) -> Result<VolumeRecord>;

    /// Insert or replace
    fn put(&self, name: &str, record: VolumeRecord);

    /// Delete if present
    fn remove(&self, name: &str);

    /// Snapshot of all records
    fn list(&self) -> Vec<VolumeRecord>;

    /// Refresh the in-memory mapping from durable storage
    fn load(&self) -> Result<()>;

    /// Write the in-memory mapping to durable storage
    fn save(&self) -> Result<()>;
}
