//! Volume driver: the eight plugin operations on top of a [`Registry`]
//!
//! Every operation that reads or mutates starts by reloading the registry
//! (so changes made by another process are picked up), and every operation
//! that changes the record set saves right after. The load-act-save sequence
//! is not atomic across concurrent requests: the last save wins.
//!
//! # Examples
//!
//! ```no_run
//! use volmex::{Driver, DriverConfig, FileRegistry, VolumeOptions};
//!
//! let driver = Driver::new(
//!     FileRegistry::new("/var/local/volmex/volumes.json"),
//!     DriverConfig::new("/var/local/volmex"),
//! );
//!
//! let mut options = VolumeOptions::new();
//! options.insert("cmd".to_string(), "/usr/local/bin/attach-disk".to_string());
//! driver.create("data", options)?;
//! let mountpoint = driver.mount("data")?;
//! # Ok::<(), volmex::VolmexError>(())
//! ```

pub mod command;

pub use command::{CommandOutput, MountCommand};

use std::fs;
use std::path::PathBuf;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::DriverConfig;
use crate::errors::{Result, VolmexError};
use crate::registry::{CMD_OPTION, Registry, VolumeOptions, VolumeRecord};

/// Volume scope reported to the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Volumes exist on this host only
    Local,
}

/// Driver capability descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Capabilities {
    pub scope: Scope,
}

/// Volume driver
pub struct Driver {
    registry: Box<dyn Registry>,
    config: DriverConfig,
}

impl Driver {
    /// Create a driver owning `registry`
    pub fn new(registry: impl Registry + 'static, config: DriverConfig) -> Self {
        Self {
            registry: Box::new(registry),
            config,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    fn storage_dir(&self, name: &str) -> PathBuf {
        self.config.base_dir.join(name)
    }

    /// Mountpoint a volume called `name` gets on creation
    pub fn mountpoint_for(&self, name: &str) -> String {
        self.storage_dir(name).to_string_lossy().into_owned()
    }

    /// Create (or replace) a volume
    pub fn create(&self, name: &str, options: VolumeOptions) -> Result<()> {
        validate_name(name)?;
        self.registry.load()?;

        if options
            .get(CMD_OPTION)
            .is_none_or(|cmd| cmd.trim().is_empty())
        {
            return Err(VolmexError::MissingCommand);
        }

        let dir = self.storage_dir(name);
        fs::create_dir_all(&dir).map_err(|source| VolmexError::StorageDir {
            path: dir.clone(),
            source,
        })?;

        let record = VolumeRecord::new(name, self.mountpoint_for(name), options);
        self.registry.put(name, record);
        self.registry.save()?;

        info!("Created volume {} at {}", name, dir.display());
        Ok(())
    }

    /// Describe a volume
    pub fn get(&self, name: &str) -> Result<VolumeRecord> {
        self.registry.load()?;
        self.registry.get(name)
    }

    /// All volumes, possibly none
    pub fn list(&self) -> Result<Vec<VolumeRecord>> {
        self.registry.load()?;
        Ok(self.registry.list())
    }

    /// Forget a volume. Removing an unknown name is not an error.
    ///
    /// The storage directory is left on disk.
    pub fn remove(&self, name: &str) -> Result<()> {
        self.registry.load()?;
        self.registry.remove(name);
        self.registry.save()?;

        info!("Removed volume {}", name);
        Ok(())
    }

    /// Mountpoint of a known volume
    pub fn path(&self, name: &str) -> Result<String> {
        Ok(self.lookup(name)?.mountpoint)
    }

    /// Run the volume's mount command and return its mountpoint
    pub fn mount(&self, name: &str) -> Result<String> {
        let record = self.lookup(name)?;
        let command = MountCommand::parse(record.command().unwrap_or_default())?;

        // The registry lock is not held here: a slow command only stalls
        // this request.
        let result = command.run(&record, self.config.mount_timeout)?;
        debug!(
            "Mount command for {} finished in {}ms: {}",
            name, result.exec_time_ms, result.output
        );

        info!("Mounted volume {} at {}", name, record.mountpoint);
        Ok(record.mountpoint)
    }

    /// Acknowledge an unmount. There is no teardown command.
    pub fn unmount(&self, name: &str) {
        debug!("Unmount of {} acknowledged", name);
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            scope: Scope::Local,
        }
    }

    /// Load and get, reporting a miss as `UnknownVolume`
    fn lookup(&self, name: &str) -> Result<VolumeRecord> {
        self.registry.load()?;
        self.registry.get(name).map_err(|e| match e {
            VolmexError::NotFound => VolmexError::UnknownVolume,
            other => other,
        })
    }
}

/// Names become a single path component under the base directory
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
        return Err(VolmexError::InvalidName(name.to_string()));
    }
    Ok(())
}
