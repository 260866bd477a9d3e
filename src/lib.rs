//! volmex: a Docker volume plugin that delegates mounting to a command
//!
//! Volumes are metadata only: a name, a mountpoint derived from the storage
//! base directory, and the creation options. The `cmd` option is required and
//! is executed whenever the runtime mounts the volume.
//!
//! # Modules
//!
//! - **registry**: Volume record store (in-memory or JSON file backed)
//! - **driver**: The eight plugin operations and the mount command contract
//! - **protocol**: Plugin wire types
//! - **server**: actix-web routes and the unix socket server
//! - **config**: Process-start configuration
//!
//! # Example
//!
//! ```ignore
//! use volmex::{Driver, DriverConfig, InMemoryRegistry, VolumeOptions};
//!
//! let driver = Driver::new(InMemoryRegistry::new(), DriverConfig::new("/tmp/volumes"));
//!
//! let mut options = VolumeOptions::new();
//! options.insert("cmd".to_string(), "echo mounted".to_string());
//! driver.create("scratch", options)?;
//!
//! println!("mounted at {}", driver.mount("scratch")?);
//! ```

// Core modules
pub mod config;
pub mod errors;

// Layered modules
pub mod driver;
pub mod registry;

// Plugin surface
pub mod protocol;
pub mod server;

// Public API
pub use config::{DaemonConfig, DriverConfig};
pub use driver::{Capabilities, Driver, MountCommand, Scope};
pub use errors::{Result, VolmexError};
pub use registry::{
    FileRegistry, InMemoryRegistry, Registry, VolumeMap, VolumeOptions, VolumeRecord,
};
