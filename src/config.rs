//! Process-start configuration for the driver and the daemon

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{Result, VolmexError};

/// Default base directory for volume storage
pub const DEFAULT_STORAGE_DIR: &str = "/var/local/volmex";
/// State file name inside the storage directory
pub const STATE_FILE_NAME: &str = "volumes.json";
/// Docker looks for plugin sockets in this directory
pub const PLUGIN_SOCKET_DIR: &str = "/run/docker/plugins";
/// Plugin name, also the socket file stem
pub const PLUGIN_NAME: &str = "volmex";

/// Driver configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Base directory under which mountpoints are derived
    pub base_dir: PathBuf,
    /// Upper bound for a mount command; `None` waits forever
    pub mount_timeout: Option<Duration>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            mount_timeout: None,
        }
    }
}

impl DriverConfig {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Set mount command timeout
    pub fn mount_timeout(mut self, timeout: Duration) -> Self {
        self.mount_timeout = Some(timeout);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(VolmexError::InvalidConfig(
                "Storage base directory cannot be empty".to_string(),
            ));
        }

        if self.mount_timeout == Some(Duration::ZERO) {
            return Err(VolmexError::InvalidConfig(
                "Mount timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Daemon configuration: everything fixed when `volmexd` starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub driver: DriverConfig,
    /// Backing file of the durable registry, `None` for the in-memory one
    pub state_file: Option<PathBuf>,
    /// Unix socket the plugin is served on
    pub socket: PathBuf,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let driver = DriverConfig::default();
        Self {
            state_file: Some(driver.base_dir.join(STATE_FILE_NAME)),
            socket: default_socket_path(),
            driver,
        }
    }
}

impl DaemonConfig {
    /// Validate configuration, including the startup checks on the filesystem
    pub fn validate(&self) -> Result<()> {
        self.driver.validate()?;

        if !self.driver.base_dir.is_dir() {
            return Err(VolmexError::InvalidConfig(format!(
                "storage folder does not exist: {}",
                self.driver.base_dir.display()
            )));
        }

        if self.socket.exists() {
            return Err(VolmexError::InvalidConfig(format!(
                "{} already exists, is volmex already running?",
                self.socket.display()
            )));
        }

        Ok(())
    }
}

/// `/run/docker/plugins/volmex.sock`
pub fn default_socket_path() -> PathBuf {
    Path::new(PLUGIN_SOCKET_DIR).join(format!("{}.sock", PLUGIN_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_paths_match_plugin_layout() {
        let config = DaemonConfig::default();
        assert_eq!(config.driver.base_dir, PathBuf::from("/var/local/volmex"));
        assert_eq!(
            config.state_file,
            Some(PathBuf::from("/var/local/volmex/volumes.json"))
        );
        assert_eq!(
            config.socket,
            PathBuf::from("/run/docker/plugins/volmex.sock")
        );
        assert!(config.driver.mount_timeout.is_none());
    }

    #[test]
    fn driver_config_rejects_empty_base() {
        assert!(DriverConfig::new("").validate().is_err());
        assert!(DriverConfig::new("/srv/volumes").validate().is_ok());
    }

    #[test]
    fn driver_config_rejects_zero_timeout() {
        let config = DriverConfig::new("/srv").mount_timeout(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = DriverConfig::new("/srv").mount_timeout(Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn daemon_config_requires_storage_dir() {
        let tmp = tempdir().unwrap();
        let config = DaemonConfig {
            driver: DriverConfig::new(tmp.path().join("missing")),
            state_file: None,
            socket: tmp.path().join("volmex.sock"),
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("storage folder does not exist"));
    }

    #[test]
    fn daemon_config_refuses_existing_socket() {
        let tmp = tempdir().unwrap();
        let socket = tmp.path().join("volmex.sock");
        std::fs::write(&socket, b"").unwrap();

        let config = DaemonConfig {
            driver: DriverConfig::new(tmp.path()),
            state_file: None,
            socket,
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("already running"));
    }

    #[test]
    fn daemon_config_accepts_fresh_setup() {
        let tmp = tempdir().unwrap();
        let config = DaemonConfig {
            driver: DriverConfig::new(tmp.path()),
            state_file: Some(tmp.path().join(STATE_FILE_NAME)),
            socket: tmp.path().join("volmex.sock"),
        };
        assert!(config.validate().is_ok());
    }
}
