use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use volmex::config::{DEFAULT_STORAGE_DIR, STATE_FILE_NAME, default_socket_path};
use volmex::{DaemonConfig, DriverConfig};

#[derive(Parser, Debug)]
#[command(name = "volmexd")]
#[command(version, about = "Docker volume plugin that runs a command on mount", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Serve with the defaults (/var/local/volmex, /run/docker/plugins/volmex.sock)
    volmexd

    # Separate state file and a 30 second bound on mount commands
    volmexd --storage /srv/volumes --state-file /var/lib/volmex.json --mount-timeout 30

    # Then, from docker
    docker volume create -d volmex -o cmd=\"/usr/local/bin/attach-nfs\" data
")]
pub struct Cli {
    /// Base for volume storage directories
    #[arg(long, value_name = "DIR", env = "VOLMEX_STORAGE", default_value = DEFAULT_STORAGE_DIR)]
    pub storage: PathBuf,

    /// Registry state file (defaults to <storage>/volumes.json)
    #[arg(long, value_name = "FILE", env = "VOLMEX_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Plugin socket path
    #[arg(long, value_name = "PATH", env = "VOLMEX_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Kill mount commands running longer than this many seconds
    #[arg(long, value_name = "SECONDS", env = "VOLMEX_MOUNT_TIMEOUT")]
    pub mount_timeout: Option<u64>,

    /// Keep volumes in memory only (lost on restart)
    #[arg(long, conflicts_with = "state_file")]
    pub in_memory: bool,

    /// Show verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn daemon_config(&self) -> DaemonConfig {
        let mut driver = DriverConfig::new(&self.storage);
        if let Some(secs) = self.mount_timeout {
            driver = driver.mount_timeout(Duration::from_secs(secs));
        }

        let state_file = if self.in_memory {
            None
        } else {
            Some(
                self.state_file
                    .clone()
                    .unwrap_or_else(|| self.storage.join(STATE_FILE_NAME)),
            )
        };

        DaemonConfig {
            driver,
            state_file,
            socket: self.socket.clone().unwrap_or_else(default_socket_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_storage_dir() {
        let cli = Cli::try_parse_from(["volmexd", "--storage", "/srv/volumes"]).unwrap();
        let config = cli.daemon_config();

        assert_eq!(config.driver.base_dir, PathBuf::from("/srv/volumes"));
        assert_eq!(
            config.state_file,
            Some(PathBuf::from("/srv/volumes/volumes.json"))
        );
        assert_eq!(config.socket, default_socket_path());
        assert!(config.driver.mount_timeout.is_none());
    }

    #[test]
    fn explicit_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "volmexd",
            "--state-file",
            "/var/lib/volmex.json",
            "--socket",
            "/tmp/volmex.sock",
            "--mount-timeout",
            "30",
        ])
        .unwrap();
        let config = cli.daemon_config();

        assert_eq!(
            config.state_file,
            Some(PathBuf::from("/var/lib/volmex.json"))
        );
        assert_eq!(config.socket, PathBuf::from("/tmp/volmex.sock"));
        assert_eq!(config.driver.mount_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn in_memory_has_no_state_file() {
        let cli = Cli::try_parse_from(["volmexd", "--in-memory"]).unwrap();
        assert!(cli.daemon_config().state_file.is_none());
    }

    #[test]
    fn in_memory_conflicts_with_state_file() {
        assert!(
            Cli::try_parse_from(["volmexd", "--in-memory", "--state-file", "/x.json"]).is_err()
        );
    }
}
