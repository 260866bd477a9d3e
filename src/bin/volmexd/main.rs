//! volmexd - serve the volmex volume plugin on a unix socket

mod cli;
mod logging;

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use console::style;
use log::{error, info, warn};

use cli::Cli;
use volmex::server::serve_unix;
use volmex::{DaemonConfig, Driver, FileRegistry, InMemoryRegistry, Result};

#[actix_web::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    match run(cli.daemon_config()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{} {}", style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: DaemonConfig) -> Result<()> {
    config.validate()?;

    let driver = match &config.state_file {
        Some(path) => {
            info!("Persisting volumes to {}", path.display());
            Driver::new(FileRegistry::new(path), config.driver.clone())
        }
        None => {
            warn!("Volumes are kept in memory only");
            Driver::new(InMemoryRegistry::new(), config.driver.clone())
        }
    };

    if let Some(dir) = config.socket.parent() {
        fs::create_dir_all(dir)?;
    }

    let served = serve_unix(driver, &config.socket).await;

    // actix stops gracefully on SIGINT/SIGTERM; the socket file stays behind.
    if let Err(e) = fs::remove_file(&config.socket) {
        warn!(
            "could not delete plugin socket {}: {}",
            config.socket.display(),
            e
        );
    }

    served?;
    info!("volmexd stopped");
    Ok(())
}
