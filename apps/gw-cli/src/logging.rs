use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use gw_app::{AppError, AppResult};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, fmt};

/// Console output plus an optional plain-text log file, both at `level`.
pub fn init(verbose: bool, log_file: Option<&Path>) -> AppResult<()> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(open_log(path)?))
                .with_filter(level),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_filter(level))
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::InvalidInput(format!("logging already initialised: {e}")))
}

fn open_log(path: &Path) -> AppResult<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}
