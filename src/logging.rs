use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::AppError;

pub const LOG_FILE: &str = "log.txt";
const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber. With `log_dir`, events are also appended
/// to `<log_dir>/log.txt`.
pub fn init(log_dir: Option<&Path>, verbose: bool) -> Result<(), AppError> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(ChronoLocal::new(LOG_TIME_FORMAT.to_string()));

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(LOG_FILE))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false)
                    .with_timer(ChronoLocal::new(LOG_TIME_FORMAT.to_string())),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter(verbose))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::General(format!("failed to set tracing subscriber: {e}")))
}
