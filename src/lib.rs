pub mod commands;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::AppError;
pub use services::ingest_service::{Outcome, Pipeline, PipelineOptions};
pub use services::watch_service::ScreenshotWatcher;
