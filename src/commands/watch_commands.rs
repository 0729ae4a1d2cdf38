use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::config::Config;
use crate::data;
use crate::error::AppError;
use crate::services::categorize_service::{CategoryTable, Categorizer};
use crate::services::context_service::{self, ContextProvider, NullContextProvider};
use crate::services::ingest_service::Pipeline;
use crate::services::naming_service::FilenameSynthesizer;
use crate::services::ocr_service::{self, NullExtractor, TextExtractor};
use crate::services::summarize_service::ModelSlot;
use crate::services::watch_service::ScreenshotWatcher;

/// Command-line switches layered on top of the loaded config.
#[derive(Debug, Clone, Default)]
pub struct WatchOverrides {
    pub path: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub categories: Option<PathBuf>,
    pub no_ocr: bool,
    pub no_rename: bool,
    pub no_categorize: bool,
    pub no_context: bool,
    pub no_move: bool,
}

impl WatchOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.path {
            config.watch_path = Some(path.clone());
        }
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
        if let Some(categories) = &self.categories {
            config.categories_path = Some(categories.clone());
        }
        config.enable_ocr &= !self.no_ocr;
        config.enable_rename &= !self.no_rename;
        config.enable_categorize &= !self.no_categorize;
        config.enable_context &= !self.no_context;
        config.move_to_category &= !self.no_move;
    }
}

fn extractor_for(config: &Config) -> Box<dyn TextExtractor> {
    if config.enable_ocr {
        ocr_service::detect_extractor()
    } else {
        Box::new(NullExtractor::new("disabled"))
    }
}

fn context_provider_for(config: &Config) -> Box<dyn ContextProvider> {
    if config.enable_context {
        context_service::detect_provider()
    } else {
        Box::new(NullContextProvider)
    }
}

/// Wires the store and every capability into a pipeline rooted at `watch_root`.
pub fn build_pipeline(config: &Config, watch_root: PathBuf) -> Result<Pipeline, AppError> {
    let conn = data::open_database(&config.db_path)?;
    let categorizer = Categorizer::new(CategoryTable::load_or_builtin(
        config.categories_path.as_deref(),
    ));
    let synthesizer = FilenameSynthesizer::new(
        ModelSlot::from_command(config.summarizer_command.clone()),
        config.max_filename_length,
    );

    Ok(Pipeline::new(
        watch_root,
        config.pipeline_options(),
        Arc::new(Mutex::new(conn)),
        extractor_for(config),
        context_provider_for(config),
        categorizer,
        synthesizer,
    ))
}

/// Builds and starts a watcher. The caller owns shutdown.
pub fn start_watcher(config: &Config) -> Result<ScreenshotWatcher, AppError> {
    let watch_root = config.resolved_watch_path();
    let pipeline = build_pipeline(config, watch_root)?;
    let mut watcher = ScreenshotWatcher::new(pipeline);
    watcher.start()?;
    info!(
        "ocr: {}, context: {}, rename: {}, categorize: {}, move: {}",
        config.enable_ocr,
        config.enable_context,
        config.enable_rename,
        config.enable_categorize,
        config.move_to_category
    );
    Ok(watcher)
}
