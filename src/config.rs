//! Runtime configuration, loaded from TOML and overridden by the command line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::categorize_service::DEFAULT_MIN_CONFIDENCE;
use crate::services::ingest_service::{
    PipelineOptions, DEFAULT_MIN_FILE_SIZE, DEFAULT_PROCESSED_LIMIT,
};
use crate::services::naming_service::DEFAULT_MAX_FILENAME_LENGTH;

pub const DEFAULT_DB_FILE: &str = "shotwise.db";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory to watch; resolved from the usual screenshot folders when unset
    pub watch_path: Option<PathBuf>,

    /// SQLite metadata store
    pub db_path: PathBuf,

    /// JSON file mapping category names to keyword lists
    pub categories_path: Option<PathBuf>,

    pub min_confidence: f64,

    /// Captures smaller than this many bytes are skipped
    pub min_file_size: u64,

    /// Wait after a creation notification before reading the file (ms)
    pub settle_delay_ms: u64,

    pub processed_set_limit: usize,
    pub max_filename_length: usize,

    pub enable_ocr: bool,
    pub enable_context: bool,
    pub enable_rename: bool,
    pub enable_categorize: bool,
    pub move_to_category: bool,

    /// Shell-style command line that reads text on stdin and prints a summary
    pub summarizer_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_path: None,
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            categories_path: None,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            min_file_size: DEFAULT_MIN_FILE_SIZE,
            settle_delay_ms: 500,
            processed_set_limit: DEFAULT_PROCESSED_LIMIT,
            max_filename_length: DEFAULT_MAX_FILENAME_LENGTH,
            enable_ocr: true,
            enable_context: true,
            enable_rename: true,
            enable_categorize: true,
            move_to_category: true,
            summarizer_command: None,
        }
    }
}

impl Config {
    pub fn from_toml(raw: &str) -> Result<Self, AppError> {
        Ok(toml::from_str(raw)?)
    }

    /// Loads `explicit` if given (it must exist), otherwise the per-user
    /// config file when present, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, AppError> {
        if let Some(path) = explicit {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                AppError::Config(format!("cannot read {}: {e}", path.display()))
            })?;
            return Self::from_toml(&raw);
        }

        match default_config_path() {
            Some(path) if path.is_file() => {
                let raw = std::fs::read_to_string(&path)?;
                Self::from_toml(&raw)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn resolved_watch_path(&self) -> PathBuf {
        self.watch_path.clone().unwrap_or_else(default_watch_path)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            enable_ocr: self.enable_ocr,
            enable_context: self.enable_context,
            enable_rename: self.enable_rename,
            enable_categorize: self.enable_categorize,
            move_to_category: self.move_to_category,
            min_confidence: self.min_confidence,
            min_file_size: self.min_file_size,
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            processed_limit: self.processed_set_limit,
        }
    }
}

pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "shotwise").map(|dirs| dirs.config_dir().to_path_buf())
}

pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

fn watch_candidates(home: &Path) -> [PathBuf; 3] {
    [
        home.join("Pictures").join("Screenshots"),
        home.join("Desktop").join("Screenshots"),
        home.join("Screenshots"),
    ]
}

fn pick_watch_path(home: &Path) -> PathBuf {
    let candidates = watch_candidates(home);
    candidates
        .iter()
        .find(|p| p.is_dir())
        .unwrap_or(&candidates[0])
        .clone()
}

/// First existing screenshot folder under the home directory, else
/// `~/Pictures/Screenshots` (created when the watcher starts).
pub fn default_watch_path() -> PathBuf {
    match BaseDirs::new() {
        Some(dirs) => pick_watch_path(dirs.home_dir()),
        None => PathBuf::from("Screenshots"),
    }
}
