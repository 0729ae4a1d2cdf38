use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, error, info, warn};

use crate::data::repository;
use crate::error::AppError;
use crate::models::context::WindowContext;
use crate::models::extraction::Extraction;
use crate::models::screenshot::{NewScreenshot, ScreenshotRecord, UNCATEGORIZED};
use crate::services::categorize_service::{Categorizer, DEFAULT_MIN_CONFIDENCE};
use crate::services::context_service::ContextProvider;
use crate::services::file_service;
use crate::services::naming_service::FilenameSynthesizer;
use crate::services::ocr_service::{self, TextExtractor};
use crate::services::summarize_service::sanitize_fragment;
use crate::services::watch_service;

pub const DEFAULT_MIN_FILE_SIZE: u64 = 1024;
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_PROCESSED_LIMIT: usize = 1000;
const MAX_CATEGORY_DIR_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub enable_ocr: bool,
    pub enable_context: bool,
    pub enable_rename: bool,
    pub enable_categorize: bool,
    pub move_to_category: bool,
    pub min_confidence: f64,
    pub min_file_size: u64,
    pub settle_delay: Duration,
    pub processed_limit: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            enable_ocr: true,
            enable_context: true,
            enable_rename: true,
            enable_categorize: true,
            move_to_category: true,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            min_file_size: DEFAULT_MIN_FILE_SIZE,
            settle_delay: DEFAULT_SETTLE_DELAY,
            processed_limit: DEFAULT_PROCESSED_LIMIT,
        }
    }
}

/// What happened to one creation notification.
#[derive(Debug)]
pub enum Outcome {
    Ignored(&'static str),
    TooSmall(u64),
    Duplicate(i64),
    Ingested(ScreenshotRecord),
    Abandoned(String),
}

pub struct Pipeline {
    watch_root: PathBuf,
    options: PipelineOptions,
    db: Arc<Mutex<Connection>>,
    extractor: Box<dyn TextExtractor>,
    context: Box<dyn ContextProvider>,
    categorizer: Categorizer,
    synthesizer: FilenameSynthesizer,
    processed: HashSet<PathBuf>,
    category_dirs: HashMap<String, PathBuf>,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

/// Runs one collaborator call, turning a panic into `None`.
fn guarded<T>(stage: &str, file: &str, f: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(_) => {
            error!("{stage} panicked for {file}");
            None
        }
    }
}

impl Pipeline {
    pub fn new(
        watch_root: PathBuf,
        options: PipelineOptions,
        db: Arc<Mutex<Connection>>,
        extractor: Box<dyn TextExtractor>,
        context: Box<dyn ContextProvider>,
        categorizer: Categorizer,
        synthesizer: FilenameSynthesizer,
    ) -> Self {
        Self {
            watch_root,
            options,
            db,
            extractor,
            context,
            categorizer,
            synthesizer,
            processed: HashSet::new(),
            category_dirs: HashMap::new(),
        }
    }

    pub fn watch_root(&self) -> &Path {
        &self.watch_root
    }

    /// Runs every creation path carried by one watcher event.
    pub fn handle_event(&mut self, event: &notify::Event) -> Vec<Outcome> {
        watch_service::creation_paths(event)
            .into_iter()
            .map(|path| self.handle_created(&path))
            .collect()
    }

    /// Entry point for a creation notification. Never panics and never returns
    /// an error; every failure is logged and folded into the outcome.
    pub fn handle_created(&mut self, path: &Path) -> Outcome {
        let file = display_name(path);
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.process(path)));
        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!("error processing {}: {e:?}", path.display());
                Outcome::Abandoned(e.to_string())
            }
            Err(_) => {
                error!("processing {file} panicked, abandoning it");
                Outcome::Abandoned(format!("panic while processing {file}"))
            }
        }
    }

    fn remember(&mut self, path: &Path) {
        if self.processed.len() >= self.options.processed_limit {
            debug!("processed set reached {} entries, clearing", self.processed.len());
            self.processed.clear();
        }
        self.processed.insert(path.to_path_buf());
    }

    fn intake(&mut self, path: &Path) -> Option<Outcome> {
        if path.is_dir() {
            return Some(Outcome::Ignored("directory"));
        }
        if is_hidden(path) {
            return Some(Outcome::Ignored("hidden file"));
        }
        if !ocr_service::is_image_candidate(path) {
            return Some(Outcome::Ignored("not an image"));
        }
        if self.processed.contains(path) {
            return Some(Outcome::Ignored("already seen"));
        }
        self.remember(path);

        if !self.options.settle_delay.is_zero() {
            std::thread::sleep(self.options.settle_delay);
        }
        if !path.exists() {
            debug!("{} disappeared before processing", path.display());
            return Some(Outcome::Ignored("file vanished"));
        }
        None
    }

    fn lock_db(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn process(&mut self, path: &Path) -> Result<Outcome, AppError> {
        if let Some(outcome) = self.intake(path) {
            return Ok(outcome);
        }
        let file = display_name(path);

        let file_size = std::fs::metadata(path)?.len();
        if file_size < self.options.min_file_size {
            warn!("skipping {file}: {file_size} bytes is below the {} byte minimum", self.options.min_file_size);
            return Ok(Outcome::TooSmall(file_size));
        }

        let file_hash = match file_service::hash_file(path) {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!("could not hash {file}, skipping duplicate check: {e}");
                None
            }
        };
        if let Some(hash) = file_hash.as_deref() {
            match repository::find_by_hash(&self.lock_db(), hash) {
                Ok(Some(existing)) => {
                    info!("{file} duplicates {} (record {}), skipping", existing.file_name, existing.id);
                    return Ok(Outcome::Duplicate(existing.id));
                }
                Ok(None) => {}
                Err(e) => warn!("duplicate lookup failed for {file}: {e}"),
            }
        }

        let context = self.capture_context(&file);
        let extraction = self.extract_text(path, &file);
        let ocr_text = extraction.text().map(str::to_string);
        let category = self.categorize(ocr_text.as_deref(), &context, &file);

        info!(
            "new screenshot: {file} | size: {file_size} bytes | app: {} | window: {} | text: {} | category: {}",
            context.app,
            context.title,
            extraction.describe(),
            category.as_deref().unwrap_or(UNCATEGORIZED)
        );

        let mut current = path.to_path_buf();
        if self.options.enable_rename {
            current = self.rename(&current, &context, ocr_text.as_deref(), &file);
        }
        if let Some(category) = category.as_deref() {
            if self.options.move_to_category && category != UNCATEGORIZED {
                current = self.move_to_category(&current, category, &file);
            }
        }
        if current != path {
            // The original name is free again; a later capture may reuse it.
            self.processed.remove(path);
        }
        self.remember(&current);

        let file_hash = match file_hash {
            Some(hash) => hash,
            None => file_service::hash_file(&current)?,
        };
        let new = NewScreenshot {
            file_path: current.to_string_lossy().to_string(),
            file_name: display_name(&current),
            file_size: file_size as i64,
            file_hash,
            category,
            app_name: self.options.enable_context.then(|| context.app.clone()),
            window_title: self.options.enable_context.then(|| context.title.clone()),
            ocr_text,
            ocr_confidence: extraction.confidence(),
        };
        let record = repository::insert_screenshot(&self.lock_db(), &new)?;
        info!("saved {} as record {}", record.file_name, record.id);
        Ok(Outcome::Ingested(record))
    }

    fn capture_context(&self, file: &str) -> WindowContext {
        if !self.options.enable_context {
            return WindowContext::unknown();
        }
        guarded("context lookup", file, || self.context.active_window())
            .unwrap_or_else(WindowContext::unknown)
    }

    fn extract_text(&self, path: &Path, file: &str) -> Extraction {
        if !self.options.enable_ocr {
            return Extraction::Unavailable("disabled".to_string());
        }
        let extraction = guarded("text extraction", file, || self.extractor.extract(path))
            .unwrap_or_else(|| Extraction::Failed("extractor panicked".to_string()));
        match &extraction {
            Extraction::Unavailable(reason) => debug!("OCR unavailable for {file}: {reason}"),
            Extraction::Failed(reason) => warn!("OCR failed for {file}: {reason}"),
            Extraction::Text { .. } => {}
        }
        extraction
    }

    fn categorize(&self, text: Option<&str>, context: &WindowContext, file: &str) -> Option<String> {
        if !self.options.enable_categorize {
            return None;
        }
        let (category, score) = guarded("categorization", file, || {
            self.categorizer.categorize(
                text.unwrap_or_default(),
                &context.app,
                &context.title,
                self.options.min_confidence,
            )
        })
        .unwrap_or_else(|| (UNCATEGORIZED.to_string(), 0.0));
        debug!("{file} categorized as {category} ({score:.2})");
        Some(category)
    }

    fn rename(&self, current: &Path, context: &WindowContext, text: Option<&str>, file: &str) -> PathBuf {
        let text = if self.options.enable_ocr { text } else { None };
        let Some(stem) = guarded("filename synthesis", file, || {
            self.synthesizer.synthesize(current, context, text)
        }) else {
            return current.to_path_buf();
        };
        if stem.is_empty() {
            return current.to_path_buf();
        }

        match file_service::rename_unique(current, &stem, Some(self.synthesizer.max_length())) {
            Ok(renamed) => {
                if renamed != current {
                    info!("renamed {file} to {}", display_name(&renamed));
                }
                renamed
            }
            Err(e) => {
                warn!("rename failed for {file}: {e}");
                current.to_path_buf()
            }
        }
    }

    fn category_dir(&mut self, category: &str) -> Result<PathBuf, AppError> {
        if let Some(dir) = self.category_dirs.get(category) {
            if dir.is_dir() {
                return Ok(dir.clone());
            }
        }
        let dir_name = sanitize_fragment(category, MAX_CATEGORY_DIR_CHARS);
        if dir_name.is_empty() {
            return Err(AppError::General(format!(
                "category {category:?} has no usable directory name"
            )));
        }
        let dir = self.watch_root.join(dir_name);
        std::fs::create_dir_all(&dir)?;
        self.category_dirs.insert(category.to_string(), dir.clone());
        Ok(dir)
    }

    fn move_to_category(&mut self, current: &Path, category: &str, file: &str) -> PathBuf {
        let moved = self
            .category_dir(category)
            .and_then(|dir| {
                file_service::move_into_dir(current, &dir, Some(self.synthesizer.max_length()))
            });
        match moved {
            Ok(moved) => {
                if moved != current {
                    info!("moved {file} into category {category}");
                }
                moved
            }
            Err(e) => {
                warn!("could not move {file} into {category}: {e}");
                current.to_path_buf()
            }
        }
    }
}
