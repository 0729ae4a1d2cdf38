use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::services::ingest_service::Pipeline;

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Paths in `event` that should be treated as newly created files.
pub fn creation_paths(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => event.paths.clone(),
        // FSEvents reports renames without a direction; intake drops the
        // side that no longer exists.
        EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Any)) => {
            event.paths.clone()
        }
        // [from, to]
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().cloned().into_iter().collect()
        }
        _ => Vec::new(),
    }
}

/// Owns the OS watcher and the single worker thread feeding the pipeline.
pub struct ScreenshotWatcher {
    watch_path: PathBuf,
    pipeline: Option<Pipeline>,
    watcher: Option<RecommendedWatcher>,
    worker: Option<JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
}

impl ScreenshotWatcher {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            watch_path: pipeline.watch_root().to_path_buf(),
            pipeline: Some(pipeline),
            watcher: None,
            worker: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn watch_path(&self) -> &Path {
        &self.watch_path
    }

    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn start(&mut self) -> Result<(), AppError> {
        let Some(mut pipeline) = self.pipeline.take() else {
            return Err(AppError::Watcher("watcher was already started".to_string()));
        };

        if let Err(e) = std::fs::create_dir_all(&self.watch_path) {
            self.pipeline = Some(pipeline);
            return Err(AppError::Watcher(format!(
                "cannot create watch directory {}: {e}",
                self.watch_path.display()
            )));
        }

        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher = match RecommendedWatcher::new(
            move |result| {
                let _ = tx.send(result);
            },
            notify::Config::default(),
        ) {
            Ok(watcher) => watcher,
            Err(e) => {
                self.pipeline = Some(pipeline);
                return Err(e.into());
            }
        };
        if let Err(e) = watcher.watch(&self.watch_path, RecursiveMode::NonRecursive) {
            self.pipeline = Some(pipeline);
            return Err(e.into());
        }

        let stop_flag = self.stop_flag.clone();
        let worker = std::thread::Builder::new()
            .name("shotwise-worker".to_string())
            .spawn(move || {
                while !stop_flag.load(Ordering::SeqCst) {
                    match rx.recv_timeout(STOP_POLL_INTERVAL) {
                        Ok(Ok(event)) => {
                            debug!("watch event: {:?} {:?}", event.kind, event.paths);
                            pipeline.handle_event(&event);
                        }
                        Ok(Err(e)) => error!("watcher error: {e:?}"),
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("worker exited");
            })?;

        info!("watching {}", self.watch_path.display());
        self.watcher = Some(watcher);
        self.worker = Some(worker);
        Ok(())
    }

    /// Stops accepting notifications. The event in flight still completes.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if self.watcher.take().is_some() {
            info!("stopped watching {}", self.watch_path.display());
        }
    }

    /// Blocks until the worker has finished its current event.
    pub fn await_idle(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("worker thread panicked");
            }
        }
    }
}

impl Drop for ScreenshotWatcher {
    fn drop(&mut self) {
        self.stop();
        self.await_idle();
    }
}
