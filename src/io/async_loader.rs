//! Asynchronous dataset loading.
//!
//! Parsing a large dataset file (or generating a demo one) happens on a
//! background thread so the viewer keeps repainting meanwhile.

use eframe::egui;
use rvtable::{generate_demo, Dataset, DemoOptions};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread;

/// Result of a finished load.
pub enum LoadResult {
    Success {
        dataset: Dataset,
        /// Source file; `None` for generated data
        path: Option<PathBuf>,
    },
    Error(String),
    /// Nothing finished since the last check
    None,
}

/// Runs one dataset load at a time off the UI thread.
pub struct AsyncLoader {
    in_progress: Arc<AtomicBool>,
    receiver: Option<Receiver<Result<Dataset, String>>>,
    pending_path: Option<PathBuf>,
}

impl AsyncLoader {
    pub fn new() -> Self {
        Self {
            in_progress: Arc::new(AtomicBool::new(false)),
            receiver: None,
            pending_path: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Starts reading a dataset file.
    ///
    /// # Arguments
    /// * `path` - JSON dataset to read
    /// * `ctx` - Context to repaint once the load finishes
    pub fn start_file_load(&mut self, path: PathBuf, ctx: &egui::Context) {
        self.pending_path = Some(path.clone());
        self.spawn(ctx, move || Dataset::load(&path).map_err(|e| e.to_string()));
    }

    /// Starts generating a demo dataset.
    pub fn start_demo(&mut self, options: DemoOptions, ctx: &egui::Context) {
        self.pending_path = None;
        self.spawn(ctx, move || Ok(generate_demo(&options)));
    }

    fn spawn<F>(&mut self, ctx: &egui::Context, job: F)
    where
        F: FnOnce() -> Result<Dataset, String> + Send + 'static,
    {
        let (sender, receiver) = channel();
        self.receiver = Some(receiver);
        self.in_progress.store(true, Ordering::SeqCst);

        let in_progress = Arc::clone(&self.in_progress);
        let ctx = ctx.clone();
        thread::spawn(move || {
            let _ = sender.send(job());
            in_progress.store(false, Ordering::SeqCst);
            ctx.request_repaint();
        });
    }

    /// Returns the finished load, if any. Call once per frame.
    pub fn check_completion(&mut self) -> LoadResult {
        let Some(receiver) = &self.receiver else {
            return LoadResult::None;
        };
        let Ok(result) = receiver.try_recv() else {
            return LoadResult::None;
        };
        self.receiver = None;
        match result {
            Ok(dataset) => LoadResult::Success {
                dataset,
                path: self.pending_path.take(),
            },
            Err(message) => {
                self.pending_path = None;
                LoadResult::Error(message)
            }
        }
    }
}

impl Default for AsyncLoader {
    fn default() -> Self {
        Self::new()
    }
}
