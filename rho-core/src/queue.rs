//! File queue and build scheduler.
//!
//! Builds run one file at a time. A one-shot build drains the queue
//! synchronously; watch mode drains it cooperatively on a tokio runtime,
//! folding change events into the queue between files.

use crate::builder::{BuildContext, BuildError};
use crate::config::Config;
use crate::logic::logic_target;
use crate::models::DrainReport;
use crate::render::TemplateRenderer;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};

/// Messages fed to a cooperative drain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// A file was created or modified
    Changed(PathBuf),
    Shutdown,
}

/// FIFO of pending paths; a path already waiting is not queued twice
#[derive(Debug, Default)]
pub struct FileQueue {
    order: VecDeque<PathBuf>,
    pending: HashSet<PathBuf>,
}

impl FileQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the path was already pending
    pub fn push(&mut self, path: PathBuf) -> bool {
        if !self.pending.insert(path.clone()) {
            return false;
        }
        self.order.push_back(path);
        true
    }

    pub fn pop(&mut self) -> Option<PathBuf> {
        let path = self.order.pop_front()?;
        self.pending.remove(&path);
        Some(path)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Owns the build context and feeds it queued files
pub struct Scheduler<R> {
    ctx: BuildContext<R>,
    queue: FileQueue,
    report: DrainReport,
}

impl<R: TemplateRenderer> Scheduler<R> {
    pub fn new(ctx: BuildContext<R>) -> Self {
        Self {
            ctx,
            queue: FileQueue::new(),
            report: DrainReport::default(),
        }
    }

    pub fn context(&self) -> &BuildContext<R> {
        &self.ctx
    }

    pub fn queue(&self) -> &FileQueue {
        &self.queue
    }

    pub fn enqueue(&mut self, path: PathBuf) -> bool {
        self.queue.push(path)
    }

    /// Queue the entire content tree
    pub fn enqueue_all(&mut self) -> Result<usize, BuildError> {
        let files = self.ctx.content_files()?;
        let count = files.len();
        for file in files {
            self.queue.push(file);
        }
        tracing::debug!("Queued {} content files", count);
        Ok(count)
    }

    /// Process the next queued file; false when the queue was empty.
    ///
    /// Per-file errors are logged and recorded in the report; only fatal
    /// errors are returned.
    pub fn tick(&mut self) -> Result<bool, BuildError> {
        let Some(path) = self.queue.pop() else {
            return Ok(false);
        };

        match self.ctx.process(&path) {
            Ok(outcome) => self.report.record(&outcome),
            Err(err) if err.is_fatal() => {
                tracing::error!("Aborting build at {:?}: {}", path, err);
                return Err(err);
            }
            Err(err) => {
                tracing::error!("Failed to build {:?}: {}", path, err);
                self.report.record_failure(path, err.to_string());
            }
        }
        Ok(true)
    }

    /// Drain the queue to empty and hand back what happened
    pub fn drain(&mut self) -> Result<DrainReport, BuildError> {
        while self.tick()? {}
        Ok(std::mem::take(&mut self.report))
    }

    /// React to a file-system change.
    ///
    /// Content files are queued on their own (a logic module queues the file
    /// it belongs to), unless a full walk would skip them. A change to the
    /// configuration file reloads it into the build context. Anything else
    /// invalidates templates and cache. Both re-queue the whole tree.
    pub fn on_change(&mut self, path: &Path) -> Result<(), BuildError> {
        if !path.exists() {
            tracing::debug!("Ignoring removed {:?}", path);
            return Ok(());
        }

        if let Some(config_path) = self.ctx.config().config_path() {
            if same_file(path, config_path) {
                let config_path = config_path.to_path_buf();
                return self.reload_config(&config_path);
            }
        }

        if let Some(rel) = relative_to(path, self.ctx.content_dir()) {
            if path.is_dir() {
                return Ok(());
            }
            let full = self.ctx.content_dir().join(rel);
            if !self.ctx.admits(&full) {
                tracing::debug!("Ignoring {:?}", full);
                return Ok(());
            }
            let target = logic_target(&full)
                .filter(|t| t.exists())
                .unwrap_or(full);
            tracing::info!("Changed {:?}", target);
            self.queue.push(target);
            return Ok(());
        }

        tracing::info!("Changed {:?}, rebuilding everything", path);
        if let Err(err) = self.ctx.reload() {
            tracing::error!("Failed to reload templates: {}", err);
        }
        self.queue.clear();
        self.enqueue_all()?;
        Ok(())
    }

    fn reload_config(&mut self, config_path: &Path) -> Result<(), BuildError> {
        let config = match Config::from_file_or_default(config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::error!("Keeping previous configuration: {}", err);
                return Ok(());
            }
        };

        tracing::info!("Configuration {:?} changed, rebuilding everything", config_path);
        if let Err(err) = self.ctx.reconfigure(config) {
            tracing::error!("Failed to reload templates: {}", err);
        }
        self.queue.clear();
        self.enqueue_all()?;
        Ok(())
    }

    /// Drain cooperatively until shutdown.
    ///
    /// One file is processed per tick, with a yield to the runtime in
    /// between. `on_empty` runs each time the queue becomes empty and gets the
    /// build context plus the report for the files processed since the
    /// previous call. Returns on [`SchedulerEvent::Shutdown`], or once the
    /// channel is closed and the queue is empty.
    pub async fn run_cooperative<F>(
        &mut self,
        mut events: UnboundedReceiver<SchedulerEvent>,
        mut on_empty: F,
    ) -> Result<(), BuildError>
    where
        F: FnMut(&BuildContext<R>, DrainReport),
    {
        let mut idle_reported = false;
        let mut closed = false;

        loop {
            while !closed {
                match events.try_recv() {
                    Ok(SchedulerEvent::Changed(path)) => self.on_change(&path)?,
                    Ok(SchedulerEvent::Shutdown) => return Ok(()),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => closed = true,
                }
            }

            if self.tick()? {
                idle_reported = false;
                tokio::task::yield_now().await;
                continue;
            }

            if !idle_reported {
                on_empty(&self.ctx, std::mem::take(&mut self.report));
                idle_reported = true;
            }
            if closed {
                return Ok(());
            }

            match events.recv().await {
                Some(SchedulerEvent::Changed(path)) => self.on_change(&path)?,
                Some(SchedulerEvent::Shutdown) | None => return Ok(()),
            }
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// `path` relative to `root`, also trying canonical forms of both
fn relative_to(path: &Path, root: &Path) -> Option<PathBuf> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_path_buf());
    }
    let path = path.canonicalize().ok()?;
    let root = root.canonicalize().ok()?;
    path.strip_prefix(&root).ok().map(Path::to_path_buf)
}
