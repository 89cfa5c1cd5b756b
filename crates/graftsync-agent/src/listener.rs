//! OS filesystem watcher feeding the path pool.
//!
//! One [`FileSystemListener`] watches one local root recursively. It only
//! reports files: directory events are dropped, and deletions are left to the
//! snapshot stage, which sees the file as missing when a later change arrives.
//!
//! When the OS reports that events were lost, the listener records a
//! [`DiagnosticEvent::WatcherBufferOverflow`] and walks the whole root, adding
//! every file to the pool.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use graftsync_hier::{DiagnosticEvent, DiagnosticsSink, LocalRoot};
use graftsync_route::FileSystemPathPool;
use notify::event::{MetadataKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::error::AgentResult;

/// Watches one local root and adds changed file paths to the pool.
pub struct FileSystemListener {
    root: LocalRoot,
    context: Arc<ListenerContext>,
    _watcher: RecommendedWatcher,
}

impl FileSystemListener {
    /// Start watching `root`. Events stop when the listener is dropped.
    pub fn start(
        root: LocalRoot,
        pool: Arc<FileSystemPathPool>,
        diagnostics: Arc<dyn DiagnosticsSink>,
        rescan_on_overflow: bool,
    ) -> AgentResult<Self> {
        let context = Arc::new(ListenerContext {
            root_path: PathBuf::from(root.path()),
            pool,
            diagnostics,
            rescan_on_overflow,
        });
        let callback_context = Arc::clone(&context);
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            callback_context.handle(result);
        })?;
        watcher.watch(Path::new(root.path()), RecursiveMode::Recursive)?;
        info!(root = %root, "watching local root");
        Ok(Self {
            root,
            context,
            _watcher: watcher,
        })
    }

    /// The watched root.
    pub fn root(&self) -> &LocalRoot {
        &self.root
    }

    /// Walk the root and add every file to the pool. Returns how many were added.
    pub fn rescan(&self) -> usize {
        self.context.rescan()
    }
}

struct ListenerContext {
    root_path: PathBuf,
    pool: Arc<FileSystemPathPool>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    rescan_on_overflow: bool,
}

impl ListenerContext {
    fn handle(&self, result: notify::Result<Event>) {
        let event = match result {
            Ok(event) => event,
            Err(err) => {
                warn!(root = %self.root_path.display(), error = %err, "watcher error");
                self.diagnostics.record(DiagnosticEvent::UnexpectedError {
                    context: format!("watching {}", self.root_path.display()),
                    error: err.to_string(),
                });
                return;
            }
        };
        if event.need_rescan() {
            self.diagnostics.record(DiagnosticEvent::WatcherBufferOverflow {
                root: self.root_path.display().to_string(),
            });
            if self.rescan_on_overflow {
                self.rescan();
            }
        }
        for path in changed_paths(&event) {
            if path.is_dir() {
                continue;
            }
            self.add(path);
        }
    }

    fn add(&self, path: &Path) {
        match path.to_str() {
            Some(text) => self.pool.add(text),
            None => debug!(path = %path.display(), "ignoring non-UTF-8 path"),
        }
    }

    fn rescan(&self) -> usize {
        let files = walk_files(&self.root_path);
        let count = files.len();
        for file in &files {
            self.add(file);
        }
        info!(root = %self.root_path.display(), files = count, "rescanned local root");
        count
    }
}

/// Paths in `event` which may now hold new content.
fn changed_paths(event: &Event) -> Vec<&Path> {
    let all: Vec<&Path> = event.paths.iter().map(PathBuf::as_path).collect();
    match event.kind {
        EventKind::Create(_) => all,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => all,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => all.get(1).copied().into_iter().collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(_)) => {
            all.into_iter().filter(|path| path.exists()).collect()
        }
        EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime)) => Vec::new(),
        EventKind::Modify(_) => all,
        _ => Vec::new(),
    }
}

/// Every non-directory entry under `root`. Unreadable directories are skipped.
fn walk_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(path = %dir.display(), error = %err, "skipping unreadable directory");
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            match entry.file_type() {
                Ok(kind) if kind.is_dir() => pending.push(path),
                Ok(_) => files.push(path),
                Err(_) => {}
            }
        }
    }
    files.sort();
    files
}
