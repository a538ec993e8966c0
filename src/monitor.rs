// Background change detection for watched folders.
//
// A monitor pass walks every watched folder recursively and calls `put`
// for each file that is new or whose fence is stale. Managed files under a
// watched folder that no longer exist are dropped from the store. The
// store root itself is never walked.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::hash::rolling::{Hasher, RollingHash};
use crate::store::{StoreError, VersionedResourceStore};

/// Counters from one pass over the watched folders.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    /// Files looked at.
    pub scanned: usize,
    /// Files handed to `put` (new or changed).
    pub updated: usize,
    /// Managed resources dropped because their file vanished.
    pub removed: usize,
    /// Files or folders that could not be processed.
    pub failed: usize,
}

impl PassReport {
    fn absorb(&mut self, other: PassReport) {
        self.scanned += other.scanned;
        self.updated += other.updated;
        self.removed += other.removed;
        self.failed += other.failed;
    }
}

pub struct ResourceMonitor<H = RollingHash> {
    store: Arc<VersionedResourceStore<H>>,
    folders: Vec<PathBuf>,
    /// Canonical store root, skipped while walking.
    store_root: PathBuf,
}

impl<H> ResourceMonitor<H>
where
    H: Hasher + Clone + Send + Sync + 'static,
{
    /// Watched folders and the store root are canonicalized once, so `..`
    /// components and symlinks cannot hide the store root from the walk.
    pub fn new(store: Arc<VersionedResourceStore<H>>, folders: Vec<PathBuf>) -> Self {
        let folders = folders.into_iter().map(|f| canonical(&f)).collect();
        let store_root = canonical(store.root());
        Self {
            store,
            folders,
            store_root,
        }
    }

    pub fn folders(&self) -> &[PathBuf] {
        &self.folders
    }

    /// One synchronous pass over all watched folders.
    pub fn check_folders(&self) -> PassReport {
        let mut report = PassReport::default();
        for folder in &self.folders {
            if !folder.is_dir() {
                log::warn!("watched folder {} is not a directory", folder.display());
                report.failed += 1;
                continue;
            }
            report.absorb(self.walk(folder));
        }
        report.removed = self.drop_vanished();
        report
    }

    /// Run passes on a background thread, `interval` apart, until the
    /// returned handle is stopped or dropped.
    pub fn spawn(self, interval: Duration) -> io::Result<MonitorHandle> {
        self.spawn_with_limit(interval, None)
    }

    /// Like [`spawn`](Self::spawn), but the thread also ends on its own
    /// after `limit` passes.
    pub fn spawn_limited(self, interval: Duration, limit: usize) -> io::Result<MonitorHandle> {
        self.spawn_with_limit(interval, Some(limit))
    }

    fn spawn_with_limit(
        self,
        interval: Duration,
        limit: Option<usize>,
    ) -> io::Result<MonitorHandle> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("diffable-monitor".into())
            .spawn(move || {
                let mut passes = 0usize;
                loop {
                    let report = self.check_folders();
                    passes += 1;
                    log::debug!("monitor pass {passes}: {report:?}");
                    if limit.is_some_and(|limit| passes >= limit) {
                        break;
                    }
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                passes
            })?;
        Ok(MonitorHandle {
            stop: stop_tx,
            thread,
        })
    }

    fn walk(&self, dir: &Path) -> PassReport {
        let mut report = PassReport::default();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("cannot list {}: {e}", dir.display());
                report.failed += 1;
                return report;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                report.failed += 1;
                continue;
            };
            if file_type.is_dir() {
                if path == self.store_root {
                    continue;
                }
                report.absorb(self.walk(&path));
            } else if file_type.is_file() {
                report.scanned += 1;
                match self.check_file(&path) {
                    Ok(true) => report.updated += 1,
                    Ok(false) => {}
                    Err(e) => {
                        log::error!("cannot update {}: {e}", path.display());
                        report.failed += 1;
                    }
                }
            }
        }
        report
    }

    fn check_file(&self, path: &Path) -> Result<bool, StoreError> {
        let stale = match self.store.has_changed(path) {
            Ok(changed) => changed,
            Err(StoreError::NotManaged(_)) => true,
            Err(e) => return Err(e),
        };
        if stale {
            self.store.put(path)?;
        }
        Ok(stale)
    }

    fn drop_vanished(&self) -> usize {
        let mut removed = 0;
        for path in self.store.get_managed_resources() {
            let watched = self.folders.iter().any(|f| path.starts_with(f));
            if !watched || path.exists() {
                continue;
            }
            match self.store.delete_resource(&path) {
                Ok(()) => removed += 1,
                Err(e) => log::error!("cannot drop {}: {e}", path.display()),
            }
        }
        removed
    }
}

/// Handle to a running monitor thread.
#[derive(Debug)]
pub struct MonitorHandle {
    stop: Sender<()>,
    thread: JoinHandle<usize>,
}

impl MonitorHandle {
    /// Signal the thread and wait for it. A pass in progress finishes
    /// first. Returns the number of passes run.
    pub fn stop(self) -> usize {
        let _ = self.stop.send(());
        self.join()
    }

    /// Wait for a limited monitor to finish on its own.
    pub fn join(self) -> usize {
        match self.thread.join() {
            Ok(passes) => passes,
            Err(_) => {
                log::error!("monitor thread panicked");
                0
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
