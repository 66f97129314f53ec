//! Filesystem-as-queue ingestion: poll a directory, consume one descriptor per
//! scan, delete it and hand it to the dispatcher.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use jar_descriptor::{DecodeError, DESCRIPTOR_EXTENSION};
use log::{debug, info, warn};
use thiserror::Error;

use crate::capabilities::Stage;
use crate::dispatcher::{DispatchResult, EventDispatcher};

/// Upper bound on how long a stop request waits for the interval sleep.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    pub directory: PathBuf,
    /// Matched case-insensitively, without the leading dot.
    pub extension: String,
    pub interval: Duration,
    pub max_scans: Option<u64>,
}

impl WatchSettings {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            extension: DESCRIPTOR_EXTENSION.to_string(),
            interval: Duration::from_secs(1),
            max_scans: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watched directory {0} does not exist")]
    DirectoryMissing(PathBuf),
}

/// Why [`DirectoryWatcher::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    DirectoryMissing,
    Stopped,
    ScanLimitReached,
}

#[derive(Debug)]
pub enum Disposition {
    /// Blank file; nothing was dispatched.
    Empty,
    Processed(DispatchResult),
}

/// Result of one scan that found the directory present.
#[derive(Debug)]
pub enum ScanOutcome {
    Idle,
    ListingFailed(io::Error),
    /// The file stays in place and is retried after other descriptors.
    ReadFailed { path: PathBuf, error: io::Error },
    Consumed {
        path: PathBuf,
        /// False when the delete failed; the file is skipped by later scans.
        deleted: bool,
        disposition: Disposition,
    },
}

#[derive(Debug)]
pub struct DirectoryWatcher {
    settings: WatchSettings,
    scans: u64,
    /// Files whose last read failed; they go to the back of the queue.
    unreadable: BTreeSet<PathBuf>,
    /// Consumed files that could not be deleted; never dispatched again.
    undeletable: BTreeSet<PathBuf>,
}

impl DirectoryWatcher {
    pub fn new(settings: WatchSettings) -> Self {
        Self {
            settings,
            scans: 0,
            unreadable: BTreeSet::new(),
            undeletable: BTreeSet::new(),
        }
    }

    pub fn settings(&self) -> &WatchSettings {
        &self.settings
    }

    pub fn scans(&self) -> u64 {
        self.scans
    }

    /// Poll until the directory vanishes, `stop` is raised or the scan limit
    /// is reached.
    pub fn run<S: Stage>(
        &mut self,
        dispatcher: &mut EventDispatcher<S>,
        stop: &AtomicBool,
    ) -> WatchExit {
        info!(
            "watching {} for *.{} every {:?}",
            self.settings.directory.display(),
            self.settings.extension,
            self.settings.interval
        );
        loop {
            if stop.load(Ordering::Relaxed) {
                return WatchExit::Stopped;
            }
            if let Err(err) = self.scan_once(dispatcher) {
                warn!("{err}; watcher exiting");
                return WatchExit::DirectoryMissing;
            }
            if self
                .settings
                .max_scans
                .is_some_and(|limit| self.scans >= limit)
            {
                info!("scan limit of {} reached", self.scans);
                return WatchExit::ScanLimitReached;
            }
            if !sleep_unless_stopped(self.settings.interval, stop) {
                return WatchExit::Stopped;
            }
        }
    }

    /// Process at most one descriptor.
    pub fn scan_once<S: Stage>(
        &mut self,
        dispatcher: &mut EventDispatcher<S>,
    ) -> Result<ScanOutcome, WatchError> {
        let directory = &self.settings.directory;
        if !directory.is_dir() {
            return Err(WatchError::DirectoryMissing(directory.clone()));
        }
        self.scans += 1;

        let candidates = match descriptor_files(directory, &self.settings.extension) {
            Ok(candidates) => candidates,
            Err(error) => {
                warn!("listing {} failed: {error}", directory.display());
                return Ok(ScanOutcome::ListingFailed(error));
            }
        };
        let Some(path) = self.pick(candidates) else {
            return Ok(ScanOutcome::Idle);
        };

        let bytes = match fs::read(&path) {
            Ok(bytes) => {
                self.unreadable.remove(&path);
                bytes
            }
            Err(error) => {
                if self.unreadable.insert(path.clone()) {
                    warn!(
                        "reading {} failed: {error}; retrying after other descriptors",
                        path.display()
                    );
                } else {
                    debug!("reading {} failed again: {error}", path.display());
                }
                return Ok(ScanOutcome::ReadFailed { path, error });
            }
        };

        let deleted = match fs::remove_file(&path) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    "deleting {} failed: {err}; it will be skipped from now on",
                    path.display()
                );
                self.undeletable.insert(path.clone());
                false
            }
        };

        let disposition = match String::from_utf8(bytes) {
            Ok(text) if text.trim().is_empty() => {
                info!("skipping empty descriptor {}", path.display());
                Disposition::Empty
            }
            Ok(text) => {
                debug!("consuming {}", path.display());
                Disposition::Processed(dispatcher.dispatch_raw(&text))
            }
            Err(err) => {
                warn!("descriptor {} is not UTF-8: {err}", path.display());
                Disposition::Processed(DispatchResult::Rejected(DecodeError::MalformedPayload(
                    format!("payload is not valid UTF-8: {}", err.utf8_error()),
                )))
            }
        };

        Ok(ScanOutcome::Consumed {
            path,
            deleted,
            disposition,
        })
    }

    /// Next file to consume: fresh files first, then files whose read failed.
    /// Files that could not be deleted are never picked.
    fn pick(&mut self, candidates: Vec<PathBuf>) -> Option<PathBuf> {
        let present: BTreeSet<&PathBuf> = candidates.iter().collect();
        self.unreadable.retain(|path| present.contains(path));
        self.undeletable.retain(|path| present.contains(path));

        let mut retry = None;
        for path in candidates {
            if self.undeletable.contains(&path) {
                continue;
            }
            if !self.unreadable.contains(&path) {
                return Some(path);
            }
            retry.get_or_insert(path);
        }
        retry
    }
}

/// Regular files with a matching extension, in name order.
fn descriptor_files(directory: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches {
            candidates.push(path);
        }
    }
    candidates.sort();
    Ok(candidates)
}

/// Returns false if `stop` was raised before `duration` elapsed.
fn sleep_unless_stopped(duration: Duration, stop: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}
