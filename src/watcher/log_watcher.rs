//! Change notification for the watched log file.
//!
//! Bridges notify file system events into a tokio channel consumed by the
//! relay dispatch loop. Each signal is tagged with a generation counter so
//! events still in flight from a rotated-away file can be discarded.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify_debouncer_full::{
    new_debouncer,
    notify::{EventKind, RecommendedWatcher, RecursiveMode},
    DebounceEventResult, Debouncer, RecommendedCache,
};
use tokio::sync::mpsc;

use super::error::WatcherError;

/// A signal emitted by the log watcher.
#[derive(Debug)]
pub enum WatchSignal {
    /// The watched file changed (modify or create).
    Changed {
        /// Path the event was reported for.
        path: PathBuf,
        /// Generation the watch registration belonged to when the event
        /// fired. Signals with a stale generation must be discarded.
        generation: u64,
    },
    /// The underlying watcher reported an error.
    Error(WatcherError),
}

/// Watches a single log file for appends, one registration at a time.
///
/// [`LogWatcher::watch`] atomically hands the registration over to a new
/// path: the old path is deregistered, the generation counter is bumped,
/// and the new path registered. Signals tagged with an older generation
/// belong to the previous file.
pub struct LogWatcher {
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    generation: Arc<AtomicU64>,
    watched: Option<PathBuf>,
}

impl LogWatcher {
    /// Create a new log watcher and the channel its signals arrive on.
    ///
    /// # Errors
    ///
    /// Returns an error if the file watcher cannot be created. This is
    /// fatal at startup: without change notification nothing gets tailed.
    pub fn new() -> Result<(Self, mpsc::UnboundedReceiver<WatchSignal>), WatcherError> {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let generation = Arc::new(AtomicU64::new(0));
        let callback_generation = Arc::clone(&generation);

        let debouncer = new_debouncer(
            Duration::from_millis(100),
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let generation = callback_generation.load(Ordering::SeqCst);
                    for event in &events {
                        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                            continue;
                        }
                        for path in &event.paths {
                            let _ = signal_tx.send(WatchSignal::Changed {
                                path: path.clone(),
                                generation,
                            });
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        let _ = signal_tx.send(WatchSignal::Error(WatcherError::Notify(error)));
                    }
                }
            },
        )?;

        Ok((
            Self {
                debouncer,
                generation,
                watched: None,
            },
            signal_rx,
        ))
    }

    /// The generation of the current watch registration.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// The currently registered path, if any.
    #[must_use]
    pub fn watched(&self) -> Option<&Path> {
        self.watched.as_deref()
    }

    /// Register `path` as the watched file, replacing any previous
    /// registration.
    ///
    /// Returns the new generation. If registering the new path fails the
    /// old registration is already gone; the caller retries on its next
    /// rotation tick and tailing has a coverage gap until then.
    ///
    /// # Errors
    ///
    /// Returns an error if the new path cannot be registered.
    pub fn watch(&mut self, path: &Path) -> Result<u64, WatcherError> {
        if let Some(old) = self.watched.take() {
            if let Err(e) = self.debouncer.unwatch(&old) {
                tracing::debug!(
                    path = %old.display(),
                    error = %e,
                    "Failed to deregister old log file"
                );
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.debouncer.watch(path, RecursiveMode::NonRecursive)?;
        self.watched = Some(path.to_path_buf());
        Ok(generation)
    }
}
