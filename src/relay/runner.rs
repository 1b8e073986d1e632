//! Relay dispatch loop and log rotation handling.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::watcher::{
    default_log_dir, find_latest_log, Extractor, LogEvent, LogTailer, LogWatcher, WatchSignal,
    WatcherError,
};

use super::reconciler::Reconciler;

/// Startup-fatal relay errors.
#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    /// The VRChat log directory could not be determined.
    #[error("Could not determine the VRChat log directory")]
    NoLogDir,

    /// No log files exist at startup.
    #[error("No VRChat log files found in {0}")]
    NoLogFiles(PathBuf),

    /// Watcher subsystem failed to initialize.
    #[error(transparent)]
    Watcher(#[from] WatcherError),
}

/// The relay: tails the newest VRChat log and feeds every event through
/// the reconciler.
///
/// All events are processed on this single loop, so no two pushes ever
/// race on the published state. A periodic poll detects rotation; signals
/// from a rotated-away watch registration carry a stale generation and
/// are discarded.
pub struct Relay {
    reconciler: Reconciler,
    extractor: Extractor,
    watcher: LogWatcher,
    signal_rx: tokio::sync::mpsc::UnboundedReceiver<WatchSignal>,
    tailer: Option<LogTailer>,
    current_path: Option<PathBuf>,
    generation: u64,
    log_dir: PathBuf,
    poll_interval: Duration,
}

impl Relay {
    /// Create a relay from the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the log directory cannot be determined, the
    /// patterns fail to compile, or the file watcher cannot be created.
    /// All of these are startup-fatal.
    pub fn new(config: &RelayConfig, reconciler: Reconciler) -> Result<Self, RelayError> {
        let log_dir = config
            .log_dir
            .clone()
            .or_else(default_log_dir)
            .ok_or(RelayError::NoLogDir)?;
        let extractor = Extractor::new()?;
        let (watcher, signal_rx) = LogWatcher::new()?;

        Ok(Self {
            reconciler,
            extractor,
            watcher,
            signal_rx,
            tailer: None,
            current_path: None,
            generation: 0,
            log_dir,
            poll_interval: config.poll_interval,
        })
    }

    /// Run until cancelled.
    ///
    /// Attaches to the newest log file, replays it for the initial push,
    /// then dispatches on change signals and rotation polls. On
    /// cancellation a final clear is pushed downstream before returning.
    ///
    /// # Errors
    ///
    /// Returns an error when no log file exists at startup.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), RelayError> {
        let initial = find_latest_log(&self.log_dir)
            .ok_or_else(|| RelayError::NoLogFiles(self.log_dir.clone()))?;
        tracing::info!(path = %initial.display(), "Monitoring VRChat log file");
        self.attach(initial).await;

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => self.check_rotation().await,
                Some(signal) = self.signal_rx.recv() => self.handle_signal(signal).await,
            }
        }

        tracing::info!("Shutting down, clearing OBS input");
        self.reconciler.on_event(LogEvent::SessionEnded).await;
        Ok(())
    }

    /// Hand the watch registration to `path` and replay it from the start.
    async fn attach(&mut self, path: PathBuf) {
        match self.watcher.watch(&path) {
            Ok(generation) => self.generation = generation,
            Err(e) => {
                // The old registration is already gone; tailing has a gap
                // until the next successful poll.
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to register watch, will retry on next poll"
                );
                self.tailer = None;
                self.current_path = None;
                return;
            }
        }

        self.current_path = Some(path.clone());
        let mut tailer = LogTailer::new(path, self.extractor.clone());
        match tailer.replay().await {
            Ok(initial_state) => {
                self.reconciler.on_event(initial_state).await;
                self.tailer = Some(tailer);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to replay log file, tailing stopped for it");
                self.tailer = None;
            }
        }
    }

    /// One rotation poll: switch to a newer log file if one appeared.
    async fn check_rotation(&mut self) {
        let Some(latest) = find_latest_log(&self.log_dir) else {
            tracing::warn!(dir = %self.log_dir.display(), "No VRChat log files found");
            return;
        };

        if self.current_path.as_deref() == Some(latest.as_path()) {
            return;
        }

        tracing::info!(path = %latest.display(), "New log file detected, switching");
        self.attach(latest).await;
    }

    /// One change signal: read appended lines and reconcile each event.
    async fn handle_signal(&mut self, signal: WatchSignal) {
        match signal {
            WatchSignal::Changed { path, generation } => {
                if generation != self.generation
                    || self.current_path.as_deref() != Some(path.as_path())
                {
                    tracing::debug!(
                        path = %path.display(),
                        generation,
                        "Discarding signal from rotated-away watch"
                    );
                    return;
                }

                let events = match self.tailer.as_mut() {
                    Some(tailer) => tailer.read_appended().await,
                    None => return,
                };

                match events {
                    Ok(events) => {
                        for event in events {
                            self.reconciler.on_event(event).await;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read appended log lines");
                    }
                }
            }
            WatchSignal::Error(e) => {
                tracing::warn!(error = %e, "Watcher error");
            }
        }
    }
}
