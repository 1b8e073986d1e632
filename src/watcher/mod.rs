//! Watcher module for VRChat output logs.
//!
//! Locates the active log file, tails it incrementally, and turns log
//! lines into video playback events.

mod discovery;
mod error;
mod extractor;
mod log_watcher;
mod tailer;

pub use discovery::{default_log_dir, find_latest_log};
pub use error::WatcherError;
pub use extractor::{Extractor, LogEvent};
pub use log_watcher::{LogWatcher, WatchSignal};
pub use tailer::LogTailer;
