//! Log file discovery.
//!
//! Locates VRChat output logs on disk. VRChat writes one
//! `output_log_<timestamp>.txt` per launch into a fixed per-user
//! directory and keeps appending to the newest one.

use std::path::{Path, PathBuf};

/// The default VRChat log directory for the current user.
///
/// VRChat writes logs to `~/AppData/LocalLow/VRChat/VRChat` (the Unity
/// player log location). Returns `None` if the home directory cannot be
/// determined.
#[must_use]
pub fn default_log_dir() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(
        home.join("AppData")
            .join("LocalLow")
            .join("VRChat")
            .join("VRChat"),
    )
}

/// Check whether a file name matches the VRChat log naming scheme.
fn is_log_file(name: &str) -> bool {
    name.starts_with("output_log_") && name.ends_with(".txt")
}

/// Find the most recently modified VRChat log in a directory.
///
/// Searches for `output_log_*.txt` files and returns the one with the
/// latest modification time. Ties on modification time are broken by the
/// lexicographically greatest path so repeated scans stay deterministic.
///
/// Returns `None` if no log files are found or the directory cannot
/// be read.
#[must_use]
pub fn find_latest_log(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;

    entries
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(is_log_file)
        })
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            let modified = metadata.modified().ok()?;
            Some((entry.path(), modified))
        })
        .max_by_key(|(path, modified)| (*modified, path.clone()))
        .map(|(path, _)| path)
}
