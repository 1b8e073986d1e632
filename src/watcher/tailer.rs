//! Incremental log file tailer.
//!
//! Reads new lines from a growing VRChat log and runs them through the
//! [`Extractor`]. Tracks a byte offset so lines are never consumed twice.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

use super::error::WatcherError;
use super::extractor::{Extractor, LogEvent};

/// Incremental line reader over a single log file.
///
/// Owns the read cursor for the file it watches. The cursor only moves
/// past *complete* lines; a trailing line without a terminator stays
/// unconsumed until a later append completes it. A rotation is handled by
/// replacing the tailer, not by mutating this one.
#[derive(Debug)]
pub struct LogTailer {
    /// Path to the log file.
    path: PathBuf,
    /// Current byte offset in the file.
    offset: u64,
    /// Line patterns.
    extractor: Extractor,
}

impl LogTailer {
    /// Create a new tailer for the given path, starting at offset 0.
    #[must_use]
    pub fn new(path: PathBuf, extractor: Extractor) -> Self {
        Self {
            path,
            offset: 0,
            extractor,
        }
    }

    /// Get the current byte offset.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Get the path being tailed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replay the file from the beginning and reduce it to the state that
    /// was true when the tailer attached.
    ///
    /// Later URL events overwrite earlier ones and a session-end marker
    /// resets the tracked URL, so the result is the *last* surviving state,
    /// not the full history: [`LogEvent::UrlResolved`] with the most recent
    /// URL, or [`LogEvent::SessionEnded`] when the log ended cleared (or
    /// never contained a URL). The cursor ends just past the last complete
    /// line; subsequent reads start there.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub async fn replay(&mut self) -> Result<LogEvent, WatcherError> {
        self.offset = 0;
        let events = self.consume_new_events().await?;

        let mut last_url: Option<String> = None;
        for event in events {
            match event {
                LogEvent::UrlResolved { url } => last_url = Some(url),
                LogEvent::SessionEnded => last_url = None,
            }
        }

        Ok(match last_url {
            Some(url) => LogEvent::UrlResolved { url },
            None => LogEvent::SessionEnded,
        })
    }

    /// Read events from lines appended since the last read, in line order.
    ///
    /// Lines matching neither pattern produce no event. If the file is now
    /// smaller than the cursor the cursor is reset to 0 and reading starts
    /// over from the beginning.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub async fn read_appended(&mut self) -> Result<Vec<LogEvent>, WatcherError> {
        self.consume_new_events().await
    }

    /// Read all complete lines from the current offset through the
    /// extractor, advancing the offset per line consumed.
    async fn consume_new_events(&mut self) -> Result<Vec<LogEvent>, WatcherError> {
        let file = match File::open(&self.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WatcherError::FileNotFound(self.path.clone()));
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(WatcherError::PermissionDenied(self.path.clone()));
            }
            Err(e) => return Err(WatcherError::Io(e)),
        };

        let file_len = file.metadata().await?.len();

        if file_len < self.offset {
            tracing::warn!(
                path = %self.path.display(),
                old_offset = self.offset,
                new_len = file_len,
                "Log file shrank, resetting offset to 0"
            );
            self.offset = 0;
        }

        if file_len == self.offset {
            return Ok(Vec::new());
        }

        let mut file = file;
        file.seek(std::io::SeekFrom::Start(self.offset)).await?;

        let mut reader = BufReader::new(file);
        let mut events = Vec::new();
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                break;
            }

            // A chunk without a terminator is a line still being written;
            // leave it for the next read.
            if !line.ends_with('\n') {
                break;
            }

            self.offset += bytes_read as u64;

            if let Some(event) = self.extractor.extract(line.trim_end()) {
                events.push(event);
            }
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn url_line(url: &str) -> String {
        format!("[Video Playback] URL 'original' resolved to '{url}'")
    }

    fn tailer(path: &Path) -> LogTailer {
        LogTailer::new(path.to_path_buf(), Extractor::new().unwrap())
    }

    #[tokio::test]
    async fn test_replay_keeps_last_url() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", url_line("https://a/1")).unwrap();
        writeln!(file, "some unrelated line").unwrap();
        writeln!(file, "{}", url_line("https://a/2")).unwrap();
        file.flush().unwrap();

        let mut tailer = tailer(file.path());
        let state = tailer.replay().await.unwrap();

        assert_eq!(
            state,
            LogEvent::UrlResolved {
                url: "https://a/2".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_replay_session_end_clears_url() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", url_line("https://a/1")).unwrap();
        writeln!(file, "VRCApplication: HandleApplicationQuit").unwrap();
        file.flush().unwrap();

        let mut tailer = tailer(file.path());
        assert_eq!(tailer.replay().await.unwrap(), LogEvent::SessionEnded);
    }

    #[tokio::test]
    async fn test_replay_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let mut tailer = tailer(file.path());
        assert_eq!(tailer.replay().await.unwrap(), LogEvent::SessionEnded);
        assert_eq!(tailer.offset(), 0);
    }

    #[tokio::test]
    async fn test_replay_then_append_emits_only_new_events() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", url_line("https://a/1")).unwrap();
        writeln!(file, "{}", url_line("https://a/2")).unwrap();
        file.flush().unwrap();

        let mut tailer = tailer(file.path());

        // Replay collapses history to the last URL; /1 is never emitted.
        let state = tailer.replay().await.unwrap();
        assert_eq!(
            state,
            LogEvent::UrlResolved {
                url: "https://a/2".to_string()
            }
        );

        // Nothing appended yet.
        assert!(tailer.read_appended().await.unwrap().is_empty());

        writeln!(file, "{}", url_line("https://a/3")).unwrap();
        file.flush().unwrap();

        let events = tailer.read_appended().await.unwrap();
        assert_eq!(
            events,
            vec![LogEvent::UrlResolved {
                url: "https://a/3".to_string()
            }]
        );

        // Already-consumed lines are never re-emitted.
        assert!(tailer.read_appended().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_line_left_unconsumed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", url_line("https://a/1")).unwrap();
        file.flush().unwrap();

        let mut tailer = tailer(file.path());
        tailer.replay().await.unwrap();
        let offset_after_replay = tailer.offset();

        // Write half a line with no terminator.
        write!(file, "[Video Playback] Resolving URL 'https://a/ha").unwrap();
        file.flush().unwrap();

        assert!(tailer.read_appended().await.unwrap().is_empty());
        assert_eq!(tailer.offset(), offset_after_replay);

        // Complete the line; it is now consumed as one event.
        writeln!(file, "lf'").unwrap();
        file.flush().unwrap();

        let events = tailer.read_appended().await.unwrap();
        assert_eq!(
            events,
            vec![LogEvent::UrlResolved {
                url: "https://a/half".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_appended_events_in_line_order() {
        let mut file = NamedTempFile::new().unwrap();
        file.flush().unwrap();

        let mut tailer = tailer(file.path());
        tailer.replay().await.unwrap();

        writeln!(file, "{}", url_line("https://a/1")).unwrap();
        writeln!(file, "[Behaviour] Successfully left room").unwrap();
        writeln!(file, "{}", url_line("https://a/2")).unwrap();
        file.flush().unwrap();

        let events = tailer.read_appended().await.unwrap();
        assert_eq!(
            events,
            vec![
                LogEvent::UrlResolved {
                    url: "https://a/1".to_string()
                },
                LogEvent::SessionEnded,
                LogEvent::UrlResolved {
                    url: "https://a/2".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_shrunk_file_resets_offset() {
        let path;
        {
            let file = NamedTempFile::new().unwrap();
            path = file.path().to_path_buf();
            let mut f = std::fs::File::create(&path).unwrap();
            writeln!(f, "{}", url_line("https://a/1")).unwrap();
            writeln!(f, "{}", url_line("https://a/2")).unwrap();
            file.keep().unwrap();
        }

        let mut tailer = LogTailer::new(path.clone(), Extractor::new().unwrap());
        tailer.replay().await.unwrap();
        let old_offset = tailer.offset();
        assert!(old_offset > 0);

        {
            let mut f = std::fs::File::create(&path).unwrap();
            writeln!(f, "{}", url_line("https://b/1")).unwrap();
        }

        let events = tailer.read_appended().await.unwrap();
        assert_eq!(
            events,
            vec![LogEvent::UrlResolved {
                url: "https://b/1".to_string()
            }]
        );
        assert!(tailer.offset() < old_offset);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_missing_file_reports_not_found() {
        let mut tailer = LogTailer::new(
            PathBuf::from("/tmp/nonexistent-output_log_1234.txt"),
            Extractor::new().unwrap(),
        );
        assert!(matches!(
            tailer.replay().await,
            Err(WatcherError::FileNotFound(_))
        ));
    }
}
