//! Pattern matching over VRChat log lines.
//!
//! Turns raw log lines into [`LogEvent`]s: a resolved video URL or a
//! session-end marker (application quit / left room).

use regex::Regex;

use super::error::WatcherError;

/// An event extracted from a single log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// The video player resolved (or started resolving) a URL.
    UrlResolved {
        /// The captured URL, exactly as it appeared in the log.
        url: String,
    },
    /// The session ended: VRChat quit or the user left the room.
    SessionEnded,
}

/// Extracts [`LogEvent`]s from VRChat log lines.
///
/// Holds the compiled patterns; cheap to clone once built.
#[derive(Debug, Clone)]
pub struct Extractor {
    url: Regex,
    session_end: Regex,
}

impl Extractor {
    /// Compile the extraction patterns.
    ///
    /// # Errors
    ///
    /// Returns `WatcherError::Pattern` if a pattern fails to compile.
    pub fn new() -> Result<Self, WatcherError> {
        Ok(Self {
            url: Regex::new(r"\[Video Playback\] (?:URL.*resolved to '|Resolving URL ')([^']+)'")?,
            session_end: Regex::new(
                r"VRCApplication: HandleApplicationQuit|\[Behaviour\] Successfully left room",
            )?,
        })
    }

    /// Extract an event from a single log line.
    ///
    /// The session-end marker takes precedence: a line matching it always
    /// yields [`LogEvent::SessionEnded`], regardless of any URL text on the
    /// same line. Returns `None` for lines matching neither pattern.
    ///
    /// The captured URL is everything up to the next `'`; no validation is
    /// performed on it.
    #[must_use]
    pub fn extract(&self, line: &str) -> Option<LogEvent> {
        if self.session_end.is_match(line) {
            return Some(LogEvent::SessionEnded);
        }
        self.url
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| LogEvent::UrlResolved {
                url: m.as_str().to_string(),
            })
    }
}
