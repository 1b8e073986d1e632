//! Reconciles extracted log events with the published OBS state.

use crate::watcher::LogEvent;

use super::publisher::Publisher;

/// Owner of the "current URL" state.
///
/// Every event flows through here on one sequential path, so at most one
/// push is in flight at a time. The tracked state reflects *intent*, not
/// confirmed delivery: a failed push is not rolled back, and the next
/// identical event simply re-asserts the state downstream.
pub struct Reconciler {
    publisher: Publisher,
    rtspt_replacement: String,
    current_url: Option<String>,
}

impl Reconciler {
    /// Create a reconciler publishing through `publisher`.
    #[must_use]
    pub fn new(publisher: Publisher, rtspt_replacement: impl Into<String>) -> Self {
        Self {
            publisher,
            rtspt_replacement: rtspt_replacement.into(),
            current_url: None,
        }
    }

    /// The URL last told to OBS, if any.
    #[must_use]
    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// Apply one event: update the tracked state and push it downstream.
    ///
    /// Downstream failures are logged and never fatal; the monitoring loop
    /// must outlive an unreachable OBS.
    pub async fn on_event(&mut self, event: LogEvent) {
        match event {
            LogEvent::UrlResolved { url } => {
                let url = self.rewrite_tunneled(url);
                self.current_url = Some(url.clone());
                if let Err(e) = self.publisher.publish(&url).await {
                    tracing::warn!(error = %e, url = %url, "Failed to update OBS input");
                }
            }
            LogEvent::SessionEnded => {
                self.current_url = None;
                if let Err(e) = self.publisher.publish("").await {
                    tracing::warn!(error = %e, "Failed to clear OBS input");
                }
            }
        }
    }

    /// Rewrite the device-local tunneled scheme to the configured
    /// transport before publishing.
    fn rewrite_tunneled(&self, url: String) -> String {
        if let Some(rest) = url.strip_prefix("rtspt://") {
            let rewritten = format!("{}://{rest}", self.rtspt_replacement);
            tracing::info!(
                scheme = %self.rtspt_replacement,
                url = %rewritten,
                "Converted rtspt URL"
            );
            rewritten
        } else {
            url
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::publisher::test_support::RecordingControl;
    use serde_json::{json, Map};
    use std::sync::Arc;

    fn reconciler(control: &Arc<RecordingControl>) -> Reconciler {
        let control: Arc<dyn crate::obs::InputControl> =
            Arc::clone(control) as Arc<dyn crate::obs::InputControl>;
        let publisher = Publisher::new(Some(control), "VRChatFeed", Map::new());
        Reconciler::new(publisher, "rtmp")
    }

    #[tokio::test]
    async fn test_url_event_pushes_and_tracks() {
        let control = Arc::new(RecordingControl::default());
        let mut reconciler = reconciler(&control);

        reconciler
            .on_event(LogEvent::UrlResolved {
                url: "https://cdn.example/v.mp4".into(),
            })
            .await;

        assert_eq!(reconciler.current_url(), Some("https://cdn.example/v.mp4"));
        let applied = control.applied().await;
        assert_eq!(applied[0].settings["input"], json!("https://cdn.example/v.mp4"));
        assert_eq!(applied[0].settings["is_local_file"], json!(false));
        assert!(!applied[0].overlay);
    }

    #[tokio::test]
    async fn test_rtspt_rewritten_before_push() {
        let control = Arc::new(RecordingControl::default());
        let mut reconciler = reconciler(&control);

        reconciler
            .on_event(LogEvent::UrlResolved {
                url: "rtspt://host/path".into(),
            })
            .await;

        assert_eq!(reconciler.current_url(), Some("rtmp://host/path"));
        let applied = control.applied().await;
        assert_eq!(applied[0].settings["input"], json!("rtmp://host/path"));
        // The tunneled prefix never reaches the payload.
        assert!(!applied[0].settings["input"]
            .as_str()
            .unwrap()
            .contains("rtspt"));
    }

    #[tokio::test]
    async fn test_rewrite_only_touches_prefix() {
        let control = Arc::new(RecordingControl::default());
        let mut reconciler = reconciler(&control);

        reconciler
            .on_event(LogEvent::UrlResolved {
                url: "https://host/rtspt://decoy".into(),
            })
            .await;

        assert_eq!(reconciler.current_url(), Some("https://host/rtspt://decoy"));
    }

    #[tokio::test]
    async fn test_session_end_clears_state() {
        let control = Arc::new(RecordingControl::default());
        let mut reconciler = reconciler(&control);

        reconciler
            .on_event(LogEvent::UrlResolved {
                url: "rtmp://host/path".into(),
            })
            .await;
        reconciler.on_event(LogEvent::SessionEnded).await;

        assert_eq!(reconciler.current_url(), None);
        let applied = control.applied().await;
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[1].settings["input"], json!(""));
    }

    #[tokio::test]
    async fn test_failed_push_keeps_intent_state() {
        let control = Arc::new(RecordingControl::failing());
        let publisher = Publisher::new(Some(control), "Feed", Map::new());
        let mut reconciler = Reconciler::new(publisher, "rtmp");

        reconciler
            .on_event(LogEvent::UrlResolved {
                url: "rtmp://host/path".into(),
            })
            .await;

        // State reflects intent; the next identical event re-asserts it.
        assert_eq!(reconciler.current_url(), Some("rtmp://host/path"));
    }

    #[tokio::test]
    async fn test_no_connection_no_downstream_call() {
        let publisher = Publisher::new(None, "Feed", Map::new());
        let mut reconciler = Reconciler::new(publisher, "rtmp");

        reconciler
            .on_event(LogEvent::UrlResolved {
                url: "rtmp://host/path".into(),
            })
            .await;

        assert_eq!(reconciler.current_url(), Some("rtmp://host/path"));
    }

    #[tokio::test]
    async fn test_custom_replacement_scheme() {
        let control = Arc::new(RecordingControl::default());
        let publisher = Publisher::new(Some(control.clone()), "Feed", Map::new());
        let mut reconciler = Reconciler::new(publisher, "rtsp");

        reconciler
            .on_event(LogEvent::UrlResolved {
                url: "rtspt://host/path".into(),
            })
            .await;

        let applied = control.applied().await;
        assert_eq!(applied[0].settings["input"], json!("rtsp://host/path"));
    }
}
