//! Downstream publisher for the OBS media input.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::obs::{InputControl, ObsError};

/// Pushes URLs into the configured OBS input.
///
/// Carries the optional control connection explicitly; when OBS was not
/// reachable at startup every publish degrades to a log line.
pub struct Publisher {
    control: Option<Arc<dyn InputControl>>,
    input_name: String,
    extra_settings: Map<String, Value>,
}

impl Publisher {
    /// Create a publisher for the named input.
    #[must_use]
    pub fn new(
        control: Option<Arc<dyn InputControl>>,
        input_name: impl Into<String>,
        extra_settings: Map<String, Value>,
    ) -> Self {
        Self {
            control,
            input_name: input_name.into(),
            extra_settings,
        }
    }

    /// Whether a control connection is present.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.control.is_some()
    }

    /// Push `url` as the input's source; an empty string clears it.
    ///
    /// Fetches the input's current settings, overlays the configured extra
    /// settings, sets `input` and `is_local_file`, and applies the result
    /// with overlay disabled so the settings object fully replaces the
    /// remote one. Identical URLs are resent as-is, the operation is
    /// idempotent on the OBS side.
    ///
    /// Returns `Ok(false)` without any downstream call when no control
    /// connection exists.
    ///
    /// # Errors
    ///
    /// Returns an error if either the settings fetch or the update fails.
    pub async fn publish(&self, url: &str) -> Result<bool, ObsError> {
        let Some(control) = &self.control else {
            if url.is_empty() {
                tracing::info!("OBS not connected, nothing to clear");
            } else {
                tracing::info!(url, "OBS not connected, URL detected");
            }
            return Ok(false);
        };

        let mut settings = control.input_settings(&self.input_name).await?;
        for (key, value) in &self.extra_settings {
            settings.insert(key.clone(), value.clone());
        }
        settings.insert("input".to_string(), Value::String(url.to_string()));
        settings.insert("is_local_file".to_string(), Value::Bool(false));

        control
            .apply_input_settings(&self.input_name, settings, false)
            .await?;

        tracing::info!(input = %self.input_name, url, "Updated OBS input");
        Ok(true)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::RecordingControl;
    use super::*;
    use serde_json::json;

    fn map(entries: &[(&str, Value)]) -> Map<String, Value> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_publish_replaces_settings_full() {
        let control = Arc::new(RecordingControl::with_remote_settings(map(&[
            ("input", json!("rtmp://old/stream")),
            ("buffering_mb", json!(1)),
        ])));
        let publisher = Publisher::new(Some(control.clone()), "VRChatFeed", Map::new());

        assert!(publisher.publish("rtmp://host/path").await.unwrap());

        let applied = control.applied().await;
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].input, "VRChatFeed");
        assert!(!applied[0].overlay);
        assert_eq!(applied[0].settings["input"], json!("rtmp://host/path"));
        assert_eq!(applied[0].settings["is_local_file"], json!(false));
        // Fetched remote settings are carried over.
        assert_eq!(applied[0].settings["buffering_mb"], json!(1));
    }

    #[tokio::test]
    async fn test_publish_overlays_extra_settings() {
        let control = Arc::new(RecordingControl::with_remote_settings(map(&[(
            "looping",
            json!(false),
        )])));
        let extra = map(&[("looping", json!(true)), ("speed", json!(1.5))]);
        let publisher = Publisher::new(Some(control.clone()), "Feed", extra);

        publisher.publish("rtmp://host/path").await.unwrap();

        let applied = control.applied().await;
        assert_eq!(applied[0].settings["looping"], json!(true));
        assert_eq!(applied[0].settings["speed"], json!(1.5));
    }

    #[tokio::test]
    async fn test_publish_idempotent_resend() {
        let control = Arc::new(RecordingControl::default());
        let publisher = Publisher::new(Some(control.clone()), "Feed", Map::new());

        publisher.publish("rtmp://host/path").await.unwrap();
        publisher.publish("rtmp://host/path").await.unwrap();

        let applied = control.applied().await;
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[0].settings, applied[1].settings);
    }

    #[tokio::test]
    async fn test_publish_without_connection_is_noop() {
        let publisher = Publisher::new(None, "Feed", Map::new());
        assert!(!publisher.is_connected());
        assert!(!publisher.publish("rtmp://host/path").await.unwrap());
    }

    #[tokio::test]
    async fn test_publish_clear_sends_empty_input() {
        let control = Arc::new(RecordingControl::default());
        let publisher = Publisher::new(Some(control.clone()), "Feed", Map::new());

        publisher.publish("").await.unwrap();

        let applied = control.applied().await;
        assert_eq!(applied[0].settings["input"], json!(""));
    }

    #[tokio::test]
    async fn test_publish_propagates_failures() {
        let control = Arc::new(RecordingControl::failing());
        let publisher = Publisher::new(Some(control), "Feed", Map::new());
        assert!(publisher.publish("rtmp://host/path").await.is_err());
    }
}
