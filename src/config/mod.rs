//! Runtime configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Configuration for the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// OBS WebSocket host.
    #[serde(default = "default_obs_host")]
    pub obs_host: String,
    /// OBS WebSocket port.
    #[serde(default = "default_obs_port")]
    pub obs_port: u16,
    /// OBS WebSocket password, if the server requires one.
    #[serde(default)]
    pub obs_password: Option<String>,
    /// Name of the OBS input receiving the URL.
    #[serde(default = "default_input_name")]
    pub input_name: String,
    /// Scheme that replaces a leading `rtspt://` before publishing.
    #[serde(default = "default_rtspt_replacement")]
    pub rtspt_replacement: String,
    /// Static settings overlaid onto every push.
    #[serde(default)]
    pub extra_settings: Map<String, Value>,
    /// Directory holding the VRChat logs. `None` means the platform
    /// default.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// How often to re-check for a newer log file.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,
}

fn default_obs_host() -> String {
    "localhost".to_string()
}

fn default_obs_port() -> u16 {
    4455
}

fn default_input_name() -> String {
    "VRChatFeed".to_string()
}

fn default_rtspt_replacement() -> String {
    "rtmp".to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            obs_host: default_obs_host(),
            obs_port: default_obs_port(),
            obs_password: None,
            input_name: default_input_name(),
            rtspt_replacement: default_rtspt_replacement(),
            extra_settings: Map::new(),
            log_dir: None,
            poll_interval: default_poll_interval(),
        }
    }
}

/// Parse a comma-separated `key=value` list into a settings object.
///
/// Values are typed opportunistically: `true`/`false` become booleans,
/// then integer, then float, otherwise the value stays a string. Pairs
/// that do not parse as `key=value` are skipped with a warning; they are
/// never partially applied.
#[must_use]
pub fn parse_extra_settings(spec: &str) -> Map<String, Value> {
    let mut settings = Map::new();

    for pair in spec.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let Some((key, value)) = pair.split_once('=') else {
            tracing::warn!(pair, "Ignoring malformed setting, expected key=value");
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            tracing::warn!(pair, "Ignoring setting with empty key");
            continue;
        }
        settings.insert(key.to_string(), coerce_value(value.trim()));
    }

    settings
}

/// Pick the narrowest JSON type a raw setting value fits.
fn coerce_value(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        return Value::Bool(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(Number::from(i));
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}
