//! OBS Studio control plane.
//!
//! Talks obs-websocket v5 to read and replace media input settings. The
//! [`InputControl`] trait is the seam the relay publishes through, so the
//! rest of the crate never depends on a live OBS.

mod auth;
mod client;
mod error;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use auth::auth_response;
pub use client::ObsClient;
pub use error::ObsError;

/// Control surface for a named OBS input.
#[async_trait]
pub trait InputControl: Send + Sync {
    /// Fetch the current settings object of the named input.
    async fn input_settings(&self, input: &str) -> Result<Map<String, Value>, ObsError>;

    /// Replace (overlay = false) or merge (overlay = true) the settings of
    /// the named input.
    async fn apply_input_settings(
        &self,
        input: &str,
        settings: Map<String, Value>,
        overlay: bool,
    ) -> Result<(), ObsError>;
}
