//! VRChat video URL to OBS relay.
//!
//! Tails the live VRChat output log, extracts resolved video player URLs,
//! and pushes them as the source of an OBS media input over obs-websocket.

pub mod config;
pub mod obs;
pub mod relay;
pub mod watcher;
