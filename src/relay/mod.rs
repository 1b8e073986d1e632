//! Relay core: reconciliation, publishing, and the dispatch loop.

mod publisher;
mod reconciler;
mod runner;

pub use publisher::Publisher;
pub use reconciler::Reconciler;
pub use runner::{Relay, RelayError};
