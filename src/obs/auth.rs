//! obs-websocket v5 authentication.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

/// Compute the `Identify` authentication string for a Hello challenge.
///
/// Per the obs-websocket v5 protocol:
/// `base64(sha256(base64(sha256(password + salt)) + challenge))`.
#[must_use]
pub fn auth_response(password: &str, salt: &str, challenge: &str) -> String {
    let secret = STANDARD.encode(Sha256::digest(format!("{password}{salt}")));
    STANDARD.encode(Sha256::digest(format!("{secret}{challenge}")))
}
