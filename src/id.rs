//! ID generation utilities for Shepherd
//!
//! Provides timestamps and unique identifiers for loop instances.

use std::sync::atomic::{AtomicU32, Ordering};

use sha2::{Digest, Sha256};

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Generate a unique loop ID
///
/// Format: `{timestamp_ms}-{hex4}`
/// Example: `1738300800123-a1b2`
///
/// The suffix is a hash of the session id, timestamp, and a process-local
/// counter, so two loops started in the same millisecond do not collide.
pub fn generate_loop_id(session_id: &str) -> String {
    let timestamp = now_ms();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hasher.update(timestamp.to_le_bytes());
    hasher.update(seq.to_le_bytes());
    let digest = hasher.finalize();

    format!("{}-{}", timestamp, hex::encode(&digest[..2]))
}
