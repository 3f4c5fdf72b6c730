//! Bounded excerpts of prior agent output.
//!
//! Each turn's prompt carries at most `EXCERPT_CAP` characters of the
//! previous response, which bounds prompt growth across long runs.

/// Maximum characters of prior-turn output carried into the next prompt.
pub const EXCERPT_CAP: usize = 2000;

/// Marker appended when an excerpt was cut at the cap.
pub const TRUNCATION_MARKER: &str = "\n[... output truncated ...]";

/// Truncate `text` to `EXCERPT_CAP` characters, appending a marker when cut.
///
/// Counts characters, not bytes, so multi-byte output never splits.
pub fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_CAP) {
        Some((idx, _)) => format!("{}{}", &text[..idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
