//! Dataset identifier generation.
//!
//! Dataset ids are v4 UUIDs (128 random bits), generated once at creation
//! and immutable afterwards. The hyphenated lowercase form is used
//! everywhere an id is rendered: directory names, JSON payloads, URLs.

use uuid::Uuid;

/// Generate a fresh dataset id.
pub fn generate_dataset_id() -> Uuid {
    Uuid::new_v4()
}

/// Parse a dataset id from its string form.
///
/// Returns `None` for anything that is not a canonical UUID; such a string
/// can never name a stored dataset.
pub fn parse_dataset_id(s: &str) -> Option<Uuid> {
    Uuid::parse_str(s).ok()
}
