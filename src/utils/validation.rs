//! Centralized validation and helper functions.

/// Maximum number of runners allowed in a single document (DOS protection)
pub const MAX_RUNNERS: usize = 50_000;

/// Normalize a display name: collapse runs of whitespace and upper-case.
///
/// # Examples
///
/// ```
/// use orient_splits::utils::validation::normalize_name;
///
/// assert_eq!(normalize_name("  Ivanov \n Ivan "), "IVANOV IVAN");
/// assert_eq!(normalize_name("m21"), "M21");
/// ```
#[must_use]
pub fn normalize_name(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Split a normalized display name into (surname, name).
///
/// Exports list the surname first; the given name is the last token.
#[must_use]
pub fn split_display_name(display: &str) -> (String, String) {
    let mut tokens = display.split_whitespace();
    let surname = tokens.next().unwrap_or_default().to_string();
    let name = tokens.last().map(str::to_string).unwrap_or_default();
    (surname, name)
}

/// Compute a checksum of a document's text.
///
/// Lets storage recognize the same export uploaded twice.
#[must_use]
pub fn document_checksum(content: &str) -> String {
    let digest = md5::compute(content.as_bytes());
    format!("{digest:x}")
}

/// Check if adding another runner would exceed `limit`.
///
/// Call this with the current count BEFORE adding a new runner.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_runner_limit(count: usize, limit: usize) -> Option<String> {
    if count >= limit {
        Some(format!(
            "Too many runners: adding another would exceed maximum of {limit}"
        ))
    } else {
        None
    }
}
