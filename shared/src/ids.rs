//! Helpers for validating resource names used as filesystem path components.

/// Returns true if a name is safe to use as a single path component on all platforms.
///
/// Rules:
/// - Must be non-empty and not "." or ".."
/// - Must not contain path separators ('/' or '\\')
/// - Must not contain control characters or NUL
/// - Must not contain Windows-reserved filename characters
pub fn is_safe_path_component(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }

    name.chars().all(|c| {
        !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') && !c.is_control()
    })
}

/// Returns true if every `/`-separated component of a relative resource path is safe.
pub fn is_safe_relative_path(path: &str) -> bool {
    !path.starts_with('/') && path.split('/').all(is_safe_path_component)
}
