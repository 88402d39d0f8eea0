/// The root path. It is the only normalized path allowed to end in `/`.
pub const ROOT: &str = "/";

/// normalize
///
/// Canonicalizes a request path for comparison by stripping the trailing `/`,
/// unless the path is exactly the root. A run of trailing slashes is stripped
/// as a whole so that `normalize` stays idempotent. Case is preserved: route
/// entries are compared byte for byte.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        // "" and "/", "//", ... all collapse to the root.
        return ROOT.to_string();
    }
    trimmed.to_string()
}

/// Returns true when `path` is already in normalized form.
pub fn is_normalized(path: &str) -> bool {
    path == ROOT || (path.starts_with('/') && !path.ends_with('/'))
}

/// matches_prefix
///
/// Segment-aware prefix test: `path` matches `base` when it is equal to it or
/// continues it with a `/`. `/users/homepage` does not match `/users/home`.
pub fn matches_prefix(path: &str, base: &str) -> bool {
    match path.strip_prefix(base) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
