use url::Url;

/// Joins a request path onto the configured base address.
///
/// A path that is already a full URL passes through untouched, so an
/// operator can point one deployment at a different origin per environment
/// without code changes. Relative paths are joined with exactly one
/// separator regardless of how base and path are written; an empty base
/// behaves as `/`.
pub fn join_endpoint(base: &str, path: &str) -> String {
    if is_absolute(path) {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if base.is_empty() {
        format!("/{path}")
    } else {
        format!("{base}/{path}")
    }
}

fn is_absolute(path: &str) -> bool {
    // Scheme-only pseudo-URLs ("mailto:x") have no host and are not remote
    // addresses for our purposes.
    matches!(Url::parse(path), Ok(url) if url.has_host())
}
