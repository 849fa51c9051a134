/// URL building for upstream requests.
/// Caller-supplied ids become single, percent-encoded path segments so they
/// cannot walk to a different resource.
pub fn rewrite_url(upstream_base: &str, original_path: &str) -> String {
    format!("{}{}", upstream_base.trim_end_matches('/'), original_path)
}

/// `{base}/{id}{suffix}` with `id` encoded as one path segment.
///
/// `None` for ids that are empty or a dot-segment: percent-encoding leaves `.`
/// alone, so `..` would be resolved away by the URL parser.
pub fn node_url(upstream_base: &str, id: &str, suffix: &str) -> Option<String> {
    if matches!(id, "" | "." | "..") {
        return None;
    }
    Some(rewrite_url(
        upstream_base,
        &format!("/{}{}", urlencoding::encode(id), suffix),
    ))
}
