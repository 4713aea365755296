/// Parse the autosave field into trimmed, lower-cased host substrings.
pub fn allowed_hosts(autosave: &str) -> Vec<String> {
    autosave
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Whether an unattended save is permitted on `hostname`.
///
/// Opt-in: an empty list allows nothing.
pub fn allow_auto_save(hostname: &str, autosave: &str) -> bool {
    let host = hostname.to_lowercase();
    allowed_hosts(autosave)
        .iter()
        .any(|site| host.contains(site.as_str()))
}
