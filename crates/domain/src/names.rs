/// Canonical form used for every domain name held by this crate:
/// lowercase, trailing dot.
pub fn fqdn(name: &str) -> String {
    let mut canonical = name.trim().to_ascii_lowercase();
    if !canonical.ends_with('.') {
        canonical.push('.');
    }
    canonical
}

/// Splits `some.domain.` into `("some", "domain.")`. Returns `None` for
/// the root or a single-label name.
pub fn split_first_label(name: &str) -> Option<(&str, &str)> {
    let (label, rest) = name.split_once('.')?;
    if label.is_empty() || rest.is_empty() {
        return None;
    }
    Some((label, rest))
}
