//! Slug normalization. Two team names that normalize to the same slug
//! collide on the unique slug index.

use std::sync::LazyLock;

use regex::Regex;

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"[^A-Za-z0-9-]+").unwrap()
});

/// Normalizes a team slug.
///
/// Every run of characters outside `[A-Za-z0-9-]` becomes a single `-` and
/// the result is lower-cased. Normalizing an already normalized slug returns
/// it unchanged.
///
/// ```rust
/// use teamward::teams::normalize_slug;
///
/// assert_eq!(normalize_slug("My Team!"), "my-team-");
/// assert_eq!(normalize_slug("acme"), "acme");
/// ```
pub fn normalize_slug(raw: &str) -> String {
    DISALLOWED.replace_all(raw, "-").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_replaces_and_lowercases() {
        assert_eq!(normalize_slug("My Team!"), "my-team-");
        assert_eq!(normalize_slug("ACME Corp"), "acme-corp");
        assert_eq!(normalize_slug("a__b"), "a-b");
    }

    #[test]
    fn test_normalize_keeps_valid() {
        assert_eq!(normalize_slug("team-42"), "team-42");
        assert_eq!(normalize_slug("my-team-"), "my-team-");
    }

    #[test]
    fn test_normalize_non_ascii() {
        assert_eq!(normalize_slug("Équipe"), "-quipe");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_slug("Hello, World!!");
        assert_eq!(normalize_slug(&once), once);
    }
}
