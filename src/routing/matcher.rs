//! Path prefix matching.
//!
//! # Responsibilities
//! - Match a request path against a `/`-terminated prefix (case-sensitive)
//! - Translate the matched path into the upstream path
//! - Detect the bare form of a prefix (`/ctf` for `/ctf/`)
//!
//! # Design Decisions
//! - No regex to guarantee O(n) matching
//! - Stripping keeps the leading `/`: `/ctf/x` → `/x`, `/ctf/` → `/`

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. The prefix is expected to end in `/`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if the path falls under this prefix.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    /// Returns true if the path is the prefix without its trailing slash.
    pub fn is_bare_prefix(&self, path: &str) -> bool {
        self.prefix.len() > 1 && self.prefix.strip_suffix('/') == Some(path)
    }

    /// The path with the prefix removed, leading `/` preserved.
    ///
    /// Callers must only pass paths for which [`matches`](Self::matches) holds.
    pub fn strip<'a>(&self, path: &'a str) -> &'a str {
        // The prefix ends in `/`, so keep that last byte as the new root.
        let keep_from = self.prefix.len().saturating_sub(1);
        path.get(keep_from..).unwrap_or("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/ctf/");

        assert!(matcher.matches("/ctf/"));
        assert!(matcher.matches("/ctf/challenge"));
        assert!(!matcher.matches("/ctf"));
        assert!(!matcher.matches("/ctfx/"));
        assert!(!matcher.matches("/CTF/"));
    }

    #[test]
    fn test_strip() {
        let matcher = PathPrefixMatcher::new("/ctf/");
        assert_eq!(matcher.strip("/ctf/challenge"), "/challenge");
        assert_eq!(matcher.strip("/ctf/"), "/");
        assert_eq!(matcher.strip("/ctf/a/b/"), "/a/b/");

        let root = PathPrefixMatcher::new("/");
        assert_eq!(root.strip("/anything"), "/anything");
    }

    #[test]
    fn test_bare_prefix() {
        let matcher = PathPrefixMatcher::new("/ctf/");
        assert!(matcher.is_bare_prefix("/ctf"));
        assert!(!matcher.is_bare_prefix("/ctf/"));
        assert!(!matcher.is_bare_prefix("/ct"));

        assert!(!PathPrefixMatcher::new("/").is_bare_prefix(""));
    }
}
