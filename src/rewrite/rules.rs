//! Literal substitution rules.
//!
//! # Design Decisions
//! - Plain substring search, never regex: what the rule says is what happens
//! - One left-to-right pass per rule, matches never overlap
//! - An occurrence that already reads as the replacement is skipped, so
//!   `href="/` → `href="/ctf/` leaves `href="/ctf/` alone

use crate::config::RewriteRuleConfig;

/// A single `match_pattern` → `replacement` substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    match_pattern: String,
    replacement: String,
}

impl RewriteRule {
    pub fn new(match_pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            match_pattern: match_pattern.into(),
            replacement: replacement.into(),
        }
    }

    /// Build the prefix-insertion rule for a pattern ending in `/`.
    ///
    /// `href="/` with prefix `/ctf/` becomes `href="/` → `href="/ctf/`.
    pub fn for_prefix(pattern: &str, prefix: &str) -> Self {
        let head = pattern.strip_suffix('/').unwrap_or(pattern);
        Self::new(pattern, format!("{head}{prefix}"))
    }

    pub fn match_pattern(&self) -> &str {
        &self.match_pattern
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Apply the rule once over `input`. Returns the output and the number of
    /// replacements made.
    pub fn apply(&self, input: &str) -> (String, usize) {
        if self.match_pattern.is_empty() {
            return (input.to_string(), 0);
        }

        let mut output = String::with_capacity(input.len());
        let mut replaced = 0;
        let mut cursor = 0;

        while let Some(offset) = input[cursor..].find(&self.match_pattern) {
            let at = cursor + offset;
            output.push_str(&input[cursor..at]);

            if input[at..].starts_with(&self.replacement) {
                output.push_str(&self.replacement);
                cursor = at + self.replacement.len();
            } else {
                output.push_str(&self.replacement);
                cursor = at + self.match_pattern.len();
                replaced += 1;
            }
        }
        output.push_str(&input[cursor..]);

        (output, replaced)
    }
}

impl From<&RewriteRuleConfig> for RewriteRule {
    fn from(config: &RewriteRuleConfig) -> Self {
        Self::new(config.match_pattern.clone(), config.replacement.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_rule_shape() {
        let rule = RewriteRule::for_prefix("url(\"/", "/ctf/");
        assert_eq!(rule.match_pattern(), "url(\"/");
        assert_eq!(rule.replacement(), "url(\"/ctf/");
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let rule = RewriteRule::for_prefix("src=\"/", "/ctf/");
        let (out, n) = rule.apply(r#"<img src="/a.png"><img src="/b.png">"#);
        assert_eq!(out, r#"<img src="/ctf/a.png"><img src="/ctf/b.png">"#);
        assert_eq!(n, 2);
    }

    #[test]
    fn test_skips_already_prefixed() {
        let rule = RewriteRule::for_prefix("href=\"/", "/ctf/");
        let (out, n) = rule.apply(r#"<a href="/ctf/x"></a><a href="/y"></a>"#);
        assert_eq!(out, r#"<a href="/ctf/x"></a><a href="/ctf/y"></a>"#);
        assert_eq!(n, 1);
    }

    #[test]
    fn test_literal_not_regex() {
        let rule = RewriteRule::new("a.c", "X");
        let (out, n) = rule.apply("abc a.c");
        assert_eq!(out, "abc X");
        assert_eq!(n, 1);
    }

    #[test]
    fn test_no_match_is_identity() {
        let rule = RewriteRule::for_prefix("action=\"/", "/ctf/");
        let input = "<form method=post>";
        assert_eq!(rule.apply(input), (input.to_string(), 0));
    }
}
