use glob::Pattern;

use crate::types::{Result, ScanError};

/// Ignore patterns shared by the walker and the per-project file listing
///
/// A pattern matches when it matches either the entry name or its path relative
/// to the scan root (with `/` separators).
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    patterns: Vec<Pattern>,
}

impl IgnoreMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let raw = p.as_ref().trim_end_matches('/');
                Pattern::new(raw).map_err(|e| {
                    ScanError::Config(format!("Invalid ignore pattern '{}': {}", raw, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_ignored(&self, name: &str, relative_path: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches(name) || (!relative_path.is_empty() && p.matches(relative_path)))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_path_matching() {
        let matcher = IgnoreMatcher::new(&["node_modules", "*.egg-info", "docs/legacy"]).unwrap();
        assert!(matcher.is_ignored("node_modules", "web/node_modules"));
        assert!(matcher.is_ignored("pkg.egg-info", "pkg.egg-info"));
        assert!(matcher.is_ignored("legacy", "docs/legacy"));
        assert!(!matcher.is_ignored("legacy", "src/legacy"));
        assert!(!matcher.is_ignored("src", "src"));
    }

    #[test]
    fn test_trailing_slash_is_tolerated() {
        let matcher = IgnoreMatcher::new(&["dist/"]).unwrap();
        assert!(matcher.is_ignored("dist", "app/dist"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(IgnoreMatcher::new(&["[oops"]).is_err());
    }
}
