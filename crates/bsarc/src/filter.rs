//! Glob filtering of archive entries.

use glob::{MatchOptions, Pattern};

use bsarc_ba2::Entry;

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Case-insensitive glob over entry paths.
///
/// Paths and patterns are compared with `/` separators, so
/// `textures/armor/*.dds` and `Textures\Armor\*.DDS` select the same entries.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    pattern: Pattern,
}

impl EntryFilter {
    pub fn new(pattern: &str) -> Result<Self, glob::PatternError> {
        Ok(Self {
            pattern: Pattern::new(&pattern.replace('\\', "/"))?,
        })
    }

    /// Whether an entry's path matches.
    pub fn matches(&self, entry: &Entry) -> bool {
        self.matches_path(entry.full_path())
    }

    /// Whether an archive path matches.
    pub fn matches_path(&self, path: &str) -> bool {
        self.pattern
            .matches_with(&path.replace('\\', "/"), OPTIONS)
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators_and_case() {
        let filter = EntryFilter::new(r"Textures\Armor\*.DDS").unwrap();
        assert!(filter.matches_path(r"textures\armor\helmet_d.dds"));
        assert!(filter.matches_path("TEXTURES/ARMOR/helmet_n.dds"));
        assert!(!filter.matches_path(r"textures\armor\helmet.nif"));
        assert_eq!(filter.as_str(), "Textures/Armor/*.DDS");
    }

    #[test]
    fn test_recursive_wildcard() {
        let filter = EntryFilter::new("meshes/**/*.nif").unwrap();
        assert!(filter.matches_path(r"Meshes\Armor\Power\Helmet.nif"));
        assert!(!filter.matches_path(r"Textures\Armor\Helmet.nif"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(EntryFilter::new("[unclosed").is_err());
    }
}
