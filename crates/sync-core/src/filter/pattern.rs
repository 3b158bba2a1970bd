//! Compiled pattern sets shared by the glob and regex filter stages.
//!
//! Mirrors the teacher crate's compile-once-then-match `FileFilter` idiom
//! (`blit-core`'s `fs_enum.rs`), generalized to semicolon-separated pattern
//! lists and to both globs and anchored regular expressions.

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::RegexSet;

use crate::errors::ConfigurationError;

/// A compiled set of semicolon-separated glob patterns.
#[derive(Debug, Clone)]
pub struct GlobPatternSet {
    raw: String,
    set: Option<GlobSet>,
}

impl GlobPatternSet {
    pub fn compile(semicolon_separated: &str) -> Result<Self, ConfigurationError> {
        let patterns = split_patterns(semicolon_separated);
        if patterns.is_empty() {
            return Ok(Self {
                raw: semicolon_separated.to_string(),
                set: None,
            });
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = Glob::new(pattern).map_err(|err| ConfigurationError::InvalidFilter {
                pattern: pattern.to_string(),
                message: err.to_string(),
            })?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|err| ConfigurationError::InvalidFilter {
                pattern: semicolon_separated.to_string(),
                message: err.to_string(),
            })?;
        Ok(Self {
            raw: semicolon_separated.to_string(),
            set: Some(set),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_none()
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        match &self.set {
            Some(set) => set.is_match(candidate),
            None => false,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// A compiled set of semicolon-separated, anchored regular expressions.
#[derive(Debug, Clone)]
pub struct RegexPatternSet {
    raw: String,
    set: Option<RegexSet>,
}

impl RegexPatternSet {
    pub fn compile(semicolon_separated: &str) -> Result<Self, ConfigurationError> {
        let patterns = split_patterns(semicolon_separated);
        if patterns.is_empty() {
            return Ok(Self {
                raw: semicolon_separated.to_string(),
                set: None,
            });
        }
        let anchored: Vec<String> = patterns.iter().map(|p| anchor(p)).collect();
        let set =
            RegexSet::new(&anchored).map_err(|err| ConfigurationError::InvalidFilter {
                pattern: semicolon_separated.to_string(),
                message: err.to_string(),
            })?;
        Ok(Self {
            raw: semicolon_separated.to_string(),
            set: Some(set),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_none()
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        match &self.set {
            Some(set) => set.is_match(candidate),
            None => false,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

fn split_patterns(raw: &str) -> Vec<&str> {
    raw.split(';').map(str::trim).filter(|p| !p.is_empty()).collect()
}

fn anchor(pattern: &str) -> String {
    if pattern.starts_with('^') && pattern.ends_with('$') {
        pattern.to_string()
    } else {
        format!("^(?:{pattern})$")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pattern_set_matches_nothing_but_is_marked_empty() {
        let set = GlobPatternSet::compile("").unwrap();
        assert!(set.is_empty());
        assert!(!set.is_match("anything"));
    }

    #[test]
    fn glob_set_matches_any_semicolon_separated_pattern() {
        let set = GlobPatternSet::compile("*.pdf;*.jpeg;exactName").unwrap();
        assert!(set.is_match("important.pdf"));
        assert!(set.is_match("amazing.jpeg"));
        assert!(set.is_match("exactName"));
        assert!(!set.is_match("sorry.docx"));
    }

    #[test]
    fn regex_set_is_anchored_by_default() {
        let set = RegexPatternSet::compile("sub/.*").unwrap();
        assert!(set.is_match("sub/a.txt"));
        assert!(!set.is_match("other/sub/a.txt"));
    }

    #[test]
    fn invalid_glob_reports_configuration_error() {
        let err = GlobPatternSet::compile("[").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidFilter { .. }));
    }
}
