//! Filter Chain (§4.2): ordered composition of include/exclude filters,
//! applied inline during enumeration so rejected objects never reach the
//! indexer or comparator. Built once at orchestrator startup, per §9's
//! "build the chain once... do not re-evaluate configuration per object".

mod pattern;

pub use pattern::{GlobPatternSet, RegexPatternSet};

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::errors::ConfigurationError;
use crate::model::EntityType;

/// Policy for hardlinked files, set by `--hardlink-policy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardlinkPolicy {
    /// Emit hardlinks as regular files; log a warning once per inode.
    Follow,
    /// Exclude hardlinked files from the sync entirely.
    Skip,
}

/// The minimal information the filter chain needs about a traversal
/// candidate, independent of how the traverser represents it internally.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub relative_path: &'a str,
    pub name: &'a str,
    pub entity_type: EntityType,
    /// Populated by the local traverser when the platform's link count
    /// indicates more than one hardlink to the same inode.
    pub hardlink_inode: Option<u64>,
}

/// User-facing configuration that produces a compiled `FilterChain`.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    pub include_glob: String,
    pub include_regex: String,
    pub exclude_path: String,
    pub exclude_glob: String,
    pub exclude_regex: String,
    pub follow_symlinks: bool,
    pub hardlink_policy: Option<HardlinkPolicy>,
}

/// Compiled, immutable filter chain. Cheap to clone (patterns are `Arc`-free
/// here because `GlobSet`/`RegexSet` are themselves cheap, reference-counted
/// internally); per-traversal mutable state (warned inodes) lives behind a
/// `Mutex` so one `FilterChain` can be shared by source and destination
/// traversal tasks.
#[derive(Debug)]
pub struct FilterChain {
    include_glob: GlobPatternSet,
    include_regex: RegexPatternSet,
    exclude_path: Vec<String>,
    exclude_glob: GlobPatternSet,
    exclude_regex: RegexPatternSet,
    follow_symlinks: bool,
    hardlink_policy: HardlinkPolicy,
    warned_inodes: Mutex<HashSet<u64>>,
}

/// Outcome of evaluating the chain against one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Accept,
    /// Rejected, and if the candidate is a folder its descendants should be
    /// pruned from enumeration too (an exclude-path match).
    RejectAndPrune,
    Reject,
}

impl FilterDecision {
    pub fn is_accept(self) -> bool {
        matches!(self, Self::Accept)
    }
}

impl FilterChain {
    pub fn compile(config: &FilterConfig) -> Result<Self, ConfigurationError> {
        let exclude_path = config
            .exclude_path
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| p.trim_matches('/').to_string())
            .collect();

        Ok(Self {
            include_glob: GlobPatternSet::compile(&config.include_glob)?,
            include_regex: RegexPatternSet::compile(&config.include_regex)?,
            exclude_path,
            exclude_glob: GlobPatternSet::compile(&config.exclude_glob)?,
            exclude_regex: RegexPatternSet::compile(&config.exclude_regex)?,
            follow_symlinks: config.follow_symlinks,
            hardlink_policy: config.hardlink_policy.unwrap_or(HardlinkPolicy::Follow),
            warned_inodes: Mutex::new(HashSet::new()),
        })
    }

    /// A chain that accepts everything; used where no filtering was requested.
    pub fn accept_all() -> Self {
        Self::compile(&FilterConfig::default()).expect("empty config always compiles")
    }

    fn exclude_path_hit(&self, relative_path: &str) -> bool {
        self.exclude_path.iter().any(|prefix| {
            relative_path == prefix || relative_path.starts_with(&format!("{prefix}/"))
        })
    }

    /// Whether a folder should be pruned from enumeration before its
    /// children are listed, letting remote traversers skip a whole prefix.
    pub fn should_prune_dir(&self, relative_path: &str) -> bool {
        self.exclude_path_hit(relative_path)
    }

    pub fn evaluate(&self, candidate: &Candidate<'_>) -> FilterDecision {
        if !self.include_phase_passes(candidate) {
            return FilterDecision::Reject;
        }

        if self.exclude_path_hit(candidate.relative_path) {
            return FilterDecision::RejectAndPrune;
        }

        if !self.exclude_glob.is_empty() && self.exclude_glob.is_match(candidate.name) {
            return FilterDecision::Reject;
        }

        if !self.exclude_regex.is_empty() && self.exclude_regex.is_match(candidate.relative_path) {
            return FilterDecision::Reject;
        }

        if candidate.entity_type == EntityType::Symlink && !self.follow_symlinks {
            log::warn!("skipping symlink (follow-symlinks disabled): {}", candidate.relative_path);
            return FilterDecision::Reject;
        }

        if candidate.entity_type == EntityType::Other {
            log::warn!("skipping special file (socket/device/pipe): {}", candidate.relative_path);
            return FilterDecision::Reject;
        }

        if let Some(inode) = candidate.hardlink_inode {
            match self.hardlink_policy {
                HardlinkPolicy::Skip => return FilterDecision::Reject,
                HardlinkPolicy::Follow => {
                    let mut warned = self.warned_inodes.lock();
                    if warned.insert(inode) {
                        log::warn!(
                            "emitting hardlink as regular file (inode {inode}): {}",
                            candidate.relative_path
                        );
                    }
                }
            }
        }

        FilterDecision::Accept
    }

    fn include_phase_passes(&self, candidate: &Candidate<'_>) -> bool {
        let glob_specified = !self.include_glob.is_empty();
        let regex_specified = !self.include_regex.is_empty();
        if !glob_specified && !regex_specified {
            return true;
        }
        (glob_specified && self.include_glob.is_match(candidate.name))
            || (regex_specified && self.include_regex.is_match(candidate.relative_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file<'a>(relative_path: &'a str, name: &'a str) -> Candidate<'a> {
        Candidate {
            relative_path,
            name,
            entity_type: EntityType::File,
            hardlink_inode: None,
        }
    }

    #[test]
    fn include_exclude_same_pattern_yields_zero_transfers() {
        let chain = FilterChain::compile(&FilterConfig {
            include_glob: "*.x".into(),
            exclude_glob: "*.x".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            chain.evaluate(&file("a.x", "a.x")),
            FilterDecision::Reject
        );
    }

    #[test]
    fn scenario_four_include_exclude_combination() {
        let chain = FilterChain::compile(&FilterConfig {
            include_glob: "*.pdf;*.jpeg;exactName".into(),
            exclude_glob: "so*;not*;exactName".into(),
            ..Default::default()
        })
        .unwrap();

        assert!(chain.evaluate(&file("important.pdf", "important.pdf")).is_accept());
        assert!(chain
            .evaluate(&file("includeSub/amazing.jpeg", "amazing.jpeg"))
            .is_accept());
        assert!(!chain.evaluate(&file("sorry.pdf", "sorry.pdf")).is_accept());
        assert!(!chain
            .evaluate(&file("exclude/notGood.jpeg", "notGood.jpeg"))
            .is_accept());
        assert!(!chain.evaluate(&file("exactName", "exactName")).is_accept());
        assert!(!chain.evaluate(&file("sub/exactName", "exactName")).is_accept());
    }

    #[test]
    fn exclude_path_prunes_descendants() {
        let chain = FilterChain::compile(&FilterConfig {
            exclude_path: "exclude".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            chain.evaluate(&file("exclude/notGood.jpeg", "notGood.jpeg")),
            FilterDecision::RejectAndPrune
        );
        assert!(chain.should_prune_dir("exclude"));
        assert!(!chain.should_prune_dir("included"));
    }

    #[test]
    fn symlinks_rejected_unless_follow_symlinks() {
        let chain = FilterChain::accept_all();
        let link = Candidate {
            relative_path: "link",
            name: "link",
            entity_type: EntityType::Symlink,
            hardlink_inode: None,
        };
        assert!(!chain.evaluate(&link).is_accept());

        let chain = FilterChain::compile(&FilterConfig {
            follow_symlinks: true,
            ..Default::default()
        })
        .unwrap();
        assert!(chain.evaluate(&link).is_accept());
    }

    #[test]
    fn hardlink_skip_policy_rejects() {
        let chain = FilterChain::compile(&FilterConfig {
            hardlink_policy: Some(HardlinkPolicy::Skip),
            ..Default::default()
        })
        .unwrap();
        let hardlinked = Candidate {
            relative_path: "a.txt",
            name: "a.txt",
            entity_type: EntityType::File,
            hardlink_inode: Some(42),
        };
        assert!(!chain.evaluate(&hardlinked).is_accept());
    }
}
