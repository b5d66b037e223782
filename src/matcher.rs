//! Asset selection predicates.
//!
//! A release usually carries one asset per platform. An [`AssetMatcher`]
//! decides which file names belong to the running platform; the
//! [resolver](crate::resolver) requires exactly one asset of a release to
//! match.
//!
//! Provided matchers:
//!
//! - [`SuffixMatcher`]: file name ends with a fixed string (`-macos.zip`)
//! - [`GlobMatcher`]: glob pattern (`desktop-*-linux-x86_64.tar.gz`)
//! - [`RegexMatcher`]: regular expression for anything more involved
//! - [`PlatformMatcher`]: names the current OS and, when an architecture is
//!   named at all, the current architecture
//!
//! Any `Fn(&str) -> bool + Send + Sync` closure is also a matcher.

use glob::{MatchOptions, Pattern};
use regex::Regex;
use thiserror::Error;

use crate::utils::platform;

/// Predicate over release asset file names.
pub trait AssetMatcher: Send + Sync {
    /// Whether the asset named `filename` is the one to install.
    fn matches(&self, filename: &str) -> bool;
}

impl<F> AssetMatcher for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, filename: &str) -> bool {
        self(filename)
    }
}

/// Invalid matcher definition.
#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("invalid glob pattern '{pattern}'")]
    Glob {
        /// Pattern as given
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("invalid regular expression '{pattern}'")]
    Regex {
        /// Expression as given
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("current platform {os}/{arch} has no known asset naming")]
    UnknownPlatform {
        /// `std::env::consts::OS`
        os: &'static str,
        /// `std::env::consts::ARCH`
        arch: &'static str,
    },
}

/// Matches file names ending with a suffix, ignoring ASCII case.
#[derive(Debug, Clone)]
pub struct SuffixMatcher {
    suffix: String,
}

impl SuffixMatcher {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into().to_ascii_lowercase(),
        }
    }
}

impl AssetMatcher for SuffixMatcher {
    fn matches(&self, filename: &str) -> bool {
        filename.to_ascii_lowercase().ends_with(&self.suffix)
    }
}

/// Matches file names against a glob pattern, ignoring case.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    pattern: Pattern,
}

impl GlobMatcher {
    pub fn new(pattern: &str) -> Result<Self, MatcherError> {
        let compiled = Pattern::new(pattern).map_err(|source| MatcherError::Glob {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { pattern: compiled })
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl AssetMatcher for GlobMatcher {
    fn matches(&self, filename: &str) -> bool {
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.pattern.matches_with(filename, options)
    }
}

/// Matches file names against a regular expression.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    pub fn new(pattern: &str) -> Result<Self, MatcherError> {
        let regex = Regex::new(pattern).map_err(|source| MatcherError::Regex {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { regex })
    }
}

impl AssetMatcher for RegexMatcher {
    fn matches(&self, filename: &str) -> bool {
        self.regex.is_match(filename)
    }
}

/// Matches assets built for the running platform.
///
/// A name matches when it mentions one of the current OS spellings as a
/// separate word, and either mentions no architecture or mentions the current
/// one (`universal` counts as every architecture). An optional extension
/// narrows the match to one archive format.
#[derive(Debug, Clone)]
pub struct PlatformMatcher {
    os: Vec<Regex>,
    arch: Vec<Regex>,
    any_arch: Vec<Regex>,
    extension: Option<String>,
}

impl PlatformMatcher {
    /// Matcher for the platform this binary was compiled for.
    pub fn current() -> Result<Self, MatcherError> {
        Self::for_target(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub(crate) fn for_target(os: &'static str, arch: &'static str) -> Result<Self, MatcherError> {
        let os_aliases = platform::os_aliases_for(os);
        let arch_aliases = platform::arch_aliases_for(arch);
        if os_aliases.is_empty() || arch_aliases.is_empty() {
            return Err(MatcherError::UnknownPlatform { os, arch });
        }

        Ok(Self {
            os: word_patterns(os_aliases),
            arch: word_patterns(arch_aliases),
            any_arch: word_patterns(platform::known_arch_aliases()),
            extension: None,
        })
    }

    /// Only accept names ending in `.{extension}`.
    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        self.extension = Some(format!(".{ext}"));
        self
    }
}

impl AssetMatcher for PlatformMatcher {
    fn matches(&self, filename: &str) -> bool {
        let name = filename.to_ascii_lowercase();

        if let Some(ext) = &self.extension {
            if !name.ends_with(ext.as_str()) {
                return false;
            }
        }

        if !self.os.iter().any(|re| re.is_match(&name)) {
            return false;
        }

        let names_an_arch = self.any_arch.iter().any(|re| re.is_match(&name));
        !names_an_arch || self.arch.iter().any(|re| re.is_match(&name))
    }
}

fn word_patterns(aliases: &[&str]) -> Vec<Regex> {
    aliases
        .iter()
        .filter_map(|alias| {
            Regex::new(&format!(r"(?:^|[^a-z0-9]){}(?:$|[^a-z0-9])", regex::escape(alias))).ok()
        })
        .collect()
}
