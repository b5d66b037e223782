//! Release tag parsing and comparison.
//!
//! Release tags are expected to be semantic versions, optionally prefixed with
//! `v` or `V` (`v1.4.0`, `V2.0.0-beta.1`). Anything else is not a release this
//! crate can order and is dropped by the [resolver](crate::resolver).
//!
//! Ordering is [`semver::Version`]'s total order: prereleases sort below their
//! release (`2.0.0-rc.1 < 2.0.0`) and build metadata only breaks ties.

pub use semver::Version;

/// Parse a release tag into a [`Version`].
///
/// Leading `v`/`V` prefixes and surrounding whitespace are ignored. Returns
/// `None` for tags that are not valid semantic versions.
///
/// # Examples
///
/// ```rust
/// use release_updater::version::{parse_tag, Version};
///
/// assert_eq!(parse_tag("v1.5.0"), Some(Version::new(1, 5, 0)));
/// assert_eq!(parse_tag("1.5.0"), Some(Version::new(1, 5, 0)));
/// assert!(parse_tag("nightly-2024-01-01").is_none());
/// ```
#[must_use]
pub fn parse_tag(tag: &str) -> Option<Version> {
    let cleaned = tag.trim();
    let cleaned = cleaned
        .strip_prefix('v')
        .or_else(|| cleaned.strip_prefix('V'))
        .unwrap_or(cleaned);

    Version::parse(cleaned).ok()
}

/// Whether `candidate` is strictly newer than `current`.
#[must_use]
pub fn is_newer(candidate: &Version, current: &Version) -> bool {
    candidate > current
}
