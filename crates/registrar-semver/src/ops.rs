use std::cmp::Ordering;

use registrar_core::Result;

use crate::constraint::VersionConstraint;
use crate::version::{ComposerVersion, Stability};

/// The registry's single entry point for version semantics. No other
/// component re-implements parsing, normalization or ordering.
#[derive(Debug, Default, Clone, Copy)]
pub struct SemverOps;

impl SemverOps {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parses `raw`'s stability marker without validating the rest of the
    /// version grammar strictly — used to classify a VCS-reported tag
    /// before a full parse is attempted.
    pub fn parse_stability(&self, raw: &str) -> Result<Stability> {
        ComposerVersion::parse(raw).map(ComposerVersion::stability)
    }

    /// Normalizes `raw` to its canonical comparable form.
    pub fn normalize(&self, raw: &str) -> Result<String> {
        ComposerVersion::parse(raw).map(|v| v.normalized())
    }

    /// Orders two raw version strings the way Composer orders them.
    pub fn compare(&self, a: &str, b: &str) -> Result<Ordering> {
        let va = ComposerVersion::parse(a)?;
        let vb = ComposerVersion::parse(b)?;
        Ok(va.cmp(&vb))
    }

    /// Whether `candidate` satisfies `constraint`.
    pub fn satisfies(&self, candidate: &str, constraint: &str) -> Result<bool> {
        let version = ComposerVersion::parse(candidate)?;
        Ok(VersionConstraint::new(constraint).matches(&version))
    }

    /// Sorts raw version strings ascending, dropping any that fail to
    /// parse (a malformed tag should not abort the whole sort).
    #[must_use]
    pub fn sort_ascending(&self, raws: &[String]) -> Vec<String> {
        let mut parsed: Vec<(ComposerVersion, &String)> = raws
            .iter()
            .filter_map(|raw| ComposerVersion::parse(raw).ok().map(|v| (v, raw)))
            .collect();
        parsed.sort_by(|a, b| a.0.cmp(&b.0));
        parsed.into_iter().map(|(_, raw)| raw.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_matches_documented_example() {
        let ops = SemverOps::new();
        assert_eq!(ops.normalize("1.2.0-beta3").unwrap(), "1.2.0.0-beta3");
    }

    #[test]
    fn sort_ascending_orders_by_version_not_lexically() {
        let ops = SemverOps::new();
        let raws = vec!["1.10.0".to_string(), "1.2.0".to_string(), "1.9.0".to_string()];
        assert_eq!(ops.sort_ascending(&raws), vec!["1.2.0", "1.9.0", "1.10.0"]);
    }

    #[test]
    fn sort_ascending_drops_unparseable_entries() {
        let ops = SemverOps::new();
        let raws = vec!["1.0.0".to_string(), "not-a-version!!".to_string()];
        assert_eq!(ops.sort_ascending(&raws), vec!["1.0.0"]);
    }

    #[test]
    fn satisfies_delegates_to_constraint_matching() {
        let ops = SemverOps::new();
        assert!(ops.satisfies("1.5.0", "^1.0").unwrap());
        assert!(!ops.satisfies("2.0.0", "^1.0").unwrap());
    }
}
