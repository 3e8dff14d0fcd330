use serde::{Deserialize, Serialize};

use registrar_core::Error;

use crate::version::ComposerVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ge,
    Gt,
    Le,
    Lt,
}

#[derive(Debug, Clone)]
struct Bound {
    op: Op,
    version: ComposerVersion,
}

impl Bound {
    fn holds(&self, candidate: &ComposerVersion) -> bool {
        match self.op {
            Op::Eq => candidate == &self.version,
            Op::Ge => candidate >= &self.version,
            Op::Gt => candidate > &self.version,
            Op::Le => candidate <= &self.version,
            Op::Lt => candidate < &self.version,
        }
    }
}

/// A Composer version constraint: `^1.2`, `~1.2.0`, `>=1.0 <2.0`,
/// `1.0.*`, `1.0 || 2.0`, or a bare version (treated as `=`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionConstraint {
    raw: String,
}

impl VersionConstraint {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    #[must_use]
    pub fn any() -> Self {
        Self::new("*")
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `candidate` satisfies this constraint. A malformed
    /// constraint or candidate never matches rather than panicking.
    #[must_use]
    pub fn matches(&self, candidate: &ComposerVersion) -> bool {
        self.groups().is_ok_and(|groups| {
            groups
                .iter()
                .any(|group| group.iter().all(|bound| bound.holds(candidate)))
        })
    }

    fn groups(&self) -> registrar_core::Result<Vec<Vec<Bound>>> {
        self.raw
            .split(['|'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_and_group)
            .collect()
    }
}

fn parse_and_group(group: &str) -> registrar_core::Result<Vec<Bound>> {
    group
        .split([',', ' '])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_term)
        .collect::<registrar_core::Result<Vec<Vec<Bound>>>>()
        .map(|nested| nested.into_iter().flatten().collect())
}

fn parse_term(term: &str) -> registrar_core::Result<Vec<Bound>> {
    if term == "*" {
        return Ok(vec![]);
    }
    if let Some(rest) = term.strip_prefix('^') {
        return caret_bounds(rest);
    }
    if let Some(rest) = term.strip_prefix('~') {
        return tilde_bounds(rest);
    }
    if term.ends_with(".*") || term.ends_with(".x") {
        return wildcard_bounds(&term[..term.len() - 2]);
    }
    if let Some(rest) = term.strip_prefix(">=") {
        return Ok(vec![Bound { op: Op::Ge, version: ComposerVersion::parse(rest.trim())? }]);
    }
    if let Some(rest) = term.strip_prefix("<=") {
        return Ok(vec![Bound { op: Op::Le, version: ComposerVersion::parse(rest.trim())? }]);
    }
    if let Some(rest) = term.strip_prefix('>') {
        return Ok(vec![Bound { op: Op::Gt, version: ComposerVersion::parse(rest.trim())? }]);
    }
    if let Some(rest) = term.strip_prefix('<') {
        return Ok(vec![Bound { op: Op::Lt, version: ComposerVersion::parse(rest.trim())? }]);
    }
    let rest = term.strip_prefix('=').unwrap_or(term);
    Ok(vec![Bound { op: Op::Eq, version: ComposerVersion::parse(rest.trim())? }])
}

fn wildcard_bounds(prefix: &str) -> registrar_core::Result<Vec<Bound>> {
    let parts: Vec<&str> = prefix.split('.').collect();
    let lower = ComposerVersion::parse(&format!("{}.0.0.0", normalize_parts(&parts)))?;
    let upper = bump_last(&parts)?;
    Ok(vec![
        Bound { op: Op::Ge, version: lower },
        Bound { op: Op::Lt, version: upper },
    ])
}

fn normalize_parts(parts: &[&str]) -> String {
    parts.join(".")
}

fn bump_last(parts: &[&str]) -> registrar_core::Result<ComposerVersion> {
    let mut nums: Vec<u64> = parts
        .iter()
        .map(|p| p.parse::<u64>().map_err(|_| Error::invalid_version(p.to_string(), "non-numeric wildcard segment")))
        .collect::<registrar_core::Result<_>>()?;
    let last = nums.len() - 1;
    nums[last] += 1;
    while nums.len() < 4 {
        nums.push(0);
    }
    ComposerVersion::parse(&nums.iter().map(ToString::to_string).collect::<Vec<_>>().join("."))
}

fn caret_bounds(rest: &str) -> registrar_core::Result<Vec<Bound>> {
    let lower = ComposerVersion::parse(rest)?;
    let parts: Vec<u64> = rest
        .split('.')
        .map(|p| p.split(['-', '+']).next().unwrap_or("0").parse::<u64>().unwrap_or(0))
        .collect();
    let first_nonzero = parts.iter().position(|&n| n != 0);
    let upper_parts = match first_nonzero {
        Some(0) | None => vec![parts.first().copied().unwrap_or(0) + 1, 0, 0, 0],
        Some(idx) => {
            let mut bumped = vec![0u64; idx];
            bumped.push(parts[idx] + 1);
            bumped
        }
    };
    let upper = ComposerVersion::parse(
        &upper_parts
            .iter()
            .chain(std::iter::repeat(&0))
            .take(4)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("."),
    )?;
    Ok(vec![
        Bound { op: Op::Ge, version: lower },
        Bound { op: Op::Lt, version: upper },
    ])
}

fn tilde_bounds(rest: &str) -> registrar_core::Result<Vec<Bound>> {
    let lower = ComposerVersion::parse(rest)?;
    let parts: Vec<u64> = rest
        .split('.')
        .map(|p| p.split(['-', '+']).next().unwrap_or("0").parse::<u64>().unwrap_or(0))
        .collect();
    let upper_parts = if parts.len() <= 2 {
        vec![parts.first().copied().unwrap_or(0) + 1, 0, 0, 0]
    } else {
        let mut bumped = parts.clone();
        let idx = bumped.len() - 2;
        bumped[idx] += 1;
        bumped.truncate(idx + 1);
        bumped
    };
    let upper = ComposerVersion::parse(
        &upper_parts
            .iter()
            .chain(std::iter::repeat(&0))
            .take(4)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("."),
    )?;
    Ok(vec![
        Bound { op: Op::Ge, version: lower },
        Bound { op: Op::Lt, version: upper },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn v(raw: &str) -> ComposerVersion {
        ComposerVersion::parse(raw).unwrap()
    }

    #[test_case("*", "1.0.0", true)]
    #[test_case("^1.2", "1.5.0", true)]
    #[test_case("^1.2", "2.0.0", false)]
    #[test_case("~1.2", "1.9.0", true)]
    #[test_case("~1.2", "2.0.0", false)]
    #[test_case("1.0.*", "1.0.5", true)]
    #[test_case("1.0.*", "1.1.0", false)]
    #[test_case(">=1.0 <2.0", "1.5.0", true)]
    #[test_case(">=1.0 <2.0", "2.0.0", false)]
    #[test_case("1.0.0 || 2.0.0", "2.0.0", true)]
    #[test_case("1.0.0", "1.0.0", true)]
    fn matches_expected(constraint: &str, candidate: &str, expected: bool) {
        let c = VersionConstraint::new(constraint);
        assert_eq!(c.matches(&v(candidate)), expected, "{constraint} vs {candidate}");
    }

    #[test]
    fn empty_constraint_never_panics() {
        let c = VersionConstraint::new("");
        assert!(!c.matches(&v("1.0.0")));
    }

    #[test]
    fn malformed_constraint_never_panics() {
        let c = VersionConstraint::new("^^not-a-version");
        assert!(!c.matches(&v("1.0.0")));
    }
}
