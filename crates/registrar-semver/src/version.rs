use std::cmp::Ordering;
use std::sync::{Arc, LazyLock};

use ahash::AHashMap;
use parking_lot::RwLock;
use regex::Regex;
use smallvec::SmallVec;

use registrar_core::Error;

/// Composer's stability ladder, lowest to highest maturity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum Stability {
    Dev = 0,
    Alpha = 1,
    Beta = 2,
    Rc = 3,
    #[default]
    Stable = 4,
}

impl Stability {
    /// Parses a pre-release tag (case-insensitive) into a stability level.
    /// An empty tag or a `patch`/`pl`/`p` tag (Composer's patch-level alias)
    /// is stable.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        let lowered = tag.to_ascii_lowercase();
        match lowered.as_str() {
            "dev" => Self::Dev,
            "alpha" | "a" => Self::Alpha,
            "beta" | "b" => Self::Beta,
            "patch" | "pl" | "p" | "" | "stable" => Self::Stable,
            other if other.starts_with("rc") => Self::Rc,
            _ => Self::Stable,
        }
    }

    #[must_use]
    pub const fn satisfies_minimum(self, minimum: Self) -> bool {
        self as u8 >= minimum as u8
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Rc => "RC",
            Self::Stable => "stable",
        }
    }
}

/// A single pre-release identifier segment, comparable per semver rules:
/// numeric identifiers sort before, and lower than, alphanumeric ones.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PreReleaseId {
    Numeric(u64),
    String(Arc<str>),
}

impl PartialOrd for PreReleaseId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PreReleaseId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Numeric(_), Self::String(_)) => Ordering::Less,
            (Self::String(_), Self::Numeric(_)) => Ordering::Greater,
        }
    }
}

/// A fully parsed, Composer-normalized version: `major.minor.patch.fourth`
/// with an optional pre-release tag, or a `dev-<branch>` pseudo-version.
#[derive(Debug, Clone)]
pub struct ComposerVersion {
    major: u64,
    minor: u64,
    patch: u64,
    fourth: u64,
    pre_release: SmallVec<[PreReleaseId; 3]>,
    stability: Stability,
    is_dev_branch: bool,
    branch: Option<Arc<str>>,
    packed: u64,
    original: Arc<str>,
}

const MAX_CACHE_SIZE: usize = 16_384;

static VERSION_CACHE: LazyLock<RwLock<AHashMap<Arc<str>, ComposerVersion>>> =
    LazyLock::new(|| RwLock::new(AHashMap::new()));

static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)
        ^v?
        (?P<major>\d+)
        (?:\.(?P<minor>\d+))?
        (?:\.(?P<patch>\d+))?
        (?:\.(?P<fourth>\d+))?
        (?:[.-]?(?P<pretype>stable|beta|b|rc|alpha|a|patch|pl|p|dev)(?:[.-]?(?P<prenum>\d+))?)?
        (?:\+(?P<build>[0-9A-Za-z-.]+))?
        $",
    )
    .expect("static version regex is valid")
});

impl ComposerVersion {
    /// Parses a Composer-style version string, consulting (and populating)
    /// the process-wide parse cache.
    pub fn parse(input: &str) -> registrar_core::Result<Self> {
        {
            let cache = VERSION_CACHE.read();
            if let Some(hit) = cache.get(input) {
                return Ok(hit.clone());
            }
        }
        let parsed = Self::parse_uncached(input)?;
        let mut cache = VERSION_CACHE.write();
        if cache.len() >= MAX_CACHE_SIZE {
            cache.clear();
        }
        cache.insert(Arc::from(input), parsed.clone());
        Ok(parsed)
    }

    fn parse_uncached(input: &str) -> registrar_core::Result<Self> {
        let original: Arc<str> = Arc::from(input);
        let trimmed = input.trim();

        if let Some(branch) = trimmed.strip_prefix("dev-") {
            return Ok(Self::dev_branch(branch, original));
        }
        if let Some(branch) = trimmed.strip_suffix("-dev") {
            return Ok(Self::dev_branch(branch, original));
        }

        let captures = VERSION_REGEX
            .captures(trimmed)
            .ok_or_else(|| Error::invalid_version(input, "does not match Composer version grammar"))?;

        let major = parse_component(&captures, "major")?;
        let minor = parse_component(&captures, "minor")?;
        let patch = parse_component(&captures, "patch")?;
        let fourth = parse_component(&captures, "fourth")?;

        let stability_tag = captures.name("pretype").map(|m| m.as_str()).unwrap_or("");
        let stability = Stability::parse(stability_tag);
        let pre_release = build_pre_release(stability_tag, captures.name("prenum").map(|m| m.as_str()));

        let packed = pack(major, minor, patch, fourth);

        Ok(Self {
            major,
            minor,
            patch,
            fourth,
            pre_release,
            stability,
            is_dev_branch: false,
            branch: None,
            packed,
            original,
        })
    }

    fn dev_branch(branch: &str, original: Arc<str>) -> Self {
        Self {
            major: 0,
            minor: 0,
            patch: 0,
            fourth: 0,
            pre_release: SmallVec::new(),
            stability: Stability::Dev,
            is_dev_branch: true,
            branch: Some(Arc::from(branch)),
            packed: 0,
            original,
        }
    }

    #[must_use]
    pub fn stability(&self) -> Stability {
        self.stability
    }

    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The canonical, comparable form: `major.minor.patch.fourth` optionally
    /// suffixed with `-<stability><n>` (e.g. `1.2.0.0-beta3`), or
    /// `dev-<branch>` for branch pseudo-versions.
    #[must_use]
    pub fn normalized(&self) -> String {
        if self.is_dev_branch {
            return format!("dev-{}", self.branch.as_deref().unwrap_or(""));
        }
        let mut out = format!("{}.{}.{}.{}", self.major, self.minor, self.patch, self.fourth);
        if self.stability != Stability::Stable {
            out.push('-');
            out.push_str(&self.stability.as_str().to_ascii_lowercase());
            if let Some(PreReleaseId::Numeric(n)) = self.pre_release.first() {
                out.push_str(&n.to_string());
            }
        }
        out
    }
}

impl PartialEq for ComposerVersion {
    fn eq(&self, other: &Self) -> bool {
        if self.is_dev_branch || other.is_dev_branch {
            return self.is_dev_branch == other.is_dev_branch && self.branch == other.branch;
        }
        self.packed == other.packed && self.pre_release == other.pre_release
    }
}

impl Eq for ComposerVersion {}

impl std::hash::Hash for ComposerVersion {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.is_dev_branch {
            self.branch.hash(state);
        } else {
            self.packed.hash(state);
            self.pre_release.hash(state);
        }
    }
}

impl std::hash::Hash for PreReleaseId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Self::Numeric(n) => n.hash(state),
            Self::String(s) => s.hash(state),
        }
    }
}

impl PartialOrd for ComposerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComposerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_dev_branch, other.is_dev_branch) {
            (true, true) => return self.branch.cmp(&other.branch),
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        match self.packed.cmp(&other.packed) {
            Ordering::Equal => {}
            ord => return ord,
        }

        match (self.stability, other.stability) {
            (Stability::Stable, Stability::Stable) => Ordering::Equal,
            (Stability::Stable, _) => Ordering::Greater,
            (_, Stability::Stable) => Ordering::Less,
            _ => self
                .stability
                .cmp(&other.stability)
                .then_with(|| self.pre_release.cmp(&other.pre_release)),
        }
    }
}

fn parse_component(captures: &regex::Captures<'_>, name: &str) -> registrar_core::Result<u64> {
    captures
        .name(name)
        .map(|m| m.as_str().parse::<u64>())
        .transpose()
        .map_err(|_| Error::invalid_version(captures.get(0).map_or("", |m| m.as_str()), "non-numeric component"))
        .map(Option::unwrap_or_default)
}

fn build_pre_release(tag: &str, number: Option<&str>) -> SmallVec<[PreReleaseId; 3]> {
    let mut out = SmallVec::new();
    if tag.is_empty() {
        return out;
    }
    out.push(PreReleaseId::String(Arc::from(tag.to_ascii_lowercase().as_str())));
    if let Some(n) = number.and_then(|s| s.parse::<u64>().ok()) {
        out.push(PreReleaseId::Numeric(n));
    }
    out
}

const fn pack(major: u64, minor: u64, patch: u64, fourth: u64) -> u64 {
    ((major & 0xFFFF) << 48) | ((minor & 0xFFFF) << 32) | ((patch & 0xFFFF) << 16) | (fourth & 0xFFFF)
}
