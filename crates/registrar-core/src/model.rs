use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An opaque JSON value that round-trips byte-for-byte through the registry
/// without the registry needing to understand its shape. Used for every
/// Composer manifest field the registry stores but never interprets
/// (`autoload`, `extra`, `support`, `authors`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawJson(pub sonic_rs::Value);

impl RawJson {
    #[must_use]
    pub fn null() -> Self {
        Self(sonic_rs::Value::default())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// A mirrored package's registration state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: i64,
    pub name: String,
    /// Composer `type` (e.g. `library`, `composer-plugin`). Operator-set for
    /// managed plugins; `UpdateEngine::cascade` stamps `library` on packages
    /// it auto-creates for a newly seen dependency target.
    pub package_type: String,
    pub repository_url: String,
    pub vcs_type: String,
    /// `true` once a VCS adapter is bound and this package participates in
    /// automated reconciliation. Unmanaged packages are registry-only
    /// records created by an operator before the first VCS sync runs.
    pub managed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Most recently computed latest stable version, mirrored onto the
    /// associated `PluginRecord` by `Store::SetLatest`.
    pub latest_version: Option<String>,
}

/// Where in its lifecycle a stored version currently sits. Drives the diff
/// `UpdateEngine` computes between stored and VCS-reported versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionState {
    Active,
    /// Present in storage but no longer reported by the VCS; retained until
    /// garbage collection removes its provider tree entry.
    Deleted,
}

/// One release of a package, normalized from its VCS-reported manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageVersion {
    pub id: i64,
    pub package_id: i64,
    pub package_name: String,
    /// The raw tag or branch name as reported by the VCS (e.g. `v1.2.0`, `dev-main`).
    pub version_raw: String,
    /// The normalized, comparable form (e.g. `1.2.0.0`, `9999999-dev`).
    pub version_normalized: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub license: RawJson,
    pub keywords: RawJson,
    pub authors: RawJson,
    pub support: RawJson,
    pub funding: RawJson,
    /// Composer `type` as declared by this version's own manifest; `None`
    /// when the manifest omits it (Composer defaults an omitted `type` to
    /// `library`, applied at emission time rather than stored here).
    pub package_type: Option<String>,
    pub source_reference: String,
    /// `null` when absent, never omitted — see SPEC_FULL.md §9 decision 3.
    pub dist: RawJson,
    pub autoload: RawJson,
    pub autoload_dev: RawJson,
    pub extra: RawJson,
    pub bin: RawJson,
    pub include_path: RawJson,
    pub target_dir: Option<String>,
    pub conflict: RawJson,
    pub replace: RawJson,
    pub provide: RawJson,
    /// Present only when the manifest declares it; omitted from emitted
    /// JSON when absent rather than serialized as an empty object.
    pub suggest: Option<BTreeMap<String, String>>,
    pub abandoned: Option<RawJson>,
    pub time: Option<DateTime<Utc>>,
    pub state: VersionState,
    pub updated_at: DateTime<Utc>,
}

/// A `require`/`require-dev` edge from a stored version to a dependency
/// constraint, keyed so `Store::IsDependencyVersionRequired` can answer
/// "is any stored constraint on `dependency_name` still satisfied by
/// `candidate_version`" without re-parsing every version's manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub id: i64,
    pub package_version_id: i64,
    pub dependency_name: String,
    pub constraint: String,
    pub dev: bool,
}

/// The operator-managed mirror record referenced by spec.md's persistence
/// schema. Only `latest_version` is ever written by this system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginRecord {
    pub id: i64,
    pub package_name: String,
    pub latest_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_json_null_roundtrips() {
        let raw = RawJson::null();
        assert!(raw.is_null());
        let encoded = sonic_rs::to_string(&raw).unwrap();
        let decoded: RawJson = sonic_rs::from_str(&encoded).unwrap();
        assert!(decoded.is_null());
    }

    #[test]
    fn version_state_serializes_snake_case() {
        let encoded = sonic_rs::to_string(&VersionState::Deleted).unwrap();
        assert_eq!(encoded, "\"deleted\"");
    }
}
