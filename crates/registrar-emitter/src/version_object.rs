use std::collections::BTreeMap;

use registrar_core::{DependencyEdge, PackageVersion};
use serde::Serialize;

/// The wire shape of one entry in a provider file's `packages.<name>`
/// version map. Field order is fixed and must not change once anything
/// has been emitted: it is part of the content hash. `dist` is always
/// present, serialized as `null` when the version has none (SPEC_FULL.md
/// §9 decision 3); `suggest` and `require` are omitted entirely when empty
/// rather than emitted as `{}`. `support` and `source` are intentionally
/// not emitted here.
#[derive(Debug, Serialize)]
pub struct VersionObject<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: &'a Option<String>,
    pub keywords: &'a sonic_rs::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: &'a Option<String>,
    pub version: &'a str,
    pub version_normalized: &'a str,
    pub license: &'a sonic_rs::Value,
    pub authors: &'a sonic_rs::Value,
    pub dist: &'a sonic_rs::Value,
    #[serde(rename = "type")]
    pub kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub autoload: &'a sonic_rs::Value,
    #[serde(rename = "autoload-dev")]
    pub autoload_dev: &'a sonic_rs::Value,
    pub extra: &'a sonic_rs::Value,
    #[serde(rename = "target-dir", skip_serializing_if = "Option::is_none")]
    pub target_dir: &'a Option<String>,
    #[serde(rename = "include-path")]
    pub include_path: &'a sonic_rs::Value,
    pub bin: &'a sonic_rs::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require: Option<BTreeMap<&'a str, &'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggest: &'a Option<BTreeMap<String, String>>,
    pub conflict: &'a sonic_rs::Value,
    pub provide: &'a sonic_rs::Value,
    pub replace: &'a sonic_rs::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abandoned: Option<&'a sonic_rs::Value>,
    pub uid: i64,
}

impl<'a> VersionObject<'a> {
    #[must_use]
    pub fn from_version(version: &'a PackageVersion, edges: &'a [DependencyEdge]) -> Self {
        let require: BTreeMap<&'a str, &'a str> = edges
            .iter()
            .filter(|e| !e.dev)
            .map(|e| (e.dependency_name.as_str(), e.constraint.as_str()))
            .collect();

        Self {
            name: &version.package_name,
            description: &version.description,
            keywords: &version.keywords.0,
            homepage: &version.homepage,
            version: &version.version_raw,
            version_normalized: &version.version_normalized,
            license: &version.license.0,
            authors: &version.authors.0,
            dist: &version.dist.0,
            kind: version.package_type.as_deref().unwrap_or("library"),
            time: version.time.map(|t| t.to_rfc3339()),
            autoload: &version.autoload.0,
            autoload_dev: &version.autoload_dev.0,
            extra: &version.extra.0,
            target_dir: &version.target_dir,
            include_path: &version.include_path.0,
            bin: &version.bin.0,
            require: if require.is_empty() { None } else { Some(require) },
            suggest: &version.suggest,
            conflict: &version.conflict.0,
            provide: &version.provide.0,
            replace: &version.replace.0,
            abandoned: version.abandoned.as_ref().map(|a| &a.0),
            uid: version.id,
        }
    }
}
