use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use registrar_core::{DependencyEdge, Error, RawJson, Result};
use serde::Deserialize;

/// The subset of a `composer.json` manifest the registry stores. Anything
/// not named here still round-trips: unknown top-level keys are simply
/// ignored by `serde`, matching Composer's own tolerant parser.
#[derive(Debug, Deserialize, Default)]
pub struct Manifest {
    pub description: Option<String>,
    pub homepage: Option<String>,
    #[serde(rename = "type")]
    pub package_type: Option<String>,
    #[serde(default)]
    pub license: sonic_rs::Value,
    #[serde(default)]
    pub keywords: sonic_rs::Value,
    #[serde(default)]
    pub authors: sonic_rs::Value,
    #[serde(default)]
    pub support: sonic_rs::Value,
    #[serde(default)]
    pub funding: sonic_rs::Value,
    #[serde(default)]
    pub dist: sonic_rs::Value,
    #[serde(default)]
    pub autoload: sonic_rs::Value,
    #[serde(rename = "autoload-dev", default)]
    pub autoload_dev: sonic_rs::Value,
    #[serde(default)]
    pub extra: sonic_rs::Value,
    #[serde(default)]
    pub bin: sonic_rs::Value,
    #[serde(rename = "include-path", default)]
    pub include_path: sonic_rs::Value,
    #[serde(rename = "target-dir")]
    pub target_dir: Option<String>,
    #[serde(default)]
    pub conflict: sonic_rs::Value,
    #[serde(default)]
    pub replace: sonic_rs::Value,
    #[serde(default)]
    pub provide: sonic_rs::Value,
    pub suggest: Option<BTreeMap<String, String>>,
    pub abandoned: Option<sonic_rs::Value>,
    pub time: Option<String>,
    #[serde(default)]
    pub require: BTreeMap<String, String>,
    #[serde(rename = "require-dev", default)]
    pub require_dev: BTreeMap<String, String>,
}

impl Manifest {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        sonic_rs::from_slice(bytes).map_err(|err| Error::invalid_version("composer.json", err.to_string()))
    }

    #[must_use]
    pub fn dependency_edges(&self, package_version_id: i64) -> Vec<DependencyEdge> {
        let mut edges = Vec::with_capacity(self.require.len() + self.require_dev.len());
        for (name, constraint) in &self.require {
            edges.push(DependencyEdge {
                id: 0,
                package_version_id,
                dependency_name: name.clone(),
                constraint: constraint.clone(),
                dev: false,
            });
        }
        for (name, constraint) in &self.require_dev {
            edges.push(DependencyEdge {
                id: 0,
                package_version_id,
                dependency_name: name.clone(),
                constraint: constraint.clone(),
                dev: true,
            });
        }
        edges
    }

    #[must_use]
    pub fn time_parsed(&self) -> Option<DateTime<Utc>> {
        self.time.as_deref().and_then(|t| t.parse().ok())
    }

    #[must_use]
    pub fn raw(value: &sonic_rs::Value) -> RawJson {
        RawJson(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_require_and_require_dev() {
        let manifest = Manifest::parse(
            br#"{"require": {"php": ">=8.1", "acme/lib": "^2.0"}, "require-dev": {"acme/test-kit": "^1.0"}}"#,
        )
        .unwrap();
        let edges = manifest.dependency_edges(1);
        assert_eq!(edges.len(), 3);
        assert!(edges.iter().any(|e| e.dependency_name == "acme/lib" && !e.dev));
        assert!(edges.iter().any(|e| e.dependency_name == "acme/test-kit" && e.dev));
    }

    #[test]
    fn malformed_manifest_is_an_error() {
        assert!(Manifest::parse(b"{not json").is_err());
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let manifest = Manifest::parse(b"{}").unwrap();
        assert!(manifest.require.is_empty());
        assert!(manifest.suggest.is_none());
    }
}
