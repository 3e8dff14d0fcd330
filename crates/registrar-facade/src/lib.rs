#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;

use registrar_core::{Package, PackageVersion, Result};
use registrar_semver::{SemverOps, Stability};
use registrar_store::Store;

/// The read-only surface consumers of registry data are meant to use,
/// rather than reaching into `Store` directly. Composes `Store` lookups
/// with `SemverOps` so callers never re-implement version ordering or
/// constraint matching themselves.
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn Store>,
    semver: SemverOps,
}

impl Registry {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            semver: SemverOps::new(),
        }
    }

    pub async fn get_package(&self, name: &str) -> Result<Package> {
        self.store.get_package(name).await
    }

    pub async fn get_release(&self, name: &str, version: &str) -> Result<PackageVersion> {
        self.store.get_release(name, version).await
    }

    /// Versions for `name` whose stability meets `min_stability`, ordered
    /// ascending.
    pub async fn versions(&self, name: &str, min_stability: Stability) -> Result<Vec<PackageVersion>> {
        let mut versions = self.store.all_versions(name).await?;
        versions.retain(|v| {
            self.semver
                .parse_stability(&v.version_raw)
                .is_ok_and(|s| s.satisfies_minimum(min_stability))
        });
        let raws: Vec<String> = versions.iter().map(|v| v.version_raw.clone()).collect();
        let ordered = self.semver.sort_ascending(&raws);
        let mut by_raw: std::collections::HashMap<&str, PackageVersion> =
            versions.iter().map(|v| (v.version_raw.as_str(), v.clone())).collect();
        Ok(ordered
            .into_iter()
            .filter_map(|raw| by_raw.remove(raw.as_str()))
            .collect())
    }

    /// The highest version meeting `min_stability`, if any.
    pub async fn get_latest_version(&self, name: &str, min_stability: Stability) -> Result<Option<PackageVersion>> {
        Ok(self.versions(name, min_stability).await?.into_iter().next_back())
    }

    pub fn satisfies(&self, candidate: &str, constraint: &str) -> Result<bool> {
        self.semver.satisfies(candidate, constraint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use registrar_core::{RawJson, VersionState};

    fn version(raw: &str) -> PackageVersion {
        PackageVersion {
            id: 0,
            package_id: 1,
            package_name: "acme/widgets".to_string(),
            version_raw: raw.to_string(),
            version_normalized: raw.to_string(),
            description: None,
            homepage: None,
            license: RawJson::null(),
            keywords: RawJson::null(),
            authors: RawJson::null(),
            support: RawJson::null(),
            funding: RawJson::null(),
            package_type: None,
            source_reference: "x".to_string(),
            dist: RawJson::null(),
            autoload: RawJson::null(),
            autoload_dev: RawJson::null(),
            extra: RawJson::null(),
            bin: RawJson::null(),
            include_path: RawJson::null(),
            target_dir: None,
            conflict: RawJson::null(),
            replace: RawJson::null(),
            provide: RawJson::null(),
            suggest: None,
            abandoned: None,
            time: None,
            state: VersionState::Active,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn versions_orders_ascending_and_filters_by_stability() {
        let store = Arc::new(registrar_store::MemoryStore::new());
        store
            .save_package(Package {
                id: 0,
                name: "acme/widgets".to_string(),
                package_type: "library".to_string(),
                repository_url: "https://github.com/acme/widgets".to_string(),
                vcs_type: "git".to_string(),
                managed: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                latest_version: None,
            })
            .await
            .unwrap();
        store
            .replace_versions(
                "acme/widgets",
                vec![],
                vec![
                    (version("1.0.0-beta1"), vec![]),
                    (version("0.9.0"), vec![]),
                    (version("1.0.0"), vec![]),
                ],
                vec![],
            )
            .await
            .unwrap();

        let registry = Registry::new(store);
        let stable = registry.versions("acme/widgets", Stability::Stable).await.unwrap();
        assert_eq!(
            stable.iter().map(|v| v.version_raw.clone()).collect::<Vec<_>>(),
            vec!["0.9.0", "1.0.0"]
        );

        let latest = registry.get_latest_version("acme/widgets", Stability::Stable).await.unwrap();
        assert_eq!(latest.unwrap().version_raw, "1.0.0");
    }
}
