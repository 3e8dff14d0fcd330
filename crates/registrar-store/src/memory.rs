use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

use ahash::AHashMap;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use registrar_core::{DependencyEdge, Error, Package, PackageVersion, PluginRecord, Result};

use crate::traits::Store;

/// An in-memory `Store` used by tests and single-process demos. Keyed by
/// package name; version rows are kept in an `RwLock<Vec<_>>` rather than a
/// map so insertion order is preserved for deterministic test assertions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    packages: DashMap<String, Package>,
    packages_by_id: DashMap<i64, String>,
    versions: DashMap<String, RwLock<Vec<(PackageVersion, Vec<DependencyEdge>)>>>,
    plugins: DashMap<String, PluginRecord>,
    next_id: AtomicI64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, AtomicOrdering::Relaxed) + 1
    }

    /// Test/seed helper: registers a plugin mirror record ahead of time so
    /// `set_latest`'s mirroring step has somewhere to write.
    pub fn seed_plugin(&self, name: &str) {
        self.plugins.insert(
            name.to_string(),
            PluginRecord {
                id: self.next_id(),
                package_name: name.to_string(),
                latest_version: None,
            },
        );
    }

    #[must_use]
    pub fn plugin_latest_version(&self, name: &str) -> Option<String> {
        self.plugins.get(name).and_then(|p| p.latest_version.clone())
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn package_exists(&self, name: &str) -> Result<bool> {
        Ok(self.packages.contains_key(name))
    }

    async fn list_package_names(&self) -> Result<Vec<String>> {
        Ok(self.packages.iter().map(|entry| entry.key().clone()).collect())
    }

    async fn package_updated_within(&self, name: &str, within: Duration, now: DateTime<Utc>) -> Result<bool> {
        let package = self.get_package(name).await?;
        Ok(now - package.updated_at < within)
    }

    async fn get_package(&self, name: &str) -> Result<Package> {
        self.packages
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| Error::not_found(name))
    }

    async fn get_package_by_id(&self, id: i64) -> Result<Package> {
        let name = self
            .packages_by_id
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or_else(|| Error::not_found(format!("#{id}")))?;
        self.get_package(&name).await
    }

    async fn save_package(&self, mut package: Package) -> Result<Package> {
        if package.id == 0 {
            package.id = self.next_id();
        }
        self.packages_by_id.insert(package.id, package.name.clone());
        self.packages.insert(package.name.clone(), package.clone());
        self.versions.entry(package.name.clone()).or_default();
        Ok(package)
    }

    async fn remove_package(&self, name: &str) -> Result<()> {
        let package = self.get_package(name).await?;
        self.packages.remove(name);
        self.packages_by_id.remove(&package.id);
        self.versions.remove(name);
        self.plugins.remove(name);
        Ok(())
    }

    async fn all_versions(&self, name: &str) -> Result<Vec<PackageVersion>> {
        let versions = self.versions.get(name).ok_or_else(|| Error::not_found(name))?;
        Ok(versions.read().iter().map(|(v, _)| v.clone()).collect())
    }

    async fn get_release(&self, name: &str, version: &str) -> Result<PackageVersion> {
        self.all_versions(name)
            .await?
            .into_iter()
            .find(|v| v.version_raw == version)
            .ok_or_else(|| Error::not_found(format!("{name}:{version}")))
    }

    async fn get_releases(&self, name: &str, versions: &[String]) -> Result<Vec<PackageVersion>> {
        let all = self.all_versions(name).await?;
        Ok(all
            .into_iter()
            .filter(|v| versions.contains(&v.version_raw))
            .collect())
    }

    async fn get_dependency_edges(&self, name: &str, version_raw: &str) -> Result<Vec<DependencyEdge>> {
        let versions = self.versions.get(name).ok_or_else(|| Error::not_found(name))?;
        Ok(versions
            .read()
            .iter()
            .find(|(v, _)| v.version_raw == version_raw)
            .map(|(_, edges)| edges.clone())
            .unwrap_or_default())
    }

    async fn versions_exist(&self, name: &str, constraints: &[String]) -> Result<bool> {
        let all = self.all_versions(name).await.unwrap_or_default();
        let ops = registrar_semver::SemverOps::new();
        Ok(constraints.iter().all(|constraint| {
            all.iter().any(|v| ops.satisfies(&v.version_raw, constraint).unwrap_or(false))
        }))
    }

    async fn is_dependency_version_required(&self, dependency_name: &str, candidate_version: &str) -> Result<bool> {
        let ops = registrar_semver::SemverOps::new();
        for entry in &self.versions {
            for (_, edges) in entry.value().read().iter() {
                for edge in edges {
                    if edge.dependency_name == dependency_name
                        && ops.satisfies(candidate_version, &edge.constraint).unwrap_or(false)
                    {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    async fn replace_versions(
        &self,
        name: &str,
        deleted: Vec<String>,
        new: Vec<(PackageVersion, Vec<DependencyEdge>)>,
        changed: Vec<(PackageVersion, Vec<DependencyEdge>)>,
    ) -> Result<()> {
        let lock = self.versions.entry(name.to_string()).or_default();
        let mut rows = lock.write();
        rows.retain(|(v, _)| !deleted.contains(&v.version_raw));
        for (version, edges) in changed {
            if let Some(slot) = rows.iter_mut().find(|(v, _)| v.version_raw == version.version_raw) {
                *slot = (version, edges);
            } else {
                rows.push((version, edges));
            }
        }
        rows.extend(new);
        Ok(())
    }

    async fn set_latest(&self, name: &str, latest: Option<String>) -> Result<()> {
        if let Some(mut package) = self.packages.get_mut(name) {
            package.latest_version.clone_from(&latest);
        }
        if let Some(mut plugin) = self.plugins.get_mut(name) {
            plugin.latest_version = latest;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn package(name: &str) -> Package {
        Package {
            id: 0,
            name: name.to_string(),
            package_type: "library".to_string(),
            repository_url: format!("https://github.com/{name}"),
            vcs_type: "git".to_string(),
            managed: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            latest_version: None,
        }
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let store = MemoryStore::new();
        let saved = store.save_package(package("acme/widgets")).await.unwrap();
        let fetched = store.get_package("acme/widgets").await.unwrap();
        assert_eq!(saved.id, fetched.id);
    }

    #[tokio::test]
    async fn missing_package_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get_package("nope/nope").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn set_latest_mirrors_onto_plugin_record() {
        let store = MemoryStore::new();
        store.save_package(package("acme/widgets")).await.unwrap();
        store.seed_plugin("acme/widgets");
        store.set_latest("acme/widgets", Some("1.2.0".to_string())).await.unwrap();
        assert_eq!(store.plugin_latest_version("acme/widgets"), Some("1.2.0".to_string()));
    }

    #[tokio::test]
    async fn remove_package_clears_versions() {
        let store = MemoryStore::new();
        store.save_package(package("acme/widgets")).await.unwrap();
        store.remove_package("acme/widgets").await.unwrap();
        assert!(store.get_package("acme/widgets").await.is_err());
    }
}
