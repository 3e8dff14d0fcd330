use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use chrono::{Duration, Utc};
use dashmap::DashMap;
use registrar_core::{DependencyEdge, Error, Package, PackageVersion, Result, VersionState};
use registrar_queue::JobQueue;
use registrar_semver::{SemverOps, Stability};
use registrar_store::Store;
use registrar_vcs::VcsAdapter;
use tokio::sync::Mutex as AsyncMutex;

use crate::manifest::Manifest;

/// How long a package is left alone after a non-forced update before it is
/// eligible for reconciliation again.
const DEBOUNCE: Duration = Duration::minutes(5);

/// Reconciles one package's stored versions against what its VCS reports,
/// cascading into transitive library dependencies via the job queue rather
/// than recursive calls.
pub struct UpdateEngine {
    store: Arc<dyn Store>,
    adapter_for: Arc<dyn Fn(&str, &str) -> Result<Arc<dyn VcsAdapter>> + Send + Sync>,
    queue: Arc<dyn JobQueue>,
    semver: SemverOps,
    locks: DashMap<String, Arc<AsyncMutex<()>>>,
}

impl UpdateEngine {
    pub fn new(
        store: Arc<dyn Store>,
        adapter_for: impl Fn(&str, &str) -> Result<Arc<dyn VcsAdapter>> + Send + Sync + 'static,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            store,
            adapter_for: Arc::new(adapter_for),
            queue,
            semver: SemverOps::new(),
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, name: &str) -> Arc<AsyncMutex<()>> {
        self.locks.entry(name.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// The full reconciliation algorithm for a single package:
    /// 1. Load the package record (`NotFound` if unknown).
    /// 2. Skip unforced updates within the debounce window.
    /// 3. Select a VCS adapter for the package's repository.
    /// 4. List VCS-reported versions.
    /// 5. Load stored versions.
    /// 6. Filter VCS-reported versions: reject `dev` stability; for a
    ///    `managed=false` package, keep only versions some stored
    ///    `DependencyEdge` already requires (`is_dependency_version_required`).
    /// 7. Diff the filtered set into deleted / new / changed.
    /// 8. Fetch and parse manifests for new and changed versions.
    /// 9. Write the diff to storage as one transactional group.
    /// 10. If `new` is empty, stop — `latest_version` is left untouched
    ///     rather than recomputed from an empty set. Otherwise recompute and
    ///     store it, from the `new` set only (see SPEC_FULL.md §9 decision 1).
    /// 11. Enqueue reconciliation for any dependency not yet tracked, or
    ///     auto-create one that has never been seen before.
    pub async fn update_package(&self, name: &str, force: bool) -> Result<()> {
        let lock = self.lock_for(name);
        let _guard = lock.lock().await;

        let package = self.store.get_package(name).await?;
        if !force && self.store.package_updated_within(name, DEBOUNCE, Utc::now()).await? {
            tracing::debug!(%name, "skipping update, within debounce window");
            return Ok(());
        }

        let adapter = (self.adapter_for)(name, &package.repository_url)?;
        let vcs_versions = adapter.versions(&package.repository_url).await?;
        let stored_versions = self.store.all_versions(name).await.unwrap_or_default();

        let filtered_vcs = self.filter_vcs_versions(&package, &vcs_versions).await;

        let vcs_set: AHashSet<&str> = vcs_versions.iter().map(String::as_str).collect();
        let filtered_set: AHashSet<&str> = filtered_vcs.iter().map(String::as_str).collect();
        let stored_set: AHashSet<&str> = stored_versions.iter().map(|v| v.version_raw.as_str()).collect();

        let deleted: Vec<String> = stored_versions
            .iter()
            .filter(|v| !vcs_set.contains(v.version_raw.as_str()))
            .map(|v| v.version_raw.clone())
            .collect();
        let new_tags: Vec<&str> = filtered_vcs
            .iter()
            .map(String::as_str)
            .filter(|v| !stored_set.contains(v))
            .collect();

        let mut new_entries = Vec::new();
        let mut discovered_deps: Vec<DependencyEdge> = Vec::new();
        for tag in &new_tags {
            let Some(entry) = self.fetch_version(&package, &*adapter, tag).await? else {
                continue;
            };
            discovered_deps.extend(entry.1.clone());
            new_entries.push(entry);
        }

        let changed_entries = self
            .refetch_changed(&package, &*adapter, &stored_versions, &vcs_versions)
            .await?;
        for (_, edges) in &changed_entries {
            discovered_deps.extend(edges.clone());
        }

        self.store
            .replace_versions(name, deleted, new_entries.clone(), changed_entries)
            .await?;

        let mut updated = package;
        updated.updated_at = Utc::now();
        self.store.save_package(updated).await?;

        if new_entries.is_empty() {
            self.cascade(&discovered_deps).await?;
            return Ok(());
        }

        let latest = self.latest_from(&new_entries);
        self.store.set_latest(name, latest).await?;

        self.cascade(&discovered_deps).await?;
        Ok(())
    }

    /// §4.4 step 3: rejects `dev`-stability tags outright, and for a
    /// `managed=false` package (a transitive library, never operator-tracked)
    /// rejects any version no stored `DependencyEdge` currently requires —
    /// otherwise an unmanaged library would ingest its entire tag history the
    /// first time anything enqueues it, rather than only the versions
    /// something actually depends on.
    async fn filter_vcs_versions(&self, package: &Package, vcs_versions: &[String]) -> Vec<String> {
        let mut kept = Vec::with_capacity(vcs_versions.len());
        for raw in vcs_versions {
            if self.semver.parse_stability(raw).is_ok_and(|s| s == Stability::Dev) {
                continue;
            }
            if !package.managed {
                let required = self
                    .store
                    .is_dependency_version_required(&package.name, raw)
                    .await
                    .unwrap_or(false);
                if !required {
                    continue;
                }
            }
            kept.push(raw.clone());
        }
        kept
    }

    /// Computes the latest version from the newly-processed set only.
    fn latest_from(&self, new_entries: &[(PackageVersion, Vec<DependencyEdge>)]) -> Option<String> {
        let raws: Vec<String> = new_entries
            .iter()
            .filter(|(v, _)| v.state == VersionState::Active)
            .map(|(v, _)| v.version_raw.clone())
            .collect();
        self.semver
            .sort_ascending(&raws)
            .into_iter()
            .filter(|raw| self.semver.parse_stability(raw).is_ok_and(|s| s.satisfies_minimum(registrar_semver::Stability::Stable)))
            .next_back()
    }

    async fn fetch_version(
        &self,
        package: &Package,
        adapter: &dyn VcsAdapter,
        tag: &str,
    ) -> Result<Option<(PackageVersion, Vec<DependencyEdge>)>> {
        let release = match adapter.populate_release(&package.repository_url, tag).await {
            Ok(release) => release,
            Err(err) if err.is_retryable() => return Err(err),
            Err(err) => {
                tracing::warn!(%tag, error = %err, "skipping unreadable tag");
                return Ok(None);
            }
        };

        let manifest = Manifest::parse(&release.manifest)?;
        let normalized = self.semver.normalize(tag)?;

        let version = PackageVersion {
            id: 0,
            package_id: package.id,
            package_name: package.name.clone(),
            version_raw: tag.to_string(),
            version_normalized: normalized,
            description: manifest.description.clone(),
            homepage: manifest.homepage.clone(),
            license: Manifest::raw(&manifest.license),
            keywords: Manifest::raw(&manifest.keywords),
            authors: Manifest::raw(&manifest.authors),
            support: Manifest::raw(&manifest.support),
            funding: Manifest::raw(&manifest.funding),
            package_type: manifest.package_type.clone(),
            source_reference: release.commit_reference,
            dist: Manifest::raw(&manifest.dist),
            autoload: Manifest::raw(&manifest.autoload),
            autoload_dev: Manifest::raw(&manifest.autoload_dev),
            extra: Manifest::raw(&manifest.extra),
            bin: Manifest::raw(&manifest.bin),
            include_path: Manifest::raw(&manifest.include_path),
            target_dir: manifest.target_dir.clone(),
            conflict: Manifest::raw(&manifest.conflict),
            replace: Manifest::raw(&manifest.replace),
            provide: Manifest::raw(&manifest.provide),
            suggest: manifest.suggest.clone(),
            abandoned: manifest.abandoned.clone().map(registrar_core::RawJson),
            time: manifest.time_parsed(),
            state: VersionState::Active,
            updated_at: Utc::now(),
        };

        let edges = manifest.dependency_edges(version.id);
        Ok(Some((version, edges)))
    }

    /// Detects SHA drift on versions both stored and still VCS-reported by
    /// comparing each tag's current commit against what was stored, and
    /// re-fetches the manifest for any that moved.
    async fn refetch_changed(
        &self,
        package: &Package,
        adapter: &dyn VcsAdapter,
        stored_versions: &[PackageVersion],
        vcs_versions: &[String],
    ) -> Result<Vec<(PackageVersion, Vec<DependencyEdge>)>> {
        let vcs_set: AHashSet<&str> = vcs_versions.iter().map(String::as_str).collect();
        let mut changed = Vec::new();
        for stored in stored_versions {
            if !vcs_set.contains(stored.version_raw.as_str()) {
                continue;
            }
            let release = match adapter.populate_release(&package.repository_url, &stored.version_raw).await {
                Ok(release) => release,
                Err(err) if err.is_retryable() => return Err(err),
                Err(_) => continue,
            };
            if release.commit_reference == stored.source_reference {
                continue;
            }
            if let Some(entry) = self.fetch_version(package, adapter, &stored.version_raw).await? {
                changed.push(entry);
            }
        }
        Ok(changed)
    }

    /// §4.4 step 9 / step 11: for each distinct dependency target named by
    /// `edges` (platform packages excluded), either auto-create it as an
    /// unmanaged library and enqueue its first reconciliation, or — if it's
    /// already tracked — enqueue only when its stored versions don't already
    /// satisfy every constraint placed on it.
    async fn cascade(&self, edges: &[DependencyEdge]) -> Result<()> {
        let mut by_name: AHashMap<String, Vec<String>> = AHashMap::default();
        for edge in edges {
            if registrar_semver::is_platform_package(&edge.dependency_name) {
                continue;
            }
            by_name.entry(edge.dependency_name.clone()).or_default().push(edge.constraint.clone());
        }

        for (dependency_name, constraints) in by_name {
            if !self.store.package_exists(&dependency_name).await.unwrap_or(false) {
                let now = Utc::now();
                self.store
                    .save_package(Package {
                        id: 0,
                        name: dependency_name.clone(),
                        package_type: "library".to_string(),
                        repository_url: format!("https://github.com/{dependency_name}"),
                        vcs_type: "git".to_string(),
                        managed: false,
                        created_at: now,
                        updated_at: now,
                        latest_version: None,
                    })
                    .await?;
                self.queue.enqueue_update(&dependency_name, false).await?;
                continue;
            }

            if !self.store.versions_exist(&dependency_name, &constraints).await.unwrap_or(false) {
                self.queue.enqueue_update(&dependency_name, false).await?;
            }
        }
        Ok(())
    }
}
