use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use registrar_core::{Error, Result};
use registrar_queue::JobQueue;
use registrar_store::Store;
use serde::Serialize;
use sha2::Digest;

use crate::atomic::write_atomic;
use crate::version_object::VersionObject;

/// How long a superseded provider-tree file is kept around before
/// garbage collection, so a client mid-download of the old hash doesn't
/// 404.
const GC_DELAY: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Serialize)]
struct RootDocument {
    packages: BTreeMap<String, ()>,
    #[serde(rename = "providers-url")]
    providers_url: String,
    #[serde(rename = "provider-includes")]
    provider_includes: BTreeMap<String, ProviderInclude>,
}

#[derive(Debug, Serialize)]
struct ProviderInclude {
    sha256: String,
}

#[derive(Debug, Serialize)]
struct ProviderDocument<'a> {
    packages: BTreeMap<&'a str, BTreeMap<&'a str, VersionObject<'a>>>,
}

#[derive(Debug, Serialize)]
struct ProviderHashEntry {
    sha256: String,
}

#[derive(Debug, Serialize)]
struct ProviderIndexDocument {
    providers: BTreeMap<String, ProviderHashEntry>,
}

/// Writes the content-addressed Composer provider tree: `packages.json`
/// at the webroot, a single `p/provider/%hash%.json` index, and one
/// `p/%package%/%hash%.json` per package. Superseded files are not
/// deleted immediately — their removal is enqueued with a delay so an
/// in-flight client download of the old hash still succeeds.
pub struct ProviderEmitter {
    store: Arc<dyn Store>,
    queue: Arc<dyn JobQueue>,
    webroot: PathBuf,
}

impl ProviderEmitter {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, queue: Arc<dyn JobQueue>, webroot: PathBuf) -> Self {
        Self { store, queue, webroot }
    }

    /// Runs the full emission pipeline:
    /// 1. Snapshot every registered package name.
    /// 2. For each, load its active versions.
    /// 3. Build that package's provider document and write it atomically,
    ///    tracking which prior file (if any) it supersedes.
    /// 4. Build the provider index (`p/provider/...json`) listing every
    ///    package file's hash, and write it atomically.
    /// 5. Write `packages.json` pointing at the provider index's hash.
    /// 6. Enqueue delayed deletion of every superseded file.
    /// 7. Return the set of package names that were emitted.
    pub async fn dump_provider_json(&self) -> Result<Vec<String>> {
        let names = self.store.list_package_names().await?;
        let mut package_hashes: BTreeMap<String, String> = BTreeMap::new();
        let mut superseded = Vec::new();

        for name in &names {
            let versions = self.store.all_versions(name).await.unwrap_or_default();
            let active: Vec<_> = versions
                .into_iter()
                .filter(|v| v.state == registrar_core::VersionState::Active)
                .collect();
            if active.is_empty() {
                continue;
            }

            let mut edges_by_version = Vec::with_capacity(active.len());
            for version in &active {
                let edges = self.store.get_dependency_edges(name, &version.version_raw).await.unwrap_or_default();
                edges_by_version.push(edges);
            }
            let mut per_version = BTreeMap::new();
            for (version, edges) in active.iter().zip(&edges_by_version) {
                per_version.insert(version.version_raw.as_str(), VersionObject::from_version(version, edges));
            }
            let mut packages = BTreeMap::new();
            packages.insert(name.as_str(), per_version);
            let document = ProviderDocument { packages };
            let body = sonic_rs::to_string(&document).map_err(|err| Error::emit_failure("serializing provider document", err))?;

            let hash = hex::encode(sha2::Sha256::digest(body.as_bytes()));
            let target = self.webroot.join("p").join(name).join(format!("{hash}.json"));
            if let Some(previous) = self.previous_file(&self.webroot.join("p").join(name)) {
                if previous != target {
                    superseded.push(previous.display().to_string());
                }
            }
            write_atomic(&target, body.as_bytes())?;
            package_hashes.insert(name.clone(), hash);
        }

        let provider_index = ProviderIndexDocument {
            providers: package_hashes
                .iter()
                .map(|(name, hash)| (name.clone(), ProviderHashEntry { sha256: hash.clone() }))
                .collect(),
        };
        let provider_index_body = sonic_rs::to_string(&provider_index)
            .map_err(|err| Error::emit_failure("serializing provider index", err))?;
        let provider_hash = hex::encode(sha2::Sha256::digest(provider_index_body.as_bytes()));
        let provider_dir = self.webroot.join("p").join("provider");
        let provider_target = provider_dir.join(format!("{provider_hash}.json"));
        if let Some(previous) = self.previous_file(&provider_dir) {
            if previous != provider_target {
                superseded.push(previous.display().to_string());
            }
        }
        write_atomic(&provider_target, provider_index_body.as_bytes())?;

        let mut provider_includes = BTreeMap::new();
        provider_includes.insert(
            "p/provider/%hash%.json".to_string(),
            ProviderInclude { sha256: provider_hash },
        );
        let root = RootDocument {
            packages: BTreeMap::new(),
            providers_url: "/p/%package%/%hash%.json".to_string(),
            provider_includes,
        };
        let root_body = sonic_rs::to_string(&root).map_err(|err| Error::emit_failure("serializing root document", err))?;
        write_atomic(&self.webroot.join("packages.json"), root_body.as_bytes())?;

        if !superseded.is_empty() {
            self.queue.enqueue_delete_with_delay(superseded, GC_DELAY).await?;
        }

        Ok(names)
    }

    /// The single existing file in `dir`, if any — provider files are
    /// content-addressed, so a directory holding more than the current
    /// generation means a previous emission wasn't yet collected.
    fn previous_file(&self, dir: &Path) -> Option<PathBuf> {
        std::fs::read_dir(dir)
            .ok()?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .find(|path| path.extension().is_some_and(|ext| ext == "json"))
    }
}
