use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use registrar_core::{DependencyEdge, Error, Package, PackageVersion, RawJson, Result, VersionState};
use registrar_engine::UpdateEngine;
use registrar_queue::{Job, JobQueue, TokioJobQueue};
use registrar_store::{MemoryStore, Store};
use registrar_vcs::{Release, VcsAdapter};

struct FakeAdapter {
    tags: Mutex<Vec<String>>,
    manifests: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeAdapter {
    fn new() -> Self {
        Self {
            tags: Mutex::new(Vec::new()),
            manifests: Mutex::new(HashMap::new()),
        }
    }

    fn with_version(self, tag: &str, manifest: &str) -> Self {
        self.tags.lock().push(tag.to_string());
        self.manifests.lock().insert(tag.to_string(), manifest.as_bytes().to_vec());
        self
    }
}

#[async_trait::async_trait]
impl VcsAdapter for FakeAdapter {
    async fn versions(&self, _repository_url: &str) -> Result<Vec<String>> {
        Ok(self.tags.lock().clone())
    }

    async fn populate_release(&self, _repository_url: &str, version_raw: &str) -> Result<Release> {
        let manifest = self
            .manifests
            .lock()
            .get(version_raw)
            .cloned()
            .ok_or_else(|| Error::not_found(version_raw))?;
        Ok(Release {
            version_raw: version_raw.to_string(),
            commit_reference: format!("sha-{version_raw}"),
            manifest,
        })
    }
}

fn package(name: &str) -> Package {
    Package {
        id: 0,
        name: name.to_string(),
        package_type: "library".to_string(),
        repository_url: format!("https://github.com/{name}"),
        vcs_type: "git".to_string(),
        managed: true,
        created_at: Utc::now() - chrono::Duration::hours(1),
        updated_at: Utc::now() - chrono::Duration::hours(1),
        latest_version: None,
    }
}

#[tokio::test]
async fn new_versions_are_discovered_and_latest_is_set() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    store.save_package(package("acme/widgets")).await.unwrap();

    let adapter: Arc<dyn VcsAdapter> = Arc::new(
        FakeAdapter::new()
            .with_version("1.0.0", r#"{"description": "v1"}"#)
            .with_version("1.1.0", r#"{"description": "v1.1"}"#),
    );
    let (queue, _rx) = TokioJobQueue::new();
    let engine = UpdateEngine::new(store.clone(), move |_, _| Ok(adapter.clone()), Arc::new(queue));

    engine.update_package("acme/widgets", true).await.unwrap();

    let versions = store.all_versions("acme/widgets").await.unwrap();
    assert_eq!(versions.len(), 2);

    let package = store.get_package("acme/widgets").await.unwrap();
    assert_eq!(package.latest_version.as_deref(), Some("1.1.0"));
}

#[tokio::test]
async fn deleted_tags_are_removed_from_storage() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    store.save_package(package("acme/widgets")).await.unwrap();

    let adapter = Arc::new(FakeAdapter::new().with_version("1.0.0", "{}"));
    let adapter_dyn: Arc<dyn VcsAdapter> = adapter.clone();
    let (queue, _rx) = TokioJobQueue::new();
    let engine = UpdateEngine::new(store.clone(), move |_, _| Ok(adapter_dyn.clone()), Arc::new(queue));
    engine.update_package("acme/widgets", true).await.unwrap();
    assert_eq!(store.all_versions("acme/widgets").await.unwrap().len(), 1);

    adapter.tags.lock().clear();
    engine.update_package("acme/widgets", true).await.unwrap();
    assert!(store.all_versions("acme/widgets").await.unwrap().is_empty());
}

#[tokio::test]
async fn non_forced_update_within_debounce_is_skipped() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let mut fresh = package("acme/widgets");
    fresh.updated_at = Utc::now();
    store.save_package(fresh).await.unwrap();

    let adapter: Arc<dyn VcsAdapter> = Arc::new(FakeAdapter::new().with_version("1.0.0", "{}"));
    let (queue, _rx) = TokioJobQueue::new();
    let engine = UpdateEngine::new(store.clone(), move |_, _| Ok(adapter.clone()), Arc::new(queue));

    engine.update_package("acme/widgets", false).await.unwrap();
    assert!(store.all_versions("acme/widgets").await.unwrap().is_empty());
}

#[tokio::test]
async fn transitive_dependency_is_enqueued_when_already_tracked() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    store.save_package(package("acme/widgets")).await.unwrap();
    store.save_package(package("acme/lib")).await.unwrap();

    let adapter: Arc<dyn VcsAdapter> = Arc::new(
        FakeAdapter::new().with_version("1.0.0", r#"{"require": {"acme/lib": "^1.0"}}"#),
    );
    let (queue, mut rx) = TokioJobQueue::new();
    let engine = UpdateEngine::new(store.clone(), move |_, _| Ok(adapter.clone()), Arc::new(queue));

    engine.update_package("acme/widgets", true).await.unwrap();

    let job = rx.recv().await.unwrap();
    assert_eq!(
        job,
        Job::UpdatePackage {
            name: "acme/lib".to_string(),
            force: false
        }
    );
}

#[tokio::test]
async fn repeated_forced_update_is_idempotent() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    store.save_package(package("acme/widgets")).await.unwrap();

    let adapter: Arc<dyn VcsAdapter> = Arc::new(FakeAdapter::new().with_version("1.0.0", "{}"));
    let (queue, _rx) = TokioJobQueue::new();
    let engine = UpdateEngine::new(store.clone(), move |_, _| Ok(adapter.clone()), Arc::new(queue));

    engine.update_package("acme/widgets", true).await.unwrap();
    engine.update_package("acme/widgets", true).await.unwrap();

    assert_eq!(store.all_versions("acme/widgets").await.unwrap().len(), 1);
}

#[tokio::test]
async fn latest_version_survives_a_run_with_no_new_tags() {
    // A second run whose VCS snapshot re-reports nothing new processes an
    // empty `new` set; `latest_version` is left untouched rather than
    // recomputed from an empty set (SPEC_FULL.md §9 decision 1).
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    store.save_package(package("acme/widgets")).await.unwrap();

    let first_run = Arc::new(FakeAdapter::new().with_version("2.0.0", "{}"));
    let first_dyn: Arc<dyn VcsAdapter> = first_run.clone();
    let (queue, _rx) = TokioJobQueue::new();
    let engine = UpdateEngine::new(store.clone(), move |_, _| Ok(first_dyn.clone()), Arc::new(queue));
    engine.update_package("acme/widgets", true).await.unwrap();
    assert_eq!(
        store.get_package("acme/widgets").await.unwrap().latest_version.as_deref(),
        Some("2.0.0")
    );

    engine.update_package("acme/widgets", true).await.unwrap();
    assert_eq!(
        store.get_package("acme/widgets").await.unwrap().latest_version.as_deref(),
        Some("2.0.0")
    );
}

#[tokio::test]
async fn transitive_library_ignored_until_constraint_recorded() {
    // acme/lib is unmanaged (a transitive dependency, never operator-tracked).
    // Its VCS reports both 1.0.0 and 2.0.0, but no stored edge requires
    // 2.0.0 yet, so only 1.0.0 should be ingested.
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let mut lib = package("acme/lib");
    lib.managed = false;
    store.save_package(lib).await.unwrap();

    // Edges are keyed by the *referencing* version, so the constraint on
    // acme/lib is recorded against a stored consumer package's version.
    let edge = DependencyEdge {
        id: 0,
        package_version_id: 0,
        dependency_name: "acme/lib".to_string(),
        constraint: "^1.0".to_string(),
        dev: false,
    };
    store.save_package(package("acme/widgets-consumer")).await.unwrap();
    store
        .replace_versions(
            "acme/widgets-consumer",
            vec![],
            vec![(consumer_version(), vec![edge])],
            vec![],
        )
        .await
        .unwrap();

    let adapter: Arc<dyn VcsAdapter> = Arc::new(
        FakeAdapter::new()
            .with_version("1.0.0", "{}")
            .with_version("2.0.0", "{}"),
    );
    let (queue, _rx) = TokioJobQueue::new();
    let engine = UpdateEngine::new(store.clone(), move |_, _| Ok(adapter.clone()), Arc::new(queue));
    engine.update_package("acme/lib", true).await.unwrap();

    let versions = store.all_versions("acme/lib").await.unwrap();
    let raws: Vec<&str> = versions.iter().map(|v| v.version_raw.as_str()).collect();
    assert_eq!(raws, vec!["1.0.0"]);
}

fn consumer_version() -> PackageVersion {
    PackageVersion {
        id: 0,
        package_id: 0,
        package_name: "acme/widgets-consumer".to_string(),
        version_raw: "1.0.0".to_string(),
        version_normalized: "1.0.0.0".to_string(),
        description: None,
        homepage: None,
        license: RawJson::null(),
        keywords: RawJson::null(),
        authors: RawJson::null(),
        support: RawJson::null(),
        funding: RawJson::null(),
        package_type: None,
        source_reference: "deadbeef".to_string(),
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
