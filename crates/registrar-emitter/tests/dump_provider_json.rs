use std::sync::Arc;

use chrono::Utc;
use registrar_core::{Package, PackageVersion, RawJson, VersionState};
use registrar_emitter::ProviderEmitter;
use registrar_queue::TokioJobQueue;
use registrar_store::{MemoryStore, Store};

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

fn version(name: &str, raw: &str) -> PackageVersion {
    PackageVersion {
        id: 0,
        package_id: 0,
        package_name: name.to_string(),
        version_raw: raw.to_string(),
        version_normalized: format!("{raw}.0"),
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

#[tokio::test]
async fn emits_packages_json_and_provider_tree() {
    let store = Arc::new(MemoryStore::new());
    store.save_package(package("acme/widgets")).await.unwrap();
    store
        .replace_versions("acme/widgets", vec![], vec![(version("acme/widgets", "1.0.0"), vec![])], vec![])
        .await
        .unwrap();

    let (queue, _rx) = TokioJobQueue::new();
    let webroot = tempfile::tempdir().unwrap();
    let emitter = ProviderEmitter::new(store.clone(), Arc::new(queue), webroot.path().to_path_buf());

    let emitted = emitter.dump_provider_json().await.unwrap();
    assert_eq!(emitted, vec!["acme/widgets".to_string()]);

    assert!(webroot.path().join("packages.json").exists());
    let provider_dir = webroot.path().join("p").join("provider");
    assert_eq!(std::fs::read_dir(&provider_dir).unwrap().count(), 1);
    let package_dir = webroot.path().join("p").join("acme/widgets");
    assert_eq!(std::fs::read_dir(&package_dir).unwrap().count(), 1);
}

#[tokio::test]
async fn packages_with_no_active_versions_are_skipped() {
    let store = Arc::new(MemoryStore::new());
    store.save_package(package("acme/empty")).await.unwrap();

    let (queue, _rx) = TokioJobQueue::new();
    let webroot = tempfile::tempdir().unwrap();
    let emitter = ProviderEmitter::new(store, Arc::new(queue), webroot.path().to_path_buf());

    emitter.dump_provider_json().await.unwrap();
    assert!(!webroot.path().join("p").join("acme/empty").exists());
}
