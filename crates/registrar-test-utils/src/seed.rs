use chrono::{DateTime, Utc};
use registrar_core::Package;
use registrar_store::Store;

/// Registers a managed package with a deterministic `GitHub` URL, useful
/// wherever a test only cares about the package existing, not its
/// metadata.
pub async fn seed_package(store: &dyn Store, name: &str, updated_at: DateTime<Utc>) -> Package {
    store
        .save_package(Package {
            id: 0,
            name: name.to_string(),
            package_type: "library".to_string(),
            repository_url: format!("https://github.com/{name}"),
            vcs_type: "git".to_string(),
            managed: true,
            created_at: updated_at,
            updated_at,
            latest_version: None,
        })
        .await
        .expect("seeding a fresh package never conflicts")
}

#[cfg(test)]
mod tests {
    use super::*;
    use registrar_store::MemoryStore;

    #[tokio::test]
    async fn seed_package_registers_a_managed_package() {
        let store = MemoryStore::new();
        let package = seed_package(&store, "acme/widgets", Utc::now()).await;
        assert!(package.managed);
        assert!(store.package_exists("acme/widgets").await.unwrap());
    }
}
