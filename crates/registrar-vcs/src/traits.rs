use registrar_core::Result;

/// A release manifest read from a VCS at a specific ref, before storage
/// normalization. `manifest` is the raw `composer.json` bytes found at
/// that commit.
#[derive(Debug, Clone)]
pub struct Release {
    pub version_raw: String,
    pub commit_reference: String,
    pub manifest: Vec<u8>,
}

/// A VCS backend capable of listing a repository's tagged versions and
/// fetching the manifest at a given ref. Implementations own their own
/// authentication and transport; `UpdateEngine` only ever sees this trait.
#[async_trait::async_trait]
pub trait VcsAdapter: Send + Sync {
    /// Lists every tag/branch the VCS reports for `repository_url`, without
    /// fetching manifests — used by `UpdateEngine` to diff against storage
    /// before doing the more expensive per-version fetch.
    async fn versions(&self, repository_url: &str) -> Result<Vec<String>>;

    /// Fetches and returns the `composer.json` manifest for `version_raw`
    /// at `repository_url`.
    async fn populate_release(&self, repository_url: &str, version_raw: &str) -> Result<Release>;
}
