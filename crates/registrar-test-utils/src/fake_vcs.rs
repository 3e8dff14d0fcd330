use std::collections::HashMap;

use parking_lot::Mutex;
use registrar_core::{Error, Result};
use registrar_vcs::{Release, VcsAdapter};

/// An in-memory stand-in for a real VCS, used by integration tests so they
/// never make network calls. Seeded with tag -> manifest-bytes pairs.
#[derive(Debug, Default)]
pub struct FakeVcsAdapter {
    manifests: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeVcsAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tag(self, tag: &str, manifest_json: &str) -> Self {
        self.manifests.lock().insert(tag.to_string(), manifest_json.as_bytes().to_vec());
        self
    }

    pub fn remove_tag(&self, tag: &str) {
        self.manifests.lock().remove(tag);
    }
}

#[async_trait::async_trait]
impl VcsAdapter for FakeVcsAdapter {
    async fn versions(&self, _repository_url: &str) -> Result<Vec<String>> {
        Ok(self.manifests.lock().keys().cloned().collect())
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
