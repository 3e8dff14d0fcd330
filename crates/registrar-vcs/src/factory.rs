use std::sync::Arc;

use registrar_config::Config;
use registrar_core::{Error, Result};
use url::Url;

use crate::github::{GitHubAdapter, GitHubConfig};
use crate::traits::VcsAdapter;

/// Builds the right `VcsAdapter` for a package's repository host, enforcing
/// the `requirePluginVcsTokens` policy: a managed package whose host has no
/// registered credential and whose config requires one fails fast with
/// `MissingToken` rather than making an unauthenticated (and likely
/// rate-limited) request.
#[derive(Debug, Clone)]
pub struct AdapterFactory {
    config: Config,
}

impl AdapterFactory {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn adapter_for(&self, package_name: &str, repository_url: &str) -> Result<Arc<dyn VcsAdapter>> {
        let url = Url::parse(repository_url)
            .map_err(|err| Error::invalid_version(repository_url, err.to_string()))?;

        match url.host_str() {
            Some(host) if host.ends_with("github.com") => {
                let token = self.config.github_fallback_tokens.first().cloned();
                if token.is_none() && self.config.require_plugin_vcs_tokens {
                    return Err(Error::missing_token(package_name));
                }
                Ok(Arc::new(GitHubAdapter::new(GitHubConfig {
                    api_url: "https://api.github.com".to_string(),
                    token,
                })))
            }
            Some(host) => Err(Error::invalid_version(repository_url, format!("unsupported VCS host {host}"))),
            None => Err(Error::invalid_version(repository_url, "missing host")),
        }
    }
}
