use std::sync::Arc;

use base64::Engine;
use dashmap::DashMap;
use registrar_core::{Error, Result};
use serde::Deserialize;
use url::Url;

use crate::traits::{Release, VcsAdapter};

const API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub api_url: String,
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: API_BASE.to_string(),
            token: None,
        }
    }
}

#[derive(Deserialize)]
struct GitHubTag {
    name: String,
}

#[derive(Deserialize)]
struct GitHubContentResponse {
    content: String,
    sha: String,
}

/// A `VcsAdapter` backed by the GitHub REST API: tags become candidate
/// versions, and a tag's manifest is read via the contents API at that ref.
pub struct GitHubAdapter {
    config: GitHubConfig,
    http: reqwest::Client,
    cache: Arc<DashMap<String, Vec<u8>>>,
}

impl std::fmt::Debug for GitHubAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubAdapter")
            .field("api_url", &self.config.api_url)
            .finish_non_exhaustive()
    }
}

impl GitHubAdapter {
    #[must_use]
    pub fn new(config: GitHubConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            cache: Arc::new(DashMap::new()),
        }
    }

    fn owner_repo(repository_url: &str) -> Result<(String, String)> {
        let url = Url::parse(repository_url)
            .map_err(|err| Error::invalid_version(repository_url, err.to_string()))?;
        let mut segments = url
            .path_segments()
            .ok_or_else(|| Error::invalid_version(repository_url, "no path segments"))?;
        let owner = segments
            .next()
            .ok_or_else(|| Error::invalid_version(repository_url, "missing owner"))?
            .to_string();
        let repo = segments
            .next()
            .ok_or_else(|| Error::invalid_version(repository_url, "missing repo"))?
            .trim_end_matches(".git")
            .to_string();
        Ok((owner, repo))
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .get(url)
            .header("User-Agent", "registrar")
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn get_file_contents(&self, owner: &str, repo: &str, path: &str, reference: &str) -> Result<Vec<u8>> {
        let cache_key = format!("github:{owner}/{repo}/{path}@{reference}");
        if let Some(hit) = self.cache.get(&cache_key) {
            return Ok(hit.clone());
        }

        let url = format!(
            "{}/repos/{owner}/{repo}/contents/{path}?ref={reference}",
            self.config.api_url
        );
        tracing::debug!(%url, "fetching file contents from github");
        let response = self
            .request(&url)
            .send()
            .await
            .map_err(|err| Error::vcs_transient(format!("{owner}/{repo}"), "github request failed", err))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::vcs_transient(
                format!("{owner}/{repo}"),
                format!("github returned {status}"),
                std::io::Error::other(status.to_string()),
            ));
        }

        let body: GitHubContentResponse = response
            .json()
            .await
            .map_err(|err| Error::vcs_transient(format!("{owner}/{repo}"), "invalid github response", err))?;
        tracing::trace!(sha = %body.sha, "decoded github content sha");

        let cleaned: String = body.content.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(cleaned)
            .map_err(|err| Error::invalid_version(path, err.to_string()))?;

        self.cache.insert(cache_key, decoded.clone());
        Ok(decoded)
    }

    async fn list_tags(&self, owner: &str, repo: &str) -> Result<Vec<GitHubTag>> {
        let url = format!("{}/repos/{owner}/{repo}/tags?per_page=100", self.config.api_url);
        tracing::debug!(%url, "listing github tags");
        let response = self
            .request(&url)
            .send()
            .await
            .map_err(|err| Error::vcs_transient(format!("{owner}/{repo}"), "github request failed", err))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::vcs_transient(
                format!("{owner}/{repo}"),
                format!("github returned {status}"),
                std::io::Error::other(status.to_string()),
            ));
        }

        response
            .json()
            .await
            .map_err(|err| Error::vcs_transient(format!("{owner}/{repo}"), "invalid github response", err))
    }
}

#[async_trait::async_trait]
impl VcsAdapter for GitHubAdapter {
    async fn versions(&self, repository_url: &str) -> Result<Vec<String>> {
        let (owner, repo) = Self::owner_repo(repository_url)?;
        let tags = self.list_tags(&owner, &repo).await?;
        Ok(tags.into_iter().map(|t| t.name).collect())
    }

    async fn populate_release(&self, repository_url: &str, version_raw: &str) -> Result<Release> {
        let (owner, repo) = Self::owner_repo(repository_url)?;
        let manifest = self
            .get_file_contents(&owner, &repo, "composer.json", version_raw)
            .await?;
        Ok(Release {
            version_raw: version_raw.to_string(),
            commit_reference: version_raw.to_string(),
            manifest,
        })
    }
}
