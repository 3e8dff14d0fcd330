use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The registry's recognized configuration options, per the external
/// interface contract: fallback GitHub tokens used when a managed
/// package has no package-specific credential, whether plugin packages
/// are required to have one registered at all, and the webroot a
/// composer client resolves relative URLs against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub github_fallback_tokens: Vec<String>,

    pub require_plugin_vcs_tokens: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub composer_webroot: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_requires_no_tokens() {
        let config = Config::default();
        assert!(!config.require_plugin_vcs_tokens);
        assert!(config.github_fallback_tokens.is_empty());
    }

    #[test]
    fn roundtrips_through_toml() {
        let config = Config {
            github_fallback_tokens: vec!["ghp_example".to_string()],
            require_plugin_vcs_tokens: true,
            composer_webroot: Some(PathBuf::from("/srv/composer")),
        };
        let encoded = toml::to_string(&config).unwrap();
        let decoded: Config = toml::from_str(&encoded).unwrap();
        assert_eq!(decoded.github_fallback_tokens, config.github_fallback_tokens);
        assert_eq!(decoded.composer_webroot, config.composer_webroot);
    }
}
