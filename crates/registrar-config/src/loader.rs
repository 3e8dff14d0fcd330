use std::path::Path;

use registrar_core::{Error, Result};

use crate::types::Config;

/// Loads configuration from a TOML file, then applies `REGISTRAR_*`
/// environment overrides on top. Missing file is not an error — a fresh
/// registry starts from defaults.
pub fn load(path: &Path) -> Result<Config> {
    let mut config = match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents)
            .map_err(|err| Error::invalid_version(path.display().to_string(), err.to_string()))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Config::default(),
        Err(err) => return Err(Error::invalid_version(path.display().to_string(), err.to_string())),
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(tokens) = std::env::var("REGISTRAR_GITHUB_FALLBACK_TOKENS") {
        config.github_fallback_tokens = tokens
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Ok(flag) = std::env::var("REGISTRAR_REQUIRE_PLUGIN_VCS_TOKENS") {
        config.require_plugin_vcs_tokens = flag == "1" || flag.eq_ignore_ascii_case("true");
    }
    if let Ok(webroot) = std::env::var("REGISTRAR_COMPOSER_WEBROOT") {
        config.composer_webroot = Some(webroot.into());
    }
}
