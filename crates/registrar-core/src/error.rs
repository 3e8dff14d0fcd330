use thiserror::Error;

/// Result alias used throughout the registry.
pub type Result<T> = std::result::Result<T, Error>;

/// The registry's error taxonomy. One variant per failure mode a caller
/// needs to distinguish; wrapped upstream errors are attached via `#[source]`
/// rather than flattened into strings.
#[derive(Error, Debug)]
pub enum Error {
    #[error("package not found: {name}")]
    NotFound { name: String },

    #[error("no VCS credential registered for managed package {name}")]
    MissingToken { name: String },

    #[error("invalid version string {raw:?}: {reason}")]
    InvalidVersion { raw: String, reason: String },

    #[error("transient VCS failure fetching {name}: {message}")]
    VcsTransient {
        name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("store conflict writing {name}: {message}")]
    StoreConflict { name: String, message: String },

    #[error("failed to emit provider tree: {message}")]
    EmitFailure {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    #[must_use]
    pub fn missing_token(name: impl Into<String>) -> Self {
        Self::MissingToken { name: name.into() }
    }

    #[must_use]
    pub fn invalid_version(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidVersion {
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    pub fn vcs_transient<E>(name: impl Into<String>, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::VcsTransient {
            name: name.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn store_conflict(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreConflict {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn emit_failure<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::EmitFailure {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether a caller should retry the operation that produced this error.
    /// Only VCS transient failures are retryable; everything else reflects
    /// a durable condition (bad input, missing credential, conflicting write).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::VcsTransient { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_formats_name() {
        let err = Error::not_found("vendor/pkg");
        assert_eq!(err.to_string(), "package not found: vendor/pkg");
    }

    #[test]
    fn only_vcs_transient_is_retryable() {
        assert!(!Error::not_found("x").is_retryable());
        assert!(!Error::missing_token("x").is_retryable());
        assert!(!Error::invalid_version("x", "bad").is_retryable());
        assert!(!Error::store_conflict("x", "bad").is_retryable());

        let source = std::io::Error::other("boom");
        assert!(Error::vcs_transient("x", "timeout", source).is_retryable());
    }

    #[test]
    fn missing_token_message_names_package() {
        let err = Error::missing_token("acme/widgets");
        assert!(err.to_string().contains("acme/widgets"));
    }
}
