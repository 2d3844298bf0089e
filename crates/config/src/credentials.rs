//! Upstream credential lookup.
//!
//! The API key is resolved on every chat request rather than once at
//! startup, so rotating it in the environment file takes effect without a
//! restart. Lookup order for [`EnvCredentials`]:
//!
//! 1. the process environment
//! 2. the dotenv file (re-read each call)
//! 3. a fallback value from the config file

use std::path::{Path, PathBuf};

/// Something that can produce the current upstream API key.
pub trait CredentialSource: Send + Sync {
    /// The key, or `None` when no non-empty key is configured.
    fn api_key(&self) -> Option<String>;

    /// Human-readable description of where the key is looked up.
    fn describe(&self) -> String;
}

/// Environment variable + dotenv file lookup.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
    env_file: PathBuf,
    fallback: Option<String>,
}

impl EnvCredentials {
    pub fn new(var: impl Into<String>, env_file: impl AsRef<Path>) -> Self {
        Self {
            var: var.into(),
            env_file: env_file.as_ref().to_path_buf(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Option<String>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Scan the dotenv file for our variable without touching the process
    /// environment.
    fn from_env_file(&self) -> Option<String> {
        let iter = match dotenvy::from_path_iter(&self.env_file) {
            Ok(iter) => iter,
            Err(e) => {
                tracing::trace!(path = %self.env_file.display(), error = %e, "env file not readable");
                return None;
            }
        };

        for item in iter {
            match item {
                Ok((key, value)) if key == self.var => return Some(value),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %self.env_file.display(), error = %e, "Skipping malformed env file line");
                }
            }
        }
        None
    }
}

impl CredentialSource for EnvCredentials {
    fn api_key(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.from_env_file().filter(|v| !v.trim().is_empty()))
            .or_else(|| self.fallback.clone().filter(|v| !v.trim().is_empty()))
    }

    fn describe(&self) -> String {
        format!("${} (env file: {})", self.var, self.env_file.display())
    }
}

/// A fixed key, for tests and embedding.
#[derive(Clone, Default)]
pub struct StaticCredentials(pub Option<String>);

impl StaticCredentials {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Some(key.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StaticCredentials")
            .field(&self.0.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl CredentialSource for StaticCredentials {
    fn api_key(&self) -> Option<String> {
        self.0.clone().filter(|v| !v.trim().is_empty())
    }

    fn describe(&self) -> String {
        "static".into()
    }
}
