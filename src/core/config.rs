//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::core::errors::{Result, TranslationError};

/// Default DeepL endpoint for paid keys
pub const DEFAULT_API_ENDPOINT: &str = "https://api.deepl.com/v2";

/// DeepL endpoint used by free-tier keys (suffix `:fx`)
pub const FREE_API_ENDPOINT: &str = "https://api-free.deepl.com/v2";

/// Prefix of environment variables read by [`TranslatorConfig::load`]
pub const ENV_PREFIX: &str = "DEEPL";

/// Configuration for the document translator.
///
/// Built once at startup and shared read-only for the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub auth_key: String,
    pub auth_scheme: String,
    /// Base URL; empty means "pick from the key"
    pub api_endpoint: String,
    pub source_lang: String,
    pub target_lang: String,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub timeout_ms: u64,
    /// Where working directories are created; system temp dir when unset
    pub work_dir: Option<PathBuf>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            auth_key: String::new(),
            auth_scheme: "DeepL-Auth-Key".to_string(),
            api_endpoint: String::new(),
            source_lang: "EN".to_string(),
            target_lang: "ZH".to_string(),
            poll_interval_ms: 5000,
            max_poll_attempts: 100,
            timeout_ms: 30000,
            work_dir: None,
        }
    }
}

impl TranslatorConfig {
    /// Load configuration from an optional file, then `DEEPL_*` environment variables
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with_env(file, config::Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(file: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            info!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(env.try_parsing(true))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        debug!(
            "Configuration loaded: endpoint={:?}, {} -> {}",
            config.api_endpoint, config.source_lang, config.target_lang
        );
        Ok(config)
    }

    /// Endpoint actually used for requests, without trailing slash
    pub fn endpoint(&self) -> &str {
        if !self.api_endpoint.is_empty() {
            return self.api_endpoint.trim_end_matches('/');
        }
        if self.auth_key.ends_with(":fx") {
            FREE_API_ENDPOINT
        } else {
            DEFAULT_API_ENDPOINT
        }
    }

    /// Value of the `Authorization` header
    pub fn authorization(&self) -> String {
        format!("{} {}", self.auth_scheme, self.auth_key)
    }

    /// Pause between two status checks
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-request HTTP timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Directory under which working directories are created
    pub fn work_root(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| {
            Err(TranslationError::ConfigError {
                message: message.to_string(),
            })
        };

        if self.auth_key.is_empty() {
            return fail("auth key is required");
        }
        if self.auth_scheme.is_empty() {
            return fail("auth scheme is required");
        }
        if self.source_lang.is_empty() || self.target_lang.is_empty() {
            return fail("source and target languages are required");
        }
        if self.max_poll_attempts == 0 {
            return fail("max_poll_attempts must be greater than 0");
        }
        if self.timeout_ms == 0 {
            return fail("timeout_ms must be greater than 0");
        }

        Ok(())
    }
}
