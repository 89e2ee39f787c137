//! Configuration loading for the courier subsystem.
//!
//! Layered TOML configuration: built-in defaults, then an optional config
//! file (`courier.toml` or `$COURIER_CONFIG_PATH`), then `COURIER_*`
//! environment variable overrides. Secrets never live in the file; the
//! transport section names the environment variable that holds the EmailJS
//! public key rather than the key itself.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::oracle::ollama::DEFAULT_OLLAMA_URL;

/// Environment variable naming an alternate config file path.
pub const CONFIG_PATH_ENV: &str = "COURIER_CONFIG_PATH";

/// Default config file name, resolved relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "courier.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    /// Agent identity.
    pub agent: AgentConfig,
    /// Extraction oracle settings.
    pub oracle: OracleConfig,
    /// Contact store settings.
    pub store: StoreConfig,
    /// Mail transport settings.
    pub transport: TransportConfig,
}

/// Agent identity settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Display name the agent speaks under; also the record key prefix.
    pub name: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
        }
    }
}

/// Extraction oracle settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Ollama API base URL.
    pub base_url: String,
    /// Model name used for every extraction call.
    pub model: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_owned(),
            model: default_oracle_model(),
        }
    }
}

/// Contact store settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path; defaults to `contacts.db` under the data dir.
    pub db_path: Option<String>,
}

/// Mail transport settings.
///
/// Delivery stays disabled until both identifiers are set and the named
/// environment variable holds the public key.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// EmailJS service identifier.
    pub service_id: Option<String>,
    /// EmailJS template identifier.
    pub template_id: Option<String>,
    /// Name of the environment variable holding the EmailJS public key.
    pub public_key_env: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            service_id: None,
            template_id: None,
            public_key_env: default_public_key_env(),
        }
    }
}

/// Fully resolved transport credentials, ready to construct a transport.
pub struct ResolvedTransport {
    /// EmailJS service identifier.
    pub service_id: String,
    /// EmailJS template identifier.
    pub template_id: String,
    /// EmailJS public key, read from the environment.
    pub public_key: String,
}

impl std::fmt::Debug for ResolvedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedTransport")
            .field("service_id", &self.service_id)
            .field("template_id", &self.template_id)
            .field("public_key", &"[REDACTED]")
            .finish()
    }
}

impl TransportConfig {
    /// Resolve the transport settings against an environment lookup.
    ///
    /// Returns `None` unless both identifiers are configured and the named
    /// environment variable is set; without a resolved transport, delivery
    /// reports not-configured. The lookup is injected so tests can stub the
    /// environment.
    pub fn resolve(&self, env: impl Fn(&str) -> Option<String>) -> Option<ResolvedTransport> {
        let service_id = self.service_id.clone()?;
        let template_id = self.template_id.clone()?;
        let public_key = env(&self.public_key_env)?;
        Some(ResolvedTransport {
            service_id,
            template_id,
            public_key,
        })
    }
}

impl CourierConfig {
    /// Load configuration: file (if present), then environment overrides,
    /// then validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if the
    /// merged configuration fails validation.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file(&config_path())?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file path, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed.
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("invalid configuration TOML")
    }

    /// Apply `COURIER_*` environment overrides on top of the loaded values.
    ///
    /// The lookup is injected so tests can override without touching the
    /// process environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(name) = env("COURIER_AGENT_NAME") {
            self.agent.name = name;
        }
        if let Some(url) = env("COURIER_OLLAMA_URL") {
            self.oracle.base_url = url;
        }
        if let Some(model) = env("COURIER_ORACLE_MODEL") {
            self.oracle.model = model;
        }
        if let Some(path) = env("COURIER_DB_PATH") {
            self.store.db_path = Some(path);
        }
        if let Some(service_id) = env("COURIER_EMAILJS_SERVICE_ID") {
            self.transport.service_id = Some(service_id);
        }
        if let Some(template_id) = env("COURIER_EMAILJS_TEMPLATE_ID") {
            self.transport.template_id = Some(template_id);
        }
    }

    /// Validate the merged configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty agent name, a `/` in the agent name
    /// (it would corrupt record keys), an empty model, or a base URL that is
    /// not http(s).
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.agent.name.trim().is_empty(),
            "agent name must not be empty"
        );
        ensure!(
            !self.agent.name.contains('/'),
            "agent name must not contain '/': it is the record key prefix"
        );
        ensure!(
            !self.oracle.model.trim().is_empty(),
            "oracle model must not be empty"
        );
        ensure!(
            self.oracle.base_url.starts_with("http://")
                || self.oracle.base_url.starts_with("https://"),
            "oracle base_url must be an http(s) URL, got {:?}",
            self.oracle.base_url
        );
        Ok(())
    }

    /// The SQLite database path, explicit or defaulted under the data dir.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn resolve_db_path(&self) -> Result<PathBuf> {
        match &self.store.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(data_dir()?.join("contacts.db")),
        }
    }
}

/// The config file path: `$COURIER_CONFIG_PATH` or `./courier.toml`.
pub fn config_path() -> PathBuf {
    config_path_with(|key| std::env::var(key).ok())
}

fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    env(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// The courier data directory (`~/.courier`), used for the default database
/// and log locations.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn data_dir() -> Result<PathBuf> {
    let base = directories::BaseDirs::new().context("cannot determine home directory")?;
    Ok(base.home_dir().join(".courier"))
}

// Default value functions.

fn default_agent_name() -> String {
    "Courier".to_owned()
}

fn default_oracle_model() -> String {
    "llama3".to_owned()
}

fn default_public_key_env() -> String {
    "EMAILJS_USER_ID".to_owned()
}
