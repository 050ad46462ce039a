//! Configuration management for tfs-tools.
//!
//! Settings are assembled from four layers, highest precedence first:
//! command-line flags, `TFS_TOOLS_*` environment variables, a TOML file at
//! `$XDG_CONFIG_HOME/tfs-tools/config.toml`, and built-in defaults. Each value
//! keeps its origin as a [`ParsedProperty`] so log lines can say where a
//! setting came from.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tfs_tools::Config;
//!
//! let file_config = Config::load_from_file().unwrap();
//! let env_config = Config::load_from_env();
//!
//! // Later layers win
//! let merged = Config::default().merge(file_config).merge(env_config);
//! println!("api-version: {:?}", merged.api_version);
//! ```

use crate::{
    api::{BasicCredential, ConnectionSettings, DEFAULT_API_VERSION},
    error::ConfigError,
    models::SharedArgs,
    parsed_property::ParsedProperty,
    wait::{DEFAULT_POLL_INTERVAL_SECONDS, DEFAULT_TIMEOUT_MINUTES, WaitOptions},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const ENV_COLLECTION_URL: &str = "TFS_TOOLS_COLLECTION_URL";
const ENV_PROJECT: &str = "TFS_TOOLS_PROJECT";
const ENV_PAT: &str = "TFS_TOOLS_PAT";
const ENV_API_VERSION: &str = "TFS_TOOLS_API_VERSION";
const ENV_TIMEOUT_MINUTES: &str = "TFS_TOOLS_TIMEOUT_MINUTES";
const ENV_POLL_INTERVAL_SECONDS: &str = "TFS_TOOLS_POLL_INTERVAL_SECONDS";

/// Raw shape of the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ConfigFile {
    pub collection_url: Option<String>,
    pub project: Option<String>,
    pub pat: Option<String>,
    pub api_version: Option<String>,
    pub timeout_minutes: Option<i64>,
    pub poll_interval_seconds: Option<u64>,
}

/// One configuration layer. Unset fields defer to lower layers.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Collection base address.
    pub collection_url: Option<ParsedProperty<String>>,
    /// Team project name.
    pub project: Option<ParsedProperty<String>>,
    /// Personal access token or `user:password`.
    pub pat: Option<ParsedProperty<String>>,
    /// REST api-version query parameter.
    pub api_version: Option<ParsedProperty<String>>,
    /// Default build wait timeout.
    pub timeout_minutes: Option<ParsedProperty<i64>>,
    /// Default delay between build status checks.
    pub poll_interval_seconds: Option<ParsedProperty<u64>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collection_url: None,
            project: None,
            pat: None,
            api_version: Some(ParsedProperty::Default(DEFAULT_API_VERSION.to_string())),
            timeout_minutes: Some(ParsedProperty::Default(DEFAULT_TIMEOUT_MINUTES)),
            poll_interval_seconds: Some(ParsedProperty::Default(DEFAULT_POLL_INTERVAL_SECONDS)),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("collection_url", &self.collection_url)
            .field("project", &self.project)
            .field("pat", &self.pat.as_ref().map(|_| "[REDACTED]"))
            .field("api_version", &self.api_version)
            .field("timeout_minutes", &self.timeout_minutes)
            .field("poll_interval_seconds", &self.poll_interval_seconds)
            .finish()
    }
}

impl Config {
    /// A layer with nothing set.
    pub fn empty() -> Self {
        Self {
            collection_url: None,
            project: None,
            pat: None,
            api_version: None,
            timeout_minutes: None,
            poll_interval_seconds: None,
        }
    }

    /// Load the file layer from the XDG config directory.
    ///
    /// A missing file is an empty layer, not an error.
    #[must_use = "this returns the loaded configuration which should be used"]
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load the file layer from an explicit path.
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::empty());
        }

        let config_content =
            fs::read_to_string(config_path).map_err(|e| ConfigError::FileReadError {
                path: config_path.to_path_buf(),
                message: e.to_string(),
            })?;

        let config_file: ConfigFile =
            toml::from_str(&config_content).map_err(|e| ConfigError::ParseError {
                path: config_path.to_path_buf(),
                message: e.to_string(),
            })?;

        let path = config_path.to_path_buf();
        Ok(Self {
            collection_url: config_file
                .collection_url
                .map(|v| ParsedProperty::File(v.clone(), path.clone(), v)),
            project: config_file
                .project
                .map(|v| ParsedProperty::File(v.clone(), path.clone(), v)),
            pat: config_file
                .pat
                .map(|v| ParsedProperty::File(v, path.clone(), "[REDACTED]".to_string())),
            api_version: config_file
                .api_version
                .map(|v| ParsedProperty::File(v.clone(), path.clone(), v)),
            timeout_minutes: config_file
                .timeout_minutes
                .map(|v| ParsedProperty::File(v, path.clone(), v.to_string())),
            poll_interval_seconds: config_file
                .poll_interval_seconds
                .map(|v| ParsedProperty::File(v, path.clone(), v.to_string())),
        })
    }

    /// Load the environment layer.
    ///
    /// Numeric variables that fail to parse are ignored.
    pub fn load_from_env() -> Self {
        Self {
            collection_url: std::env::var(ENV_COLLECTION_URL)
                .ok()
                .map(|v| ParsedProperty::Env(v.clone(), v)),
            project: std::env::var(ENV_PROJECT)
                .ok()
                .map(|v| ParsedProperty::Env(v.clone(), v)),
            pat: std::env::var(ENV_PAT)
                .ok()
                .map(|v| ParsedProperty::Env(v, "[REDACTED]".to_string())),
            api_version: std::env::var(ENV_API_VERSION)
                .ok()
                .map(|v| ParsedProperty::Env(v.clone(), v)),
            timeout_minutes: std::env::var(ENV_TIMEOUT_MINUTES)
                .ok()
                .and_then(|s| s.trim().parse().ok().map(|v| ParsedProperty::Env(v, s))),
            poll_interval_seconds: std::env::var(ENV_POLL_INTERVAL_SECONDS)
                .ok()
                .and_then(|s| s.trim().parse().ok().map(|v| ParsedProperty::Env(v, s))),
        }
    }

    /// Build the CLI layer from shared arguments.
    ///
    /// Wait-specific flags are filled in by the caller.
    pub fn from_shared_args(shared: &SharedArgs) -> Self {
        Self {
            collection_url: shared
                .collection_url
                .as_ref()
                .map(|v| ParsedProperty::Cli(v.clone(), v.clone())),
            project: shared
                .project
                .as_ref()
                .map(|v| ParsedProperty::Cli(v.clone(), v.clone())),
            pat: shared
                .pat
                .as_ref()
                .map(|v| ParsedProperty::Cli(v.clone(), "[REDACTED]".to_string())),
            api_version: shared
                .api_version
                .as_ref()
                .map(|v| ParsedProperty::Cli(v.clone(), v.clone())),
            timeout_minutes: None,
            poll_interval_seconds: None,
        }
    }

    /// Path of the config file: `$XDG_CONFIG_HOME/tfs-tools/config.toml`,
    /// falling back to the platform config directory.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir().context("Could not determine the user config directory")?,
        };

        Ok(config_dir.join("tfs-tools").join("config.toml"))
    }

    /// Merge this config with another, preferring values from other when they exist
    pub fn merge(self, other: Self) -> Self {
        Self {
            collection_url: other.collection_url.or(self.collection_url),
            project: other.project.or(self.project),
            pat: other.pat.or(self.pat),
            api_version: other.api_version.or(self.api_version),
            timeout_minutes: other.timeout_minutes.or(self.timeout_minutes),
            poll_interval_seconds: other.poll_interval_seconds.or(self.poll_interval_seconds),
        }
    }

    /// Checks required fields and produces the final settings.
    pub fn resolve(self) -> Result<ResolvedConfig, ConfigError> {
        let collection_url = require(self.collection_url, "collection-url", ENV_COLLECTION_URL)?;
        let project = require(self.project, "project", ENV_PROJECT)?;
        let pat = require(self.pat, "pat", ENV_PAT)?;
        let api_version = require(self.api_version, "api-version", ENV_API_VERSION)?;

        Ok(ResolvedConfig {
            collection_url,
            project,
            pat,
            api_version,
            timeout_minutes: self
                .timeout_minutes
                .unwrap_or(ParsedProperty::Default(DEFAULT_TIMEOUT_MINUTES)),
            poll_interval_seconds: self
                .poll_interval_seconds
                .unwrap_or(ParsedProperty::Default(DEFAULT_POLL_INTERVAL_SECONDS)),
        })
    }

    /// Create a sample config file for user reference
    #[must_use = "this operation can fail and the result should be checked"]
    pub fn create_sample_config() -> Result<PathBuf> {
        let config_path = Self::config_path()?;

        // Don't overwrite existing config
        if config_path.exists() {
            return Ok(config_path);
        }

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::DirectoryCreationError {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
        }

        let sample_config = r#"# tfs-tools configuration file
# Location: $XDG_CONFIG_HOME/tfs-tools/config.toml (defaults to ~/.config on Linux)
# Every value can be overridden by a TFS_TOOLS_* environment variable or a CLI flag.

# Collection base address (required)
# collection_url = "https://tfs.example.com/tfs/DefaultCollection"

# Team project (required)
# project = "your-project"

# Personal Access Token or user:password (required, prefer TFS_TOOLS_PAT)
# pat = "your-pat-token"

# REST api-version sent with every request (optional, defaults to "4.1")
api_version = "4.1"

# Build wait defaults
timeout_minutes = 5
poll_interval_seconds = 5
"#;

        fs::write(&config_path, sample_config).with_context(|| {
            format!(
                "Failed to write sample config to: {}",
                config_path.display()
            )
        })?;

        Ok(config_path)
    }
}

fn require(
    value: Option<ParsedProperty<String>>,
    field: &str,
    env_var: &str,
) -> Result<ParsedProperty<String>, ConfigError> {
    match value {
        Some(prop) if !prop.trim().is_empty() => Ok(prop),
        _ => Err(ConfigError::MissingRequired {
            field: field.to_string(),
            env_var: env_var.to_string(),
        }),
    }
}

/// Fully resolved settings for one invocation.
#[derive(Clone)]
pub struct ResolvedConfig {
    pub collection_url: ParsedProperty<String>,
    pub project: ParsedProperty<String>,
    pub pat: ParsedProperty<String>,
    pub api_version: ParsedProperty<String>,
    pub timeout_minutes: ParsedProperty<i64>,
    pub poll_interval_seconds: ParsedProperty<u64>,
}

impl ResolvedConfig {
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            collection_url: self.collection_url.value().clone(),
            project: self.project.value().clone(),
            credential: BasicCredential::from_string(self.pat.value().clone()),
            api_version: self.api_version.value().clone(),
        }
    }

    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::from_minutes_and_seconds(
            *self.timeout_minutes.value(),
            *self.poll_interval_seconds.value(),
        )
    }
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("collection_url", &self.collection_url)
            .field("project", &self.project)
            .field("pat", &format_args!("[REDACTED] ({})", self.pat.source_name()))
            .field("api_version", &self.api_version)
            .field("timeout_minutes", &self.timeout_minutes)
            .field("poll_interval_seconds", &self.poll_interval_seconds)
            .finish()
    }
}
