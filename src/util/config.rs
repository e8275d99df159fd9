//! Configuration file support.
//!
//! Two configuration file locations are consulted:
//! - Global: `<home>/config.toml` - user-wide defaults
//! - Project: `.p2resolve/config.toml` - project-specific overrides
//!
//! Project config takes precedence over global config. Command-line flags
//! take precedence over both.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Resolver configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Descriptor cache settings
    pub cache: CacheSettings,

    /// Network settings
    pub net: NetConfig,

    /// Resolution defaults
    pub resolve: ResolveConfig,
}

/// Descriptor cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Cache root directory (defaults to `<home>/cache`)
    pub dir: Option<PathBuf>,

    /// Serve a stale cached descriptor when revalidation fails
    pub allow_stale_on_error: Option<bool>,
}

/// Network-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Request timeout in seconds
    pub timeout: Option<u64>,

    /// Offline mode (serve only what is already cached)
    #[serde(default)]
    pub offline: bool,

    /// User-Agent header sent with every request
    pub user_agent: Option<String>,
}

/// Resolution defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Default mode (`slicer` or `planner`)
    pub mode: Option<String>,

    /// Filter environment, e.g. `osgi.os = "linux"`
    pub environment: BTreeMap<String, String>,
}

impl CacheSettings {
    pub fn allow_stale_on_error(&self) -> bool {
        self.allow_stale_on_error.unwrap_or(true)
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Cache settings
        if other.cache.dir.is_some() {
            self.cache.dir = other.cache.dir;
        }
        if other.cache.allow_stale_on_error.is_some() {
            self.cache.allow_stale_on_error = other.cache.allow_stale_on_error;
        }

        // Net settings
        if other.net.timeout.is_some() {
            self.net.timeout = other.net.timeout;
        }
        if other.net.offline {
            self.net.offline = true;
        }
        if other.net.user_agent.is_some() {
            self.net.user_agent = other.net.user_agent;
        }

        // Resolve settings; environment keys merge individually
        if other.resolve.mode.is_some() {
            self.resolve.mode = other.resolve.mode;
        }
        self.resolve.environment.extend(other.resolve.environment);
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.p2resolve/config.toml)
/// 2. Global config (<home>/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}
