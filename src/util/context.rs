//! Global context for resolver operations.
//!
//! Provides centralized access to paths and terminal preferences.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};

use crate::util::config::{load_config, Config};

/// Name of the project-local configuration directory.
pub const PROJECT_DIR_NAME: &str = ".p2resolve";

static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("org", "p2resolve", "p2resolve"));

/// Global context containing paths and output preferences.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global data
    home: PathBuf,

    /// Whether to use verbose output
    verbose: bool,

    /// Whether to use colors in output
    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = if let Some(dirs) = PROJECT_DIRS.as_ref() {
            dirs.cache_dir().to_path_buf()
        } else {
            BaseDirs::new()
                .map(|b| b.home_dir().join(PROJECT_DIR_NAME))
                .unwrap_or_else(|| PathBuf::from(PROJECT_DIR_NAME))
        };

        Ok(GlobalContext {
            cwd,
            home,
            verbose: false,
            color: true,
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Override the home directory.
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = home;
        self
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Default descriptor cache root.
    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("cache")
    }

    /// Global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Project-local configuration directory.
    pub fn project_dir(&self) -> PathBuf {
        self.cwd.join(PROJECT_DIR_NAME)
    }

    /// Project-local configuration file path.
    pub fn project_config_path(&self) -> PathBuf {
        self.project_dir().join("config.toml")
    }

    /// Load the merged global and project configuration.
    pub fn load_config(&self) -> Config {
        load_config(&self.config_path(), &self.project_config_path())
    }

    /// Cache root from config, or the default.
    pub fn resolve_cache_dir(&self, config: &Config) -> PathBuf {
        match &config.cache.dir {
            Some(dir) if dir.is_relative() => self.cwd.join(dir),
            Some(dir) => dir.clone(),
            None => self.cache_dir(),
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn color(&self) -> bool {
        self.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_paths() {
        let ctx = GlobalContext::new().unwrap();
        assert!(ctx.cwd().is_absolute());
        assert!(ctx.cache_dir().starts_with(ctx.home()));
        assert!(ctx.project_config_path().ends_with(".p2resolve/config.toml"));
    }

    #[test]
    fn test_project_config_overrides_global() {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join("home");
        let project = tmp.path().join("project");
        std::fs::create_dir_all(&home).unwrap();
        std::fs::create_dir_all(project.join(PROJECT_DIR_NAME)).unwrap();

        std::fs::write(home.join("config.toml"), "[cache]\ndir = \"global-cache\"\n").unwrap();
        std::fs::write(
            project.join(PROJECT_DIR_NAME).join("config.toml"),
            "[cache]\ndir = \"local-cache\"\n",
        )
        .unwrap();

        let ctx = GlobalContext::with_cwd(project.clone())
            .unwrap()
            .with_home(home);
        let config = ctx.load_config();
        assert_eq!(ctx.resolve_cache_dir(&config), project.join("local-cache"));
    }

    #[test]
    fn test_default_cache_dir() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf())
            .unwrap()
            .with_home(tmp.path().join("home"));

        let config = Config::default();
        assert_eq!(ctx.resolve_cache_dir(&config), tmp.path().join("home/cache"));
    }
}
