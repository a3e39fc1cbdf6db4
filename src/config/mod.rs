//! Configuration loading
//!
//! Settings come from a TOML file with per-field defaults; a handful of
//! `NEWSWATCH_*` environment variables override the file for deployment
//! tweaks without editing it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sites::SelectorSite;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub database: DatabaseConfig,
    pub diff: DiffConfig,
    pub logging: LoggingConfig,
    /// Tracked sites driven by CSS selectors
    pub sites: Vec<SelectorSite>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            user_agent: format!("newswatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub sqlite_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("newswatch.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Cap on diff computation time per article, in seconds
    pub timeout_secs: u64,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self { timeout_secs: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log filter for stdout, e.g. "info" or "newswatch=debug"
    pub level: String,
    /// Optional file receiving debug-and-up logs
    pub debug_log: Option<PathBuf>,
    /// Optional file receiving warn-and-up logs
    pub error_log: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            debug_log: None,
            error_log: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&raw)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("NEWSWATCH_DB") {
            self.database.sqlite_path = PathBuf::from(path);
        }
        if let Ok(level) = std::env::var("NEWSWATCH_LOG") {
            self.logging.level = level;
        }
        if let Ok(agent) = std::env::var("NEWSWATCH_USER_AGENT") {
            self.fetch.user_agent = agent;
        }
        if let Ok(secs) = std::env::var("NEWSWATCH_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                self.fetch.request_timeout_secs = secs;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.fetch.request_timeout_secs == 0 {
            return Err(Error::config("fetch.request_timeout_secs must be > 0"));
        }
        if self.diff.timeout_secs == 0 {
            return Err(Error::config("diff.timeout_secs must be > 0"));
        }
        for site in &self.sites {
            if site.domain.is_empty() {
                return Err(Error::config("site with empty domain"));
            }
            if site.feed_url.is_empty() {
                return Err(Error::config(format!(
                    "site {} has no feed_url",
                    site.domain
                )));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.request_timeout_secs)
    }

    pub fn diff_timeout(&self) -> Duration {
        Duration::from_secs(self.diff.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.fetch.request_timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
        assert!(config.sites.is_empty());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [database]
            sqlite_path = "/tmp/test-newswatch.db"

            [diff]
            timeout_secs = 5

            [[sites]]
            domain = "www.example.com"
            feed_url = "https://www.example.com/"
            body_selector = "div.story-body"
            "#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(
            config.database.sqlite_path,
            PathBuf::from("/tmp/test-newswatch.db")
        );
        assert_eq!(config.diff_timeout(), Duration::from_secs(5));
        assert_eq!(config.sites.len(), 1);
        assert_eq!(config.sites[0].domain, "www.example.com");
        assert_eq!(config.sites[0].title_selector, "h1");
        assert_eq!(config.sites[0].body_selector, "div.story-body");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not valid toml [").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.fetch.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_site_without_feed() {
        let mut config = Config::default();
        config.sites.push(SelectorSite {
            domain: "www.example.com".to_string(),
            feed_url: String::new(),
            title_selector: "h1".to_string(),
            body_selector: "article".to_string(),
            byline_selector: None,
            article_prefix: None,
        });
        assert!(config.validate().is_err());
    }
}
