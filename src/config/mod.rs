//! Configuration management for Trailbuster.
//!
//! Configuration is read from `~/.config/trailbuster/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::auth::AuthSettings;
use crate::browser::BrowserSettings;
use crate::crawler::CrawlerSettings;
use crate::mail::MailSettings;
use crate::parser::ParserSettings;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserSettings,
    pub auth: AuthSettings,
    pub mail: MailSettings,
    pub parser: ParserSettings,
    pub crawler: CrawlerSettings,
}

impl Config {
    /// Load configuration from `path`, or from the default path when `None`.
    ///
    /// A missing file at the default path is created with commented defaults.
    /// A missing file at an explicit path is an error.
    /// Missing fields in the config file will use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let p = Self::default_config_path()?;
                if !p.exists() {
                    Self::create_default_config(&p)?;
                    return Ok(Self::default());
                }
                p
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/trailbuster/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("trailbuster").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    ///
    /// Selector lists are left out so upgrades pick up new built-in
    /// selectors; add a list here to replace the built-in one.
    fn default_config_content() -> String {
        r##"# Trailbuster Configuration
#
# Selectors are CSS, optionally ending in :has-text('...') to require
# a case-insensitive text match, e.g. "button:has-text('Log In')".

[browser]
# Run browser in headless mode (no visible window)
headless = true

# Page load timeout in seconds
timeout_secs = 30

# Wait time after page load for client-rendered content (milliseconds)
settle_ms = 3000

# Upper bound for element waits and timed clicks in seconds
element_wait_secs = 10

window_width = 1920
window_height = 1080

# Explicit browser binary (auto-detected when unset)
# chrome_path = "/usr/bin/chromium"

[auth]
base_url = "https://trailhead.salesforce.com"
home_path = "/home"
login_path = "/sessions/users/new?type=tbidlogin"

# Saved cookies and local storage from the last successful login
session_file = "trailhead_session.json"

# URL fragments that mean the browser is on a login page
login_url_markers = ["login", "sessions"]

# Seconds to wait for the login form's loading overlay to clear
loading_wait_secs = 10

# Replace a built-in selector list, for example:
# logged_in = [".avatar", "[data-testid='user-menu']"]

[mail]
# OAuth token cache (refreshed in place)
token_file = "token.json"

# OAuth client secret from the Google Cloud console
client_secret_file = "credentials.json"

# Gmail search for verification messages
query = "from:salesforce.com subject:verification newer_than:1d"

# Polling attempts and delay between them (seconds)
max_attempts = 10
delay_secs = 5

# Most recent matching messages read per attempt
messages_per_attempt = 5

[parser]
# Link targets kept besides site-relative ones
related_domains = [
    "trailhead.salesforce.com",
    "developer.salesforce.com",
    "help.salesforce.com",
    "salesforce.com/products",
    "github.com",
    "docs.salesforce.com",
]

# Substring of every module and lesson URL
module_path_marker = "modules"

[crawler]
output_dir = "crawled_data"

# Navigation attempts per page, first retry delay (ms) doubling per attempt
max_retries = 3
backoff_base_ms = 1000

# Pause between lessons (ms)
lesson_delay_ms = 2000

# Batch URLs containing this are crawled as trails
trail_path_marker = "trails"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert!(config.browser.headless);
        assert_eq!(config.auth.login_url_markers, vec!["login", "sessions"]);
        assert_eq!(config.mail.max_attempts, 10);
        assert_eq!(config.crawler.max_retries, 3);
        assert_eq!(config.parser.module_path_marker, "modules");
        assert!(!config.auth.logged_in.is_empty());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[crawler]
output_dir = "/tmp/trails"

[auth]
logged_in = [".me"]
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.crawler.output_dir, PathBuf::from("/tmp/trails"));
        assert_eq!(config.auth.logged_in.len(), 1);
        // Defaults elsewhere
        assert_eq!(config.crawler.lesson_delay_ms, 2000);
        assert_eq!(config.browser.timeout_secs, 30);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.auth.base_url, "https://trailhead.salesforce.com");
        assert_eq!(config.mail.delay_secs, 5);
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[browser]\nheadless = false\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert!(!config.browser.headless);

        let missing = Config::load(Some(&dir.path().join("missing.toml")));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        fs::write(&path, "[browser\n").unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(ConfigError::Parse { .. })));
    }
}
