use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the automated browser
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Per-navigation timeout in seconds (default: 30)
    pub timeout_secs: u64,

    /// Fixed wait after load for client-rendered content in milliseconds (default: 3000)
    pub settle_ms: u64,

    /// Upper bound for element waits and timed clicks in seconds (default: 10)
    pub element_wait_secs: u64,

    /// Browser window width (default: 1920)
    pub window_width: u32,

    /// Browser window height (default: 1080)
    pub window_height: u32,

    /// Explicit Chrome/Chromium binary; auto-detected when unset
    pub chrome_path: Option<PathBuf>,

    /// Extra command-line switches passed to the browser
    pub args: Vec<String>,

    /// User agent string to use
    pub user_agent: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_secs: 30,
            settle_ms: 3000,
            element_wait_secs: 10,
            window_width: 1920,
            window_height: 1080,
            chrome_path: None,
            args: vec![
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-web-security".to_string(),
                "--disable-features=VizDisplayCompositor".to_string(),
            ],
            user_agent: Some(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
        }
    }
}

impl BrowserSettings {
    /// Get the navigation timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the post-load settle delay as a Duration
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Get the element wait bound as a Duration
    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }
}
