use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::browser::RetryPolicy;

/// Crawl output and pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerSettings {
    /// Directory receiving module, trail, batch and progress files (default: crawled_data)
    pub output_dir: PathBuf,

    /// Navigation attempts per page (default: 3)
    pub max_retries: u32,

    /// First retry delay in milliseconds, doubled per attempt (default: 1000)
    pub backoff_base_ms: u64,

    /// Pause between lessons in milliseconds (default: 2000)
    pub lesson_delay_ms: u64,

    /// Batch URLs containing this are crawled as trails (default: trails)
    pub trail_path_marker: String,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("crawled_data"),
            max_retries: 3,
            backoff_base_ms: 1000,
            lesson_delay_ms: 2000,
            trail_path_marker: "trails".to_string(),
        }
    }
}

impl CrawlerSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            base_delay: Duration::from_millis(self.backoff_base_ms),
        }
    }

    pub fn lesson_delay(&self) -> Duration {
        Duration::from_millis(self.lesson_delay_ms)
    }

    pub fn is_trail(&self, url: &str) -> bool {
        url.contains(&self.trail_path_marker)
    }
}
