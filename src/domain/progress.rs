use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Visited and failed URL sets that let a crawl resume where it stopped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    #[serde(default)]
    pub visited_urls: BTreeSet<String>,
    #[serde(default)]
    pub failed_urls: BTreeSet<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ProgressState {
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited_urls.contains(url)
    }

    pub fn mark_visited(&mut self, url: &str) {
        self.visited_urls.insert(url.to_string());
    }

    pub fn mark_failed(&mut self, url: &str) {
        self.failed_urls.insert(url.to_string());
    }

    pub fn touch(&mut self) {
        self.timestamp = Some(Utc::now());
    }

    pub fn stats(&self, output_directory: impl Into<PathBuf>) -> CrawlStats {
        let visited = self.visited_urls.len();
        let failed = self.failed_urls.len();
        let total = visited + failed;
        let success_rate = if total > 0 {
            visited as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        CrawlStats {
            visited_urls: visited,
            failed_urls: failed,
            total_urls: total,
            success_rate,
            output_directory: output_directory.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlStats {
    pub visited_urls: usize,
    pub failed_urls: usize,
    pub total_urls: usize,
    pub success_rate: f64,
    pub output_directory: PathBuf,
}
