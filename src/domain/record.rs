use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{LessonContent, ModuleContent, TrailInfo};

/// Result of crawling one module and its lessons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlRecord {
    pub module: ModuleContent,
    pub lessons: Vec<LessonContent>,
    pub crawl_timestamp: DateTime<Utc>,
    pub total_lessons: usize,
    pub successful_lessons: usize,
    pub failed_lessons: usize,
}

impl CrawlRecord {
    pub fn lesson(&self, url: &str) -> Option<&LessonContent> {
        self.lessons.iter().find(|l| l.url == url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailRecord {
    pub trail: TrailInfo,
    pub modules: Vec<CrawlRecord>,
    pub crawl_timestamp: DateTime<Utc>,
    pub total_modules: usize,
    pub successful_modules: usize,
    pub failed_modules: usize,
}

/// Outcome of a trail crawl. A failure carries only the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrailOutcome {
    Crawled(TrailRecord),
    Failed { error: String },
}

impl TrailOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TrailOutcome::Crawled(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TrailOutcome::Failed { error } => Some(error),
            TrailOutcome::Crawled(_) => None,
        }
    }
}

/// Per-URL entry of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Trail(TrailRecord),
    Module(CrawlRecord),
    Failed { error: String },
}

impl BatchEntry {
    pub fn is_success(&self) -> bool {
        !matches!(self, BatchEntry::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: BTreeMap<String, BatchEntry>,
    pub crawl_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    Completed(BatchReport),
    Failed { error: String },
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Completed(_))
    }
}

/// Stable, filesystem-safe digest of a URL used to name output files.
pub fn url_digest(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(16);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_digest_deterministic() {
        let a = url_digest("https://trailhead.salesforce.com/content/learn/modules/x");
        let b = url_digest("https://trailhead.salesforce.com/content/learn/modules/x");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_url_digest_different_inputs() {
        assert_ne!(url_digest("https://a.example/1"), url_digest("https://a.example/2"));
    }

    #[test]
    fn test_failed_trail_serializes_to_error_only() {
        let outcome = TrailOutcome::Failed {
            error: "boom".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "boom" }));
        assert!(!outcome.is_success());
        assert_eq!(outcome.error(), Some("boom"));
    }
}
