use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::Result;
use crate::domain::{url_digest, BatchReport, CrawlRecord, LessonContent, ProgressState, TrailRecord};

const PROGRESS_FILE: &str = "progress.json";

/// JSON files under the crawl output directory.
///
/// Writes overwrite in place; a crash mid-write can leave a truncated file,
/// which later reads treat as missing.
#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
}

impl OutputStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn module_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("module_{}.json", url_digest(url)))
    }

    pub fn trail_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("trail_{}.json", url_digest(url)))
    }

    pub fn batch_path(&self, at: DateTime<Utc>) -> PathBuf {
        self.dir.join(format!("batch_results_{}.json", at.timestamp_millis()))
    }

    pub fn progress_path(&self) -> PathBuf {
        self.dir.join(PROGRESS_FILE)
    }

    pub fn save_module(&self, url: &str, record: &CrawlRecord) -> Result<PathBuf> {
        let path = self.module_path(url);
        self.write(&path, record)?;
        info!("Saved module data to {}", path.display());
        Ok(path)
    }

    pub fn load_module(&self, url: &str) -> Option<CrawlRecord> {
        self.read(&self.module_path(url))
    }

    pub fn save_trail(&self, url: &str, record: &TrailRecord) -> Result<PathBuf> {
        let path = self.trail_path(url);
        self.write(&path, record)?;
        info!("Saved trail data to {}", path.display());
        Ok(path)
    }

    pub fn load_trail(&self, url: &str) -> Option<TrailRecord> {
        self.read(&self.trail_path(url))
    }

    pub fn save_batch(&self, report: &BatchReport) -> Result<PathBuf> {
        let path = self.batch_path(report.crawl_timestamp);
        self.write(&path, report)?;
        info!("Saved batch results to {}", path.display());
        Ok(path)
    }

    /// Saved progress, or an empty state when none (or an unreadable one) exists.
    pub fn load_progress(&self) -> ProgressState {
        match self.read::<ProgressState>(&self.progress_path()) {
            Some(state) => {
                info!(
                    "Loaded progress: {} visited, {} failed",
                    state.visited_urls.len(),
                    state.failed_urls.len()
                );
                state
            }
            None => ProgressState::default(),
        }
    }

    pub fn save_progress(&self, state: &ProgressState) -> Result<()> {
        self.write(&self.progress_path(), state)
    }

    /// Search every saved module file for a lesson with this URL.
    pub fn find_lesson(&self, url: &str) -> Option<LessonContent> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Could not list {}: {}", self.dir.display(), e);
                return None;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("module_") && n.ends_with(".json"))
            })
            .collect();
        paths.sort();

        paths
            .iter()
            .filter_map(|p| self.read::<CrawlRecord>(p))
            .find_map(|record| record.lesson(url).cloned())
    }

    fn write<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LessonRef, ModuleContent, NO_DESCRIPTION};
    use tempfile::TempDir;

    fn lesson(url: &str) -> LessonContent {
        LessonContent {
            title: "Get Started".into(),
            url: url.into(),
            content: Vec::new(),
            learning_objectives: Vec::new(),
            instructions: Vec::new(),
            links: Vec::new(),
            estimated_time: None,
        }
    }

    fn record(module_url: &str, lesson_url: &str) -> CrawlRecord {
        CrawlRecord {
            module: ModuleContent {
                title: "Module".into(),
                url: module_url.into(),
                description: NO_DESCRIPTION.into(),
                lessons: vec![LessonRef {
                    title: "Get Started".into(),
                    url: lesson_url.into(),
                }],
                estimated_time: None,
                difficulty: None,
                prerequisites: Vec::new(),
            },
            lessons: vec![lesson(lesson_url)],
            crawl_timestamp: Utc::now(),
            total_lessons: 1,
            successful_lessons: 1,
            failed_lessons: 0,
        }
    }

    #[test]
    fn test_filenames_are_derived_from_url() {
        let dir = TempDir::new().unwrap();
        let store = OutputStore::new(dir.path()).unwrap();
        let url = "https://trailhead.salesforce.com/content/learn/modules/x";
        assert_eq!(
            store.module_path(url),
            dir.path().join(format!("module_{}.json", url_digest(url)))
        );
        assert_eq!(store.module_path(url), store.module_path(url));
        assert_ne!(store.module_path(url), store.trail_path(url));
        assert_eq!(store.progress_path(), dir.path().join("progress.json"));
    }

    #[test]
    fn test_module_round_trip_and_lesson_lookup() {
        let dir = TempDir::new().unwrap();
        let store = OutputStore::new(dir.path().join("out")).unwrap();
        let saved = record("https://a.example/modules/m", "https://a.example/modules/m/l1");
        store.save_module("https://a.example/modules/m", &saved).unwrap();

        assert_eq!(store.load_module("https://a.example/modules/m"), Some(saved));
        assert!(store.load_module("https://a.example/modules/other").is_none());
        let found = store.find_lesson("https://a.example/modules/m/l1").unwrap();
        assert_eq!(found.title, "Get Started");
        assert!(store.find_lesson("https://a.example/modules/m/l2").is_none());
    }

    #[test]
    fn test_batch_paths_differ_within_a_second() {
        let dir = TempDir::new().unwrap();
        let store = OutputStore::new(dir.path()).unwrap();
        let at = Utc::now();
        let later = at + chrono::Duration::milliseconds(250);
        assert_ne!(store.batch_path(at), store.batch_path(later));
        assert_eq!(
            store.batch_path(at),
            dir.path().join(format!("batch_results_{}.json", at.timestamp_millis()))
        );
    }

    #[test]
    fn test_load_trail_missing_or_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = OutputStore::new(dir.path()).unwrap();
        let url = "https://a.example/trails/t";
        assert!(store.load_trail(url).is_none());

        fs::write(store.trail_path(url), "{ truncated").unwrap();
        assert!(store.load_trail(url).is_none());
    }

    #[test]
    fn test_progress_defaults_when_missing_or_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = OutputStore::new(dir.path()).unwrap();
        assert_eq!(store.load_progress(), ProgressState::default());

        fs::write(store.progress_path(), "{ truncated").unwrap();
        assert_eq!(store.load_progress(), ProgressState::default());

        let mut state = ProgressState::default();
        state.mark_visited("https://a.example/1");
        store.save_progress(&state).unwrap();
        assert!(store.load_progress().is_visited("https://a.example/1"));
    }
}
