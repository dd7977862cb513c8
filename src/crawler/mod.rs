//! Sequential module, trail and batch crawls with resumable progress.

mod config;
mod output;
mod progress;

pub use config::CrawlerSettings;
pub use output::OutputStore;
pub use progress::ProgressTracker;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::app::Result;
use crate::browser::{navigate_with_retry, Page, PageSource, RetryPolicy};
use crate::domain::{
    BatchEntry, BatchOutcome, BatchReport, CrawlRecord, CrawlStats, LessonContent, ModuleContent,
    ProgressState, TrailInfo, TrailOutcome, TrailRecord,
};
use crate::parser::ContentParser;

/// Drives one authenticated page through modules, lessons and trails.
///
/// Every URL that was crawled successfully is remembered in the progress
/// file; visiting it again is served from the saved output instead of the
/// network.
pub struct Crawler {
    settings: CrawlerSettings,
    parser: ContentParser,
    store: OutputStore,
    progress: ProgressState,
    retry: RetryPolicy,
}

impl Crawler {
    pub fn new(settings: CrawlerSettings, parser: ContentParser) -> Result<Self> {
        let store = OutputStore::new(&settings.output_dir)?;
        let progress = store.load_progress();
        let retry = settings.retry_policy();
        Ok(Self {
            settings,
            parser,
            store,
            progress,
            retry,
        })
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    pub fn stats(&self) -> CrawlStats {
        self.progress.stats(self.store.dir())
    }

    /// Crawl a module page and every lesson it links to.
    ///
    /// Returns `None` when the module page itself fails, or when it was
    /// already crawled but its saved file is gone. A failing lesson is
    /// recorded and skipped.
    #[instrument(name = "crawler", skip(self, source))]
    pub async fn crawl_module(&mut self, url: &str, source: &dyn PageSource) -> Option<CrawlRecord> {
        if self.progress.is_visited(url) {
            info!("Module already crawled, loading saved output");
            let cached = self.store.load_module(url);
            if cached.is_none() {
                warn!("No saved output for visited module");
            }
            return cached;
        }

        let started = Instant::now();
        info!("Starting module crawl");

        let page = match source.page() {
            Ok(page) => page,
            Err(e) => {
                error!("Error crawling module: {}", e);
                self.record_failure(url);
                return None;
            }
        };

        let module = match self.load_module_page(page.as_ref(), url).await {
            Ok(module) => module,
            Err(e) => {
                error!("Error crawling module: {}", e);
                self.record_failure(url);
                return None;
            }
        };

        let mut lessons = Vec::new();
        let mut failed_lessons = 0;
        let mut tracker = ProgressTracker::new(format!("Crawling lessons of {}", module.title), module.lessons.len());

        for (i, lesson_ref) in module.lessons.iter().enumerate() {
            if self.progress.is_visited(&lesson_ref.url) {
                if let Some(lesson) = self.store.find_lesson(&lesson_ref.url) {
                    info!("Lesson already crawled: {}", lesson_ref.title);
                    lessons.push(lesson);
                    tracker.advance();
                    continue;
                }
                warn!("No saved output for visited lesson, crawling again: {}", lesson_ref.url);
            }

            if i > 0 && !self.settings.lesson_delay().is_zero() {
                tokio::time::sleep(self.settings.lesson_delay()).await;
            }

            match self.crawl_lesson(page.as_ref(), &lesson_ref.url).await {
                Ok(lesson) => {
                    self.progress.mark_visited(&lesson_ref.url);
                    lessons.push(lesson);
                }
                Err(e) => {
                    error!("Error crawling lesson {}: {}", lesson_ref.url, e);
                    self.progress.mark_failed(&lesson_ref.url);
                    failed_lessons += 1;
                }
            }
            tracker.advance();
        }

        let record = CrawlRecord {
            total_lessons: module.lessons.len(),
            successful_lessons: lessons.len(),
            failed_lessons,
            module,
            lessons,
            crawl_timestamp: Utc::now(),
        };

        if let Err(e) = self.store.save_module(url, &record) {
            error!("Failed to save module output: {}", e);
        }
        self.progress.mark_visited(url);
        self.persist_progress();

        info!(
            successful_lessons = record.successful_lessons,
            failed_lessons = record.failed_lessons,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Module crawl completed: {}",
            record.module.title
        );
        Some(record)
    }

    /// Crawl every module linked from a trail page.
    ///
    /// Only a failure on the trail page itself fails the whole trail; failed
    /// modules are counted and skipped. A trail crawled before is served from
    /// its saved file, and fails when that file is gone.
    #[instrument(name = "crawler", skip(self, source))]
    pub async fn crawl_trail(&mut self, url: &str, source: &dyn PageSource) -> TrailOutcome {
        if self.progress.is_visited(url) {
            info!("Trail already crawled, loading saved output");
            return match self.store.load_trail(url) {
                Some(record) => TrailOutcome::Crawled(record),
                None => {
                    warn!("No saved output for visited trail");
                    TrailOutcome::Failed {
                        error: format!("No saved output for visited trail: {}", url),
                    }
                }
            };
        }

        let started = Instant::now();
        info!("Starting trail crawl");

        let (trail, module_urls) = match self.load_trail_page(url, source).await {
            Ok(found) => found,
            Err(e) => {
                error!("Error crawling trail: {}", e);
                self.record_failure(url);
                return TrailOutcome::Failed { error: e.to_string() };
            }
        };
        info!("Found {} modules in trail: {}", module_urls.len(), trail.title);

        let mut modules = Vec::new();
        let mut tracker = ProgressTracker::new(format!("Crawling modules of {}", trail.title), module_urls.len());
        for module_url in &module_urls {
            if let Some(record) = self.crawl_module(module_url, source).await {
                modules.push(record);
            }
            tracker.advance();
        }

        let record = TrailRecord {
            total_modules: module_urls.len(),
            successful_modules: modules.len(),
            failed_modules: module_urls.len() - modules.len(),
            trail,
            modules,
            crawl_timestamp: Utc::now(),
        };

        if let Err(e) = self.store.save_trail(url, &record) {
            error!("Failed to save trail output: {}", e);
        }
        self.progress.mark_visited(url);
        self.persist_progress();

        info!(
            successful_modules = record.successful_modules,
            failed_modules = record.failed_modules,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Trail crawl completed: {}",
            record.trail.title
        );
        TrailOutcome::Crawled(record)
    }

    /// Crawl each URL listed in a newline-delimited file.
    ///
    /// Blank lines and lines starting with `#` are ignored. URLs containing
    /// the trail marker are crawled as trails, the rest as modules.
    #[instrument(name = "crawler", skip(self, path, source), fields(path = %path.display()))]
    pub async fn crawl_urls_from_file(&mut self, path: &Path, source: &dyn PageSource) -> BatchOutcome {
        let urls = match read_url_list(path) {
            Ok(urls) => urls,
            Err(e) => {
                error!("Error reading URL file: {}", e);
                return BatchOutcome::Failed { error: e.to_string() };
            }
        };

        let started = Instant::now();
        info!("Starting batch crawl of {} URLs", urls.len());

        let mut results = BTreeMap::new();
        let mut tracker = ProgressTracker::new("Crawling URLs", urls.len());
        for url in &urls {
            let entry = if self.settings.is_trail(url) {
                match self.crawl_trail(url, source).await {
                    TrailOutcome::Crawled(record) => BatchEntry::Trail(record),
                    TrailOutcome::Failed { error } => BatchEntry::Failed { error },
                }
            } else {
                match self.crawl_module(url, source).await {
                    Some(record) => BatchEntry::Module(record),
                    None => BatchEntry::Failed {
                        error: format!("Module crawl failed: {}", url),
                    },
                }
            };
            results.insert(url.clone(), entry);
            tracker.advance();
        }

        let report = BatchReport {
            results,
            crawl_timestamp: Utc::now(),
        };
        if let Err(e) = self.store.save_batch(&report) {
            error!("Failed to save batch output: {}", e);
        }
        self.persist_progress();

        info!(
            urls = urls.len(),
            successful = report.results.values().filter(|e| e.is_success()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch crawl completed"
        );
        BatchOutcome::Completed(report)
    }

    async fn load_module_page(&self, page: &dyn Page, url: &str) -> Result<ModuleContent> {
        navigate_with_retry(page, url, &self.retry).await?;
        self.parser.parse_module(page).await
    }

    async fn crawl_lesson(&self, page: &dyn Page, url: &str) -> Result<LessonContent> {
        navigate_with_retry(page, url, &self.retry).await?;
        self.parser.parse_lesson(page).await
    }

    async fn load_trail_page(
        &self,
        url: &str,
        source: &dyn PageSource,
    ) -> Result<(TrailInfo, Vec<String>)> {
        let page = source.page()?;
        navigate_with_retry(page.as_ref(), url, &self.retry).await?;
        self.parser.parse_trail(page.as_ref()).await
    }

    fn record_failure(&mut self, url: &str) {
        self.progress.mark_failed(url);
        self.persist_progress();
    }

    fn persist_progress(&mut self) {
        self.progress.touch();
        if let Err(e) = self.store.save_progress(&self.progress) {
            error!("Failed to save progress: {}", e);
        }
    }
}

/// Non-blank, non-comment lines of a URL list, trimmed.
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_url_list_skips_blanks_and_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.txt");
        fs::write(
            &path,
            "# modules to crawl\n\nhttps://a.example/modules/one\n   \n  https://a.example/trails/two  \n#https://a.example/modules/skipped\n",
        )
        .unwrap();

        let urls = read_url_list(&path).unwrap();
        assert_eq!(
            urls,
            vec!["https://a.example/modules/one", "https://a.example/trails/two"]
        );
    }

    #[test]
    fn test_read_url_list_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(read_url_list(&dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn test_new_creates_output_dir_and_loads_progress() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("crawl");
        let store = OutputStore::new(&out).unwrap();
        let mut state = ProgressState::default();
        state.mark_failed("https://a.example/modules/bad");
        store.save_progress(&state).unwrap();

        let crawler = Crawler::new(
            CrawlerSettings {
                output_dir: out.clone(),
                ..CrawlerSettings::default()
            },
            ContentParser::default(),
        )
        .unwrap();
        let stats = crawler.stats();
        assert_eq!(stats.failed_urls, 1);
        assert_eq!(stats.visited_urls, 0);
        assert_eq!(stats.output_directory, out);
    }
}
