use std::fs;
use std::path::Path;

use crate::app::{AppContext, Result};
use crate::browser::{HtmlPage, PageSource};
use crate::domain::{BatchEntry, BatchOutcome, CrawlRecord, TrailOutcome};

const DESCRIPTION_PREVIEW: usize = 200;

fn preview(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_PREVIEW {
        return text.to_string();
    }
    let cut: String = text.chars().take(DESCRIPTION_PREVIEW).collect();
    format!("{}...", cut)
}

fn print_module(record: &CrawlRecord) {
    println!("Module: {}", record.module.title);
    println!("Description: {}", preview(&record.module.description));
    println!(
        "Lessons: {} crawled, {} failed, {} total",
        record.successful_lessons, record.failed_lessons, record.total_lessons
    );
    for lesson in &record.lessons {
        println!("  - {} ({} content items)", lesson.title, lesson.content.len());
    }
}

pub async fn crawl_module(ctx: &mut AppContext, source: &dyn PageSource, url: &str) -> Result<()> {
    match ctx.crawler.crawl_module(url, source).await {
        Some(record) => print_module(&record),
        None => eprintln!("Failed to crawl module: {}", url),
    }
    print_stats(ctx);
    Ok(())
}

pub async fn crawl_trail(ctx: &mut AppContext, source: &dyn PageSource, url: &str) -> Result<()> {
    match ctx.crawler.crawl_trail(url, source).await {
        TrailOutcome::Crawled(record) => {
            println!("Trail: {}", record.trail.title);
            println!(
                "Modules: {} crawled, {} failed, {} total",
                record.successful_modules, record.failed_modules, record.total_modules
            );
            for module in &record.modules {
                println!("  - {} ({} lessons)", module.module.title, module.lessons.len());
            }
        }
        TrailOutcome::Failed { error } => eprintln!("Failed to crawl trail: {}", error),
    }
    print_stats(ctx);
    Ok(())
}

pub async fn crawl_batch(ctx: &mut AppContext, source: &dyn PageSource, file: &Path) -> Result<()> {
    match ctx.crawler.crawl_urls_from_file(file, source).await {
        BatchOutcome::Completed(report) => {
            println!("Crawled {} URLs", report.results.len());
            for (url, entry) in &report.results {
                match entry {
                    BatchEntry::Trail(t) => println!("  ok    {} (trail, {} modules)", url, t.modules.len()),
                    BatchEntry::Module(m) => println!("  ok    {} (module, {} lessons)", url, m.lessons.len()),
                    BatchEntry::Failed { error } => println!("  fail  {}: {}", url, error),
                }
            }
        }
        BatchOutcome::Failed { error } => eprintln!("Batch crawl failed: {}", error),
    }
    print_stats(ctx);
    Ok(())
}

pub fn print_stats(ctx: &AppContext) {
    let stats = ctx.crawler.stats();
    println!("Crawl statistics:");
    println!("  Visited URLs: {}", stats.visited_urls);
    println!("  Failed URLs:  {}", stats.failed_urls);
    println!("  Total URLs:   {}", stats.total_urls);
    println!("  Success rate: {:.1}%", stats.success_rate);
    println!("  Output:       {}", stats.output_directory.display());
}

pub fn clear_session(ctx: &AppContext) -> Result<()> {
    let store = ctx.session_store();
    if store.clear()? {
        println!("Removed saved session: {}", store.path().display());
    } else {
        println!("No saved session found");
    }
    Ok(())
}

/// Parse a saved page offline and print it as JSON.
pub async fn parse_file(ctx: &AppContext, file: &Path, url: &str, module: bool) -> Result<()> {
    let html = fs::read_to_string(file)?;
    let page = HtmlPage::from_html(url, &html);

    let json = if module {
        serde_json::to_string_pretty(&ctx.parser.parse_module(&page).await?)?
    } else {
        serde_json::to_string_pretty(&ctx.parser.parse_lesson(&page).await?)?
    };
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_long_text() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(250);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), DESCRIPTION_PREVIEW + 3);
    }
}
