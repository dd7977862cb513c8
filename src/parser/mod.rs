//! Structured extraction of lessons, modules and trails from a loaded page.
//!
//! Every extractor walks an ordered selector list, then falls back to a
//! text pattern over the whole body, then to a default. Only visible
//! elements are ever read.

mod config;
mod patterns;

pub use config::ParserSettings;
pub use patterns::{difficulty_in, instructions_in, objectives_in, time_estimate_in};

use std::collections::HashSet;

use tracing::{debug, info, instrument};
use url::Url;

use crate::app::Result;
use crate::browser::{ElementHandle, ElementInfo, Page, Selector};
use crate::domain::{
    ContentItem, LessonContent, LessonRef, Link, ModuleContent, TrailInfo, NO_DESCRIPTION,
    UNTITLED,
};
use crate::locator::ElementLocator;

pub const UNKNOWN_TRAIL: &str = "Unknown Trail";

const MIN_TITLE_LEN: usize = 2;
const MIN_DESCRIPTION_LEN: usize = 20;
const MIN_ITEM_LEN: usize = 5;
const MIN_PARAGRAPH_LEN: usize = 10;
const MIN_CODE_LEN: usize = 5;
const MIN_LINK_TEXT_LEN: usize = 2;

const CONTENT_BLOCKS: &str = "h1, h2, h3, h4, h5, h6, p, pre, code, .code-block, ul, ol";

fn chars(text: &str) -> usize {
    text.chars().count()
}

/// Resolve `href` against the page URL.
fn absolute(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Stateless page parser; all behaviour comes from [`ParserSettings`].
#[derive(Debug, Clone, Default)]
pub struct ContentParser {
    settings: ParserSettings,
}

impl ContentParser {
    pub fn new(settings: ParserSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    #[instrument(name = "parser", skip_all)]
    pub async fn parse_lesson(&self, page: &dyn Page) -> Result<LessonContent> {
        let url = page.current_url().await?;
        let body = page.body_text().await?;
        let locator = ElementLocator::new(page);

        let title = self.title(&locator).await?;

        let mut learning_objectives = self
            .container_items(
                &locator,
                &self.settings.objective_containers,
                &self.settings.objective_items,
            )
            .await;
        if learning_objectives.is_empty() {
            learning_objectives = objectives_in(&body);
        }

        let content = self.content_blocks(&locator).await;

        let mut instructions = self
            .container_items(
                &locator,
                &self.settings.instruction_containers,
                &self.settings.instruction_items,
            )
            .await;
        if instructions.is_empty() {
            instructions = instructions_in(&body);
        }

        let links = self.links(&locator, &url).await;
        let estimated_time = self.time_estimate(&locator, &body).await;

        info!(
            url = %url,
            content_items = content.len(),
            learning_objectives = learning_objectives.len(),
            instructions = instructions.len(),
            links = links.len(),
            "Lesson parsed successfully: {}",
            title
        );

        Ok(LessonContent {
            title,
            url,
            content,
            learning_objectives,
            instructions,
            links,
            estimated_time,
        })
    }

    #[instrument(name = "parser", skip_all)]
    pub async fn parse_module(&self, page: &dyn Page) -> Result<ModuleContent> {
        let url = page.current_url().await?;
        let body = page.body_text().await?;
        let locator = ElementLocator::new(page);

        let title = self.title(&locator).await?;
        let description = self.description(&locator).await;
        let lessons = self.lessons(&locator, &url).await;
        let estimated_time = self.time_estimate(&locator, &body).await;
        let difficulty = self.difficulty(&locator, &body).await;
        let prerequisites = self
            .container_items(
                &locator,
                &self.settings.prerequisite_containers,
                &self.settings.prerequisite_items,
            )
            .await;

        info!(
            url = %url,
            description_length = description.len(),
            lessons_count = lessons.len(),
            difficulty = difficulty.as_deref().unwrap_or("-"),
            prerequisites_count = prerequisites.len(),
            "Module parsed successfully: {}",
            title
        );

        Ok(ModuleContent {
            title,
            url,
            description,
            lessons,
            estimated_time,
            difficulty,
            prerequisites,
        })
    }

    /// Trail metadata plus the module URLs its cards link to.
    ///
    /// Unlike the lesson and module extractors, a failing module-card query
    /// is an error: without it there is nothing to crawl.
    #[instrument(name = "parser", skip_all)]
    pub async fn parse_trail(&self, page: &dyn Page) -> Result<(TrailInfo, Vec<String>)> {
        let url = page.current_url().await?;
        let locator = ElementLocator::new(page);

        let title = self
            .first_text(&locator, &self.settings.trail_title, 0)
            .await
            .unwrap_or_else(|| UNKNOWN_TRAIL.to_string());
        let description = self
            .first_text(&locator, &self.settings.trail_description, 0)
            .await
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());

        let cards = page.query(&self.settings.module_cards, None).await?;
        let anchor = Selector::parse("a[href]");
        let mut modules = Vec::new();
        for card in cards {
            let links = page.query(&anchor, Some(card.handle)).await?;
            let Some(href) = links.first().and_then(|a| a.attr("href")) else {
                continue;
            };
            if !href.contains(&self.settings.module_path_marker) {
                continue;
            }
            let module = absolute(&url, href);
            if !modules.contains(&module) {
                modules.push(module);
            }
        }

        info!(url = %url, modules = modules.len(), "Trail parsed: {}", title);
        Ok((
            TrailInfo {
                title,
                description,
                url,
            },
            modules,
        ))
    }

    /// Text of the first visible match, across `selectors` in order, that is
    /// longer than `min_len` characters.
    async fn first_text(
        &self,
        locator: &ElementLocator<'_>,
        selectors: &[Selector],
        min_len: usize,
    ) -> Option<String> {
        for selector in selectors {
            if let Some(element) = locator.first_visible(selector).await {
                if chars(&element.text) > min_len {
                    return Some(element.text);
                }
            }
        }
        None
    }

    async fn title(&self, locator: &ElementLocator<'_>) -> Result<String> {
        if let Some(title) = self
            .first_text(locator, &self.settings.title, MIN_TITLE_LEN)
            .await
        {
            return Ok(title);
        }
        let fallback = locator
            .page()
            .title()
            .await?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Ok(fallback.unwrap_or_else(|| UNTITLED.to_string()))
    }

    async fn description(&self, locator: &ElementLocator<'_>) -> String {
        self.first_text(locator, &self.settings.description, MIN_DESCRIPTION_LEN)
            .await
            .unwrap_or_else(|| NO_DESCRIPTION.to_string())
    }

    /// Items of the first visible container yielding any item longer than
    /// five characters.
    async fn container_items(
        &self,
        locator: &ElementLocator<'_>,
        containers: &[Selector],
        items: &Selector,
    ) -> Vec<String> {
        for selector in containers {
            let Some(container) = locator.first_visible(selector).await else {
                continue;
            };
            let found: Vec<String> = match locator.page().query(items, Some(container.handle)).await {
                Ok(found) => found
                    .into_iter()
                    .filter(|i| i.visible && chars(&i.text) > MIN_ITEM_LEN)
                    .map(|i| i.text)
                    .collect(),
                Err(e) => {
                    debug!("Error reading items of {}: {}", selector, e);
                    continue;
                }
            };
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    async fn content_blocks(&self, locator: &ElementLocator<'_>) -> Vec<ContentItem> {
        let mut scope: Option<ElementHandle> = None;
        for selector in &self.settings.content_containers {
            if let Some(container) = locator.first_visible(selector).await {
                scope = Some(container.handle);
                break;
            }
        }

        let page = locator.page();
        let blocks = match page.query(&Selector::parse(CONTENT_BLOCKS), scope).await {
            Ok(blocks) => blocks,
            Err(e) => {
                debug!("Error extracting lesson content: {}", e);
                return Vec::new();
            }
        };

        let list_items = Selector::parse("li");
        let mut seen_code = HashSet::new();
        let mut items = Vec::new();
        for block in blocks.into_iter().filter(|b| b.visible) {
            if let Some(item) = self.content_item(page, &list_items, &block, &mut seen_code).await {
                items.push(item);
            }
        }

        debug!("Extracted {} content items from lesson", items.len());
        items
    }

    async fn content_item(
        &self,
        page: &dyn Page,
        list_items: &Selector,
        block: &ElementInfo,
        seen_code: &mut HashSet<String>,
    ) -> Option<ContentItem> {
        if let Some(level) = block.heading_level() {
            return (chars(&block.text) > MIN_TITLE_LEN).then(|| ContentItem::heading(&block.text, level));
        }
        match block.tag.as_str() {
            "p" => (chars(&block.text) > MIN_PARAGRAPH_LEN).then(|| ContentItem::paragraph(&block.text)),
            "ul" | "ol" => {
                let entries: Vec<String> = page
                    .query(list_items, Some(block.handle))
                    .await
                    .ok()?
                    .into_iter()
                    .filter(|li| li.visible && !li.text.is_empty())
                    .map(|li| li.text)
                    .collect();
                (!entries.is_empty()).then(|| ContentItem::list(&entries[..]))
            }
            _ => {
                // <code> nested in <pre> repeats the same text
                if chars(&block.text) > MIN_CODE_LEN && seen_code.insert(block.text.clone()) {
                    Some(ContentItem::code(&block.text))
                } else {
                    None
                }
            }
        }
    }

    async fn links(&self, locator: &ElementLocator<'_>, page_url: &str) -> Vec<Link> {
        let anchors = locator.find_visible_all(&Selector::parse("a[href]")).await;
        let total = anchors.len();

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for anchor in anchors {
            let Some(href) = anchor.attr("href") else {
                continue;
            };
            if chars(&anchor.text) <= MIN_LINK_TEXT_LEN {
                continue;
            }
            let relevant = href.starts_with('/')
                || self
                    .settings
                    .related_domains
                    .iter()
                    .any(|d| href.contains(d.as_str()));
            if !relevant {
                continue;
            }

            let link = Link {
                text: anchor.text.clone(),
                url: absolute(page_url, href),
            };
            if seen.insert((link.text.clone(), link.url.clone())) {
                debug!("Extracted link: {} -> {}", link.text, link.url);
                links.push(link);
            }
        }

        debug!(total_links_found = total, unique_links_final = links.len(), "Link extraction completed");
        links
    }

    async fn lessons(&self, locator: &ElementLocator<'_>, page_url: &str) -> Vec<LessonRef> {
        let own_url = absolute(page_url, "");
        for selector in &self.settings.lesson_links {
            let anchors = locator.find_visible_all(selector).await;
            let mut seen = HashSet::new();
            let mut lessons = Vec::new();

            for anchor in anchors {
                let Some(href) = anchor.attr("href") else {
                    continue;
                };
                if anchor.text.is_empty() || !href.contains(&self.settings.module_path_marker) {
                    continue;
                }
                let url = absolute(page_url, href);
                let generic = self
                    .settings
                    .generic_lesson_titles
                    .iter()
                    .any(|g| g.eq_ignore_ascii_case(&anchor.text));
                if generic || url == own_url || !seen.insert(url.clone()) {
                    continue;
                }
                lessons.push(LessonRef {
                    title: anchor.text,
                    url,
                });
            }

            if !lessons.is_empty() {
                return lessons;
            }
        }
        Vec::new()
    }

    async fn time_estimate(&self, locator: &ElementLocator<'_>, body: &str) -> Option<String> {
        match self.first_text(locator, &self.settings.time_estimate, 0).await {
            Some(time) => Some(time),
            None => time_estimate_in(body),
        }
    }

    async fn difficulty(&self, locator: &ElementLocator<'_>, body: &str) -> Option<String> {
        match self.first_text(locator, &self.settings.difficulty, 0).await {
            Some(level) => Some(level),
            None => difficulty_in(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::HtmlPage;

    #[test]
    fn test_absolute() {
        assert_eq!(
            absolute("https://trailhead.salesforce.com/content/learn/modules/x", "/docs"),
            "https://trailhead.salesforce.com/docs"
        );
        assert_eq!(
            absolute("https://a.example/x", "https://github.com/y"),
            "https://github.com/y"
        );
    }

    #[tokio::test]
    async fn test_title_falls_back_to_document_title() {
        let page = HtmlPage::from_html(
            "https://a.example/",
            "<html><head><title> Doc Title </title></head><body><h1>ab</h1></body></html>",
        );
        let lesson = ContentParser::default().parse_lesson(&page).await.unwrap();
        assert_eq!(lesson.title, "Doc Title");

        let bare = HtmlPage::from_html("https://a.example/", "<html><body></body></html>");
        let lesson = ContentParser::default().parse_lesson(&bare).await.unwrap();
        assert_eq!(lesson.title, UNTITLED);
        assert_eq!(lesson.url, "https://a.example/");
    }

    #[tokio::test]
    async fn test_hidden_title_is_skipped() {
        let page = HtmlPage::from_html(
            "https://a.example/",
            r#"<body><h1 style="display:none">Stale Title</h1><div class="title">Real Title</div></body>"#,
        );
        let module = ContentParser::default().parse_module(&page).await.unwrap();
        assert_eq!(module.title, "Real Title");
    }

    #[tokio::test]
    async fn test_content_blocks_in_document_order() {
        let page = HtmlPage::from_html(
            "https://a.example/",
            r#"<body><main>
                <h2>Setup Steps</h2>
                <p>short</p>
                <p>This paragraph is long enough to keep.</p>
                <pre><code>let x = compute();</code></pre>
                <ul><li>First</li><li>Second</li></ul>
            </main></body>"#,
        );
        let lesson = ContentParser::default().parse_lesson(&page).await.unwrap();
        let kinds: Vec<_> = lesson.content.iter().map(|c| c.kind).collect();
        use crate::domain::ContentKind::*;
        assert_eq!(kinds, vec![Heading, Paragraph, Code, List]);
        assert_eq!(lesson.content[0].level, Some(2));
        assert_eq!(lesson.content[3].text, "• First\n• Second");
    }
}
