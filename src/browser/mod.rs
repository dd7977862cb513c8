//! Browser capability layer.
//!
//! Everything above this module talks to a loaded page through the [`Page`]
//! trait, never to chromiumoxide directly. Two implementations exist:
//!
//! ```text
//! ChromePage  (chromiumoxide, real layout-based visibility)
//! HtmlPage    (static HTML via the scraper crate, for tests and offline parsing)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use trailbuster::browser::{ChromeBrowser, BrowserSettings, PageOpener, Selector};
//!
//! let browser = ChromeBrowser::launch(BrowserSettings::default()).await?;
//! let page = browser.open(None).await?;
//! page.goto("https://trailhead.salesforce.com/home").await?;
//! let avatars = page.query(&Selector::parse(".avatar"), None).await?;
//! ```

mod chrome;
mod config;
mod html;
mod navigate;
mod script;
mod selector;

pub use chrome::{ChromeBrowser, ChromePage};
pub use config::BrowserSettings;
pub use html::{HtmlPage, HtmlSite};
pub use navigate::{navigate_with_retry, retry_with_backoff, RetryPolicy};
pub use selector::Selector;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::domain::StorageState;

/// Opaque reference to an element on the currently loaded document.
///
/// Handles are only meaningful for the page that produced them and become
/// stale after navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(pub u64);

/// Snapshot of one matched element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub handle: ElementHandle,
    /// Lowercase tag name
    pub tag: String,
    /// Whitespace-collapsed, trimmed text content
    pub text: String,
    /// Result of the page's visibility check
    pub visible: bool,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

impl ElementInfo {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Heading level for `h1`..`h6` tags.
    pub fn heading_level(&self) -> Option<u8> {
        let digit = self.tag.strip_prefix('h')?;
        match digit.parse::<u8>() {
            Ok(level @ 1..=6) => Some(level),
            _ => None,
        }
    }
}

/// Ways of clicking an element, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickStrategy {
    /// Mouse click at the element centre with no actionability checks
    Forced,
    /// Scroll into view and click, bounded by the element wait timeout
    Timed,
    /// `element.click()` from page script
    Script,
    /// Click the first visible `span` nested inside the element
    NestedLabel,
}

impl ClickStrategy {
    pub const ESCALATION: [ClickStrategy; 4] = [
        ClickStrategy::Forced,
        ClickStrategy::Timed,
        ClickStrategy::Script,
        ClickStrategy::NestedLabel,
    ];
}

/// A loaded browser page.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate and wait for the load to complete.
    async fn goto(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// The document's `<title>`, if any.
    async fn title(&self) -> Result<Option<String>>;

    /// Text content of the whole body.
    async fn body_text(&self) -> Result<String>;

    /// All elements matching `selector` in document order, optionally
    /// restricted to descendants of `scope`.
    async fn query(
        &self,
        selector: &Selector,
        scope: Option<ElementHandle>,
    ) -> Result<Vec<ElementInfo>>;

    async fn fill(&self, element: ElementHandle, value: &str) -> Result<()>;

    async fn click(&self, element: ElementHandle, strategy: ClickStrategy) -> Result<()>;

    /// Wait until no visible element matches `selector`. Returns false on timeout.
    async fn wait_until_hidden(&self, selector: &Selector, timeout: Duration) -> Result<bool>;

    async fn storage_state(&self) -> Result<StorageState>;

    async fn restore_storage_state(&self, state: &StorageState) -> Result<()>;

    /// Let client-side rendering and redirects finish after an interaction.
    async fn settle(&self);
}

/// Creates browser contexts, optionally seeded with a saved storage state.
#[async_trait]
pub trait PageOpener: Send + Sync {
    async fn open(&self, storage: Option<&StorageState>) -> Result<Arc<dyn Page>>;
}

/// Anything that can hand out the authenticated page.
pub trait PageSource {
    fn page(&self) -> Result<Arc<dyn Page>>;
}

impl PageSource for Arc<dyn Page> {
    fn page(&self) -> Result<Arc<dyn Page>> {
        Ok(Arc::clone(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(tag: &str) -> ElementInfo {
        ElementInfo {
            handle: ElementHandle(1),
            tag: tag.to_string(),
            text: String::new(),
            visible: true,
            attrs: BTreeMap::new(),
        }
    }

    #[test]
    fn test_heading_level() {
        assert_eq!(info("h1").heading_level(), Some(1));
        assert_eq!(info("h6").heading_level(), Some(6));
        assert_eq!(info("h7").heading_level(), None);
        assert_eq!(info("header").heading_level(), None);
        assert_eq!(info("p").heading_level(), None);
    }

    #[test]
    fn test_element_info_deserializes_from_script_output() {
        let raw = r#"{"handle": 7, "tag": "a", "text": "Docs", "visible": true,
                      "attrs": {"href": "/docs"}}"#;
        let parsed: ElementInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.handle, ElementHandle(7));
        assert_eq!(parsed.attr("href"), Some("/docs"));
        assert_eq!(parsed.attr("type"), None);
    }
}
