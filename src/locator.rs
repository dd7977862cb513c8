use tracing::{debug, error, info, warn};

use crate::app::{Result, TrailbusterError};
use crate::browser::{ClickStrategy, ElementInfo, Page, Selector};

/// Finds elements by trying an ordered list of candidate selectors.
///
/// Earlier selectors win. Only visible elements are ever returned, and a
/// failing selector is treated the same as one that matches nothing.
pub struct ElementLocator<'a> {
    page: &'a dyn Page,
}

impl<'a> ElementLocator<'a> {
    pub fn new(page: &'a dyn Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &'a dyn Page {
        self.page
    }

    /// The first match of the earliest selector whose first match is visible.
    pub async fn find(&self, selectors: &[Selector], what: &str) -> Option<ElementInfo> {
        for selector in selectors {
            if let Some(element) = self.first_visible(selector).await {
                info!("Found {}: {}", what, selector);
                return Some(element);
            }
        }

        warn!("Could not find {}", what);
        None
    }

    /// The first match of `selector`, if that match is visible.
    pub async fn first_visible(&self, selector: &Selector) -> Option<ElementInfo> {
        match self.page.query(selector, None).await {
            Ok(matches) => matches.into_iter().next().filter(|e| e.visible),
            Err(e) => {
                debug!("Error with selector {}: {}", selector, e);
                None
            }
        }
    }

    /// Like [`find`](Self::find) but considers every match of each selector,
    /// not only the first one.
    pub async fn find_any(&self, selectors: &[Selector], what: &str) -> Option<ElementInfo> {
        for selector in selectors {
            match self.page.query(selector, None).await {
                Ok(matches) => {
                    debug!("Found {} elements for {} selector: {}", matches.len(), what, selector);
                    if let Some((i, element)) = matches.into_iter().enumerate().find(|(_, e)| e.visible) {
                        info!("Found visible {}: {} (element {})", what, selector, i);
                        return Some(element);
                    }
                }
                Err(e) => debug!("Error with selector {}: {}", selector, e),
            }
        }

        warn!("Could not find {}", what);
        None
    }

    /// All visible matches of a single selector, in document order.
    pub async fn find_visible_all(&self, selector: &Selector) -> Vec<ElementInfo> {
        match self.page.query(selector, None).await {
            Ok(matches) => matches.into_iter().filter(|e| e.visible).collect(),
            Err(e) => {
                debug!("Error with selector {}: {}", selector, e);
                Vec::new()
            }
        }
    }

    /// Click `element`, escalating through [`ClickStrategy::ESCALATION`]
    /// until one strategy succeeds.
    pub async fn click_escalating(&self, element: &ElementInfo) -> Result<ClickStrategy> {
        let mut last_error = None;
        for strategy in ClickStrategy::ESCALATION {
            match self.page.click(element.handle, strategy).await {
                Ok(()) => {
                    info!("{:?} click successful", strategy);
                    return Ok(strategy);
                }
                Err(e) => {
                    debug!("{:?} click failed: {}", strategy, e);
                    last_error = Some(e);
                }
            }
        }

        Err(TrailbusterError::Browser(format!(
            "All click strategies failed for <{}>: {}",
            element.tag,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Log every element matching `selector` at error level.
    ///
    /// Used right before failing on a required element so the log shows what
    /// the page actually offered.
    pub async fn log_candidates(&self, selector: &Selector, what: &str) {
        let elements = match self.page.query(selector, None).await {
            Ok(elements) => elements,
            Err(e) => {
                error!("Could not list {} elements: {}", what, e);
                return;
            }
        };

        error!("No {} found. Total candidates on page: {}", what, elements.len());
        for (i, el) in elements.iter().enumerate() {
            error!(
                "{} {}: tag={}, text='{}', type={}, name={}, id={}, visible={}",
                what,
                i,
                el.tag,
                el.text,
                el.attr("type").unwrap_or("no-type"),
                el.attr("name").unwrap_or("no-name"),
                el.attr("id").unwrap_or("no-id"),
                el.visible
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{ElementHandle, HtmlPage};
    use crate::domain::StorageState;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::time::Duration;

    const PAGE: &str = r#"
        <html><body>
          <input id="ghost" type="email" style="display:none">
          <input id="username" type="text">
          <input id="email" type="email">
          <button class="a" hidden>Hidden</button>
          <button class="a">Shown</button>
        </body></html>
    "#;

    fn selectors(raw: &[&str]) -> Vec<Selector> {
        Selector::parse_all(raw)
    }

    #[tokio::test]
    async fn test_earlier_visible_selector_wins() {
        let page = HtmlPage::from_html("https://example.com/", PAGE);
        let locator = ElementLocator::new(&page);
        let found = locator
            .find(&selectors(&["#email", "#username"]), "input")
            .await
            .unwrap();
        assert_eq!(found.attr("id"), Some("email"));
    }

    #[tokio::test]
    async fn test_invisible_first_match_falls_through() {
        let page = HtmlPage::from_html("https://example.com/", PAGE);
        let locator = ElementLocator::new(&page);
        let found = locator
            .find(&selectors(&["input[type='email']", "#username"]), "input")
            .await
            .unwrap();
        assert_eq!(found.attr("id"), Some("username"));
    }

    #[tokio::test]
    async fn test_bad_selector_is_skipped() {
        let page = HtmlPage::from_html("https://example.com/", PAGE);
        let locator = ElementLocator::new(&page);
        let found = locator
            .find(&selectors(&["[[[", "#email"]), "input")
            .await
            .unwrap();
        assert_eq!(found.attr("id"), Some("email"));
    }

    #[tokio::test]
    async fn test_not_found() {
        let page = HtmlPage::from_html("https://example.com/", PAGE);
        let locator = ElementLocator::new(&page);
        assert!(locator.find(&selectors(&["#nope", "#ghost"]), "input").await.is_none());
    }

    #[tokio::test]
    async fn test_find_any_scans_all_matches() {
        let page = HtmlPage::from_html("https://example.com/", PAGE);
        let locator = ElementLocator::new(&page);
        assert!(locator.find(&selectors(&["button.a"]), "button").await.is_none());
        let found = locator.find_any(&selectors(&["button.a"]), "button").await.unwrap();
        assert_eq!(found.text, "Shown");
    }

    /// Page whose clicks fail for every strategy listed in `failing`.
    struct FlakyClicks {
        failing: Vec<ClickStrategy>,
        attempts: Mutex<Vec<ClickStrategy>>,
    }

    #[async_trait]
    impl Page for FlakyClicks {
        async fn goto(&self, _url: &str) -> Result<()> {
            Ok(())
        }
        async fn current_url(&self) -> Result<String> {
            Ok("about:blank".into())
        }
        async fn title(&self) -> Result<Option<String>> {
            Ok(None)
        }
        async fn body_text(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn query(&self, _s: &Selector, _scope: Option<ElementHandle>) -> Result<Vec<ElementInfo>> {
            Ok(Vec::new())
        }
        async fn fill(&self, _e: ElementHandle, _v: &str) -> Result<()> {
            Ok(())
        }
        async fn click(&self, _e: ElementHandle, strategy: ClickStrategy) -> Result<()> {
            self.attempts.lock().unwrap().push(strategy);
            if self.failing.contains(&strategy) {
                Err(TrailbusterError::Browser("intercepted".into()))
            } else {
                Ok(())
            }
        }
        async fn wait_until_hidden(&self, _s: &Selector, _t: Duration) -> Result<bool> {
            Ok(true)
        }
        async fn storage_state(&self) -> Result<StorageState> {
            Ok(StorageState::default())
        }
        async fn restore_storage_state(&self, _s: &StorageState) -> Result<()> {
            Ok(())
        }
        async fn settle(&self) {}
    }

    fn button() -> ElementInfo {
        ElementInfo {
            handle: ElementHandle(1),
            tag: "button".into(),
            text: "Log In".into(),
            visible: true,
            attrs: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_click_escalates_until_success() {
        let page = FlakyClicks {
            failing: vec![ClickStrategy::Forced, ClickStrategy::Timed],
            attempts: Mutex::new(Vec::new()),
        };
        let used = ElementLocator::new(&page).click_escalating(&button()).await.unwrap();
        assert_eq!(used, ClickStrategy::Script);
        assert_eq!(
            *page.attempts.lock().unwrap(),
            vec![ClickStrategy::Forced, ClickStrategy::Timed, ClickStrategy::Script]
        );
    }

    #[tokio::test]
    async fn test_click_exhausts_all_strategies() {
        let page = FlakyClicks {
            failing: ClickStrategy::ESCALATION.to_vec(),
            attempts: Mutex::new(Vec::new()),
        };
        let err = ElementLocator::new(&page).click_escalating(&button()).await.unwrap_err();
        assert!(err.to_string().contains("All click strategies failed"));
        assert_eq!(page.attempts.lock().unwrap().len(), 4);
    }
}
