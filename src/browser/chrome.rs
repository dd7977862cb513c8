use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    ClearBrowserCookiesParams, Cookie, CookieParam, CookieSameSite, TimeSinceEpoch,
};
use chromiumoxide::element::Element;
use futures::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::{Result, TrailbusterError};
use crate::browser::script::{
    local_storage_restore_script, query_script, ref_selector, CLEAR_VALUE_FN, LOCAL_STORAGE_DUMP,
    SCRIPT_CLICK_FN,
};
use crate::browser::{
    BrowserSettings, ClickStrategy, ElementHandle, ElementInfo, Page, PageOpener, Selector,
};
use crate::domain::{NameValue, OriginStorage, StorageState, StoredCookie};

const HIDDEN_POLL: Duration = Duration::from_millis(250);

fn browser_err<E: Display>(context: &'static str) -> impl FnOnce(E) -> TrailbusterError {
    move |e| TrailbusterError::Browser(format!("{}: {}", context, e))
}

/// A launched Chrome/Chromium process driven over CDP.
pub struct ChromeBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
    settings: BrowserSettings,
}

impl ChromeBrowser {
    pub async fn launch(settings: BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(settings.window_width, settings.window_height)
            .request_timeout(settings.timeout())
            .args(settings.args.iter().map(String::as_str));

        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(ref path) = settings.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|e| TrailbusterError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            TrailbusterError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {}", e);
                }
            }
        });

        info!(headless = settings.headless, "Browser started");
        Ok(Self {
            browser,
            handler,
            settings,
        })
    }

    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Error closing browser: {}", e);
        }
        let _ = self.browser.wait().await;
        info!("Browser closed");
    }
}

impl Drop for ChromeBrowser {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl PageOpener for ChromeBrowser {
    async fn open(&self, storage: Option<&StorageState>) -> Result<Arc<dyn Page>> {
        let action = if storage.is_some() { "Loading" } else { "Creating" };
        info!("{} browser context...", action);

        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(browser_err("Failed to create page"))?;

        if let Some(ref ua) = self.settings.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(browser_err("Failed to set user agent"))?;
        }

        let page = ChromePage {
            page,
            settings: self.settings.clone(),
        };

        match storage {
            Some(state) => page.restore_storage_state(state).await?,
            // Pages share one profile, so a fresh context means dropping old cookies
            None => {
                page.page
                    .execute(ClearBrowserCookiesParams::default())
                    .await
                    .map_err(browser_err("Failed to clear cookies"))?;
            }
        }

        Ok(Arc::new(page))
    }
}

/// [`Page`] implementation over a chromiumoxide tab.
pub struct ChromePage {
    page: chromiumoxide::Page,
    settings: BrowserSettings,
}

#[derive(Deserialize)]
struct LocalStorageDump {
    origin: String,
    entries: Vec<NameValue>,
}

impl ChromePage {
    async fn element(&self, handle: ElementHandle) -> Result<Element> {
        self.page
            .find_element(ref_selector(handle))
            .await
            .map_err(|e| TrailbusterError::ElementNotFound(format!("handle {}: {}", handle.0, e)))
    }

    async fn forced_click(&self, element: &Element) -> Result<()> {
        let point = element
            .clickable_point()
            .await
            .map_err(browser_err("No clickable point"))?;
        self.page
            .click(point)
            .await
            .map_err(browser_err("Forced click failed"))?;
        Ok(())
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T> {
        self.page
            .evaluate(script)
            .await
            .map_err(browser_err("Script execution failed"))?
            .into_value()
            .map_err(browser_err("Failed to parse result"))
    }
}

fn to_cookie_param(cookie: &StoredCookie) -> CookieParam {
    let mut param = CookieParam::new(cookie.name.clone(), cookie.value.clone());
    param.domain = Some(cookie.domain.clone());
    param.path = Some(cookie.path.clone());
    param.secure = Some(cookie.secure);
    param.http_only = Some(cookie.http_only);
    param.same_site = cookie
        .same_site
        .as_deref()
        .and_then(|s| s.parse::<CookieSameSite>().ok());
    if cookie.expires >= 0.0 {
        param.expires = Some(TimeSinceEpoch::new(cookie.expires));
    }
    param
}

fn from_cookie(cookie: Cookie) -> StoredCookie {
    StoredCookie {
        expires: if cookie.session { -1.0 } else { cookie.expires },
        same_site: cookie.same_site.map(|s| s.as_ref().to_string()),
        name: cookie.name,
        value: cookie.value,
        domain: cookie.domain,
        path: cookie.path,
        http_only: cookie.http_only,
        secure: cookie.secure,
    }
}

#[async_trait]
impl Page for ChromePage {
    async fn goto(&self, url: &str) -> Result<()> {
        let navigation = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(self.settings.timeout(), navigation).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(TrailbusterError::Navigation {
                    url: url.to_string(),
                    attempts: 1,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(TrailbusterError::Navigation {
                    url: url.to_string(),
                    attempts: 1,
                    message: format!("timed out after {}s", self.settings.timeout_secs),
                })
            }
        }

        tokio::time::sleep(self.settings.settle()).await;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(browser_err("Failed to read URL"))?;
        Ok(url.unwrap_or_default())
    }

    async fn title(&self) -> Result<Option<String>> {
        self.page
            .get_title()
            .await
            .map_err(browser_err("Failed to read title"))
    }

    async fn body_text(&self) -> Result<String> {
        let text: Option<String> = self
            .evaluate("document.body ? document.body.textContent : ''".to_string())
            .await?;
        Ok(text.unwrap_or_default())
    }

    async fn query(
        &self,
        selector: &Selector,
        scope: Option<ElementHandle>,
    ) -> Result<Vec<ElementInfo>> {
        self.evaluate(query_script(selector, scope))
            .await
            .map_err(|e| TrailbusterError::Selector(format!("{}: {}", selector, e)))
    }

    async fn fill(&self, element: ElementHandle, value: &str) -> Result<()> {
        let element = self.element(element).await?;
        element
            .call_js_fn(CLEAR_VALUE_FN, false)
            .await
            .map_err(browser_err("Failed to clear input"))?;
        element
            .type_str(value)
            .await
            .map_err(browser_err("Failed to type into input"))?;
        Ok(())
    }

    async fn click(&self, handle: ElementHandle, strategy: ClickStrategy) -> Result<()> {
        let element = self.element(handle).await?;
        match strategy {
            ClickStrategy::Forced => self.forced_click(&element).await,
            ClickStrategy::Timed => {
                let click = async {
                    element.scroll_into_view().await?;
                    element.click().await?;
                    Ok::<_, chromiumoxide::error::CdpError>(())
                };
                match tokio::time::timeout(self.settings.element_wait(), click).await {
                    Ok(result) => result.map_err(browser_err("Click failed")),
                    Err(_) => Err(TrailbusterError::Browser(format!(
                        "Click timed out after {}s",
                        self.settings.element_wait_secs
                    ))),
                }
            }
            ClickStrategy::Script => {
                element
                    .call_js_fn(SCRIPT_CLICK_FN, false)
                    .await
                    .map_err(browser_err("Script click failed"))?;
                Ok(())
            }
            ClickStrategy::NestedLabel => {
                let spans = self.query(&Selector::parse("span"), Some(handle)).await?;
                let span = spans.into_iter().find(|s| s.visible).ok_or_else(|| {
                    TrailbusterError::ElementNotFound("visible span inside element".into())
                })?;
                let span = self.element(span.handle).await?;
                self.forced_click(&span).await
            }
        }
    }

    async fn wait_until_hidden(&self, selector: &Selector, timeout: Duration) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let matches = self.query(selector, None).await?;
            if !matches.iter().any(|m| m.visible) {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(HIDDEN_POLL).await;
        }
    }

    async fn storage_state(&self) -> Result<StorageState> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(browser_err("Failed to read cookies"))?
            .into_iter()
            .map(from_cookie)
            .collect();

        let dump: LocalStorageDump = self.evaluate(LOCAL_STORAGE_DUMP.to_string()).await?;
        let origins = if dump.entries.is_empty() {
            Vec::new()
        } else {
            vec![OriginStorage {
                origin: dump.origin,
                local_storage: dump.entries,
            }]
        };

        Ok(StorageState { cookies, origins })
    }

    async fn restore_storage_state(&self, state: &StorageState) -> Result<()> {
        if !state.cookies.is_empty() {
            let params = state.cookies.iter().map(to_cookie_param).collect();
            self.page
                .set_cookies(params)
                .await
                .map_err(browser_err("Failed to restore cookies"))?;
        }

        for origin in state.origins.iter().filter(|o| !o.local_storage.is_empty()) {
            self.page
                .goto(origin.origin.as_str())
                .await
                .map_err(browser_err("Failed to open origin for local storage"))?;
            let restored: usize = self
                .evaluate(local_storage_restore_script(&origin.local_storage))
                .await?;
            debug!(origin = %origin.origin, restored, "Local storage restored");
        }
        Ok(())
    }

    async fn settle(&self) {
        let _ = tokio::time::timeout(self.settings.timeout(), self.page.wait_for_navigation()).await;
        tokio::time::sleep(self.settings.settle()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_param_from_stored_cookie() {
        let cookie = StoredCookie {
            name: "sid".into(),
            value: "abc".into(),
            domain: ".salesforce.com".into(),
            path: "/".into(),
            expires: 1767225600.0,
            http_only: true,
            secure: true,
            same_site: Some("Lax".into()),
        };
        let param = to_cookie_param(&cookie);
        assert_eq!(param.name, "sid");
        assert_eq!(param.domain.as_deref(), Some(".salesforce.com"));
        assert_eq!(param.http_only, Some(true));
        assert_eq!(param.same_site, Some(CookieSameSite::Lax));
        assert!(param.expires.is_some());
    }

    #[test]
    fn test_session_cookie_has_no_expiry() {
        let cookie = StoredCookie {
            name: "a".into(),
            value: "b".into(),
            domain: "x.com".into(),
            path: "/".into(),
            expires: -1.0,
            http_only: false,
            secure: false,
            same_site: None,
        };
        let param = to_cookie_param(&cookie);
        assert!(param.expires.is_none());
        assert!(param.same_site.is_none());
    }

    #[tokio::test]
    #[ignore = "requires a local Chrome or Chromium"]
    async fn test_launch_and_query() {
        let browser = ChromeBrowser::launch(BrowserSettings {
            settle_ms: 0,
            ..BrowserSettings::default()
        })
        .await
        .unwrap();
        let page = browser.open(None).await.unwrap();
        page.goto("data:text/html,<h1>Hello</h1><p hidden>gone</p>")
            .await
            .unwrap();
        let headings = page.query(&Selector::parse("h1"), None).await.unwrap();
        assert_eq!(headings[0].text, "Hello");
        assert!(headings[0].visible);
        let hidden = page.query(&Selector::parse("p"), None).await.unwrap();
        assert!(!hidden[0].visible);
        browser.close().await;
    }
}
