use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use url::Url;

use crate::app::{Result, TrailbusterError};
use crate::browser::script::CAPTURED_ATTRS;
use crate::browser::{ClickStrategy, ElementHandle, ElementInfo, Page, PageOpener, Selector};
use crate::domain::{StorageState, StoredCookie};

const BLANK: &str = "about:blank";

/// Elements never rendered regardless of styling.
const NON_RENDERED: [&str; 9] = [
    "head", "script", "style", "template", "noscript", "title", "meta", "link", "base",
];

/// HTML served for one URL, optionally varying with a cookie.
#[derive(Debug, Clone, Default)]
struct Route {
    html: Option<String>,
    by_cookie: Vec<(String, String)>,
}

type Routes = Arc<Mutex<HashMap<String, Route>>>;

fn insert_route(routes: &Routes, url: &str, cookie: Option<&str>, html: &str) {
    let mut routes = lock(routes);
    let route = routes.entry(route_key(url)).or_default();
    match cookie {
        Some(name) => route.by_cookie.push((name.to_string(), html.to_string())),
        None => route.html = Some(html.to_string()),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn route_key(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

/// An in-memory site: a fixed set of URL → HTML routes.
///
/// Every page opened from the site shares its routes, so pages can be
/// inspected after a run through [`HtmlSite::opened`].
#[derive(Default)]
pub struct HtmlSite {
    routes: Routes,
    opened: Mutex<Vec<Arc<HtmlPage>>>,
}

impl HtmlSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, html: &str) -> Self {
        self.add_route(url, html);
        self
    }

    /// Serve `html` at `url` whenever the page holds a cookie named `cookie`.
    pub fn route_with_cookie(self, url: &str, cookie: &str, html: &str) -> Self {
        insert_route(&self.routes, url, Some(cookie), html);
        self
    }

    pub fn add_route(&self, url: &str, html: &str) {
        insert_route(&self.routes, url, None, html);
    }

    /// Pages opened so far, oldest first.
    pub fn opened(&self) -> Vec<Arc<HtmlPage>> {
        lock(&self.opened).clone()
    }
}

#[async_trait]
impl PageOpener for HtmlSite {
    async fn open(&self, storage: Option<&StorageState>) -> Result<Arc<dyn Page>> {
        let page = Arc::new(HtmlPage::with_routes(Arc::clone(&self.routes)));
        if let Some(state) = storage {
            page.restore_storage_state(state).await?;
        }
        lock(&self.opened).push(Arc::clone(&page));
        Ok(page)
    }
}

#[derive(Default)]
struct PageState {
    url: String,
    html: String,
    storage: StorageState,
    visits: Vec<String>,
    fills: Vec<(ElementHandle, String)>,
    clicks: Vec<(ElementHandle, ClickStrategy)>,
}

/// A [`Page`] over static HTML parsed with the `scraper` crate.
///
/// Element handles are indexes into the document-order element list, so
/// they stay valid until the next navigation. Visibility is approximated
/// from markup only: the `hidden` attribute, `type="hidden"` inputs, inline
/// `display:none`/`visibility:hidden` on the element or any ancestor, and
/// non-rendered containers like `<head>`.
///
/// A loaded document may set cookies with
/// `<meta http-equiv="set-cookie" content="name=value">`; routes registered
/// with [`HtmlSite::route_with_cookie`] then serve their cookie variant.
pub struct HtmlPage {
    routes: Routes,
    state: Mutex<PageState>,
}

impl Default for HtmlPage {
    fn default() -> Self {
        Self::with_routes(Routes::default())
    }
}

impl HtmlPage {
    fn with_routes(routes: Routes) -> Self {
        Self {
            routes,
            state: Mutex::new(PageState {
                url: BLANK.to_string(),
                ..PageState::default()
            }),
        }
    }

    /// A page with `html` already loaded at `url`.
    pub fn from_html(url: &str, html: &str) -> Self {
        let page = Self::default();
        insert_route(&page.routes, url, None, html);
        {
            let mut state = lock(&page.state);
            state.url = url.to_string();
            state.html = html.to_string();
        }
        page
    }

    /// Register another reachable URL.
    pub fn with_route(self, url: &str, html: &str) -> Self {
        insert_route(&self.routes, url, None, html);
        self
    }

    /// Every URL successfully loaded, in order.
    pub fn visits(&self) -> Vec<String> {
        lock(&self.state).visits.clone()
    }

    pub fn filled_values(&self) -> Vec<String> {
        lock(&self.state).fills.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn clicks(&self) -> Vec<(ElementHandle, ClickStrategy)> {
        lock(&self.state).clicks.clone()
    }

    fn html(&self) -> String {
        lock(&self.state).html.clone()
    }

    fn load(&self, url: &str) -> Result<()> {
        let (target, cookies) = {
            let state = lock(&self.state);
            let cookies: Vec<String> = state.storage.cookies.iter().map(|c| c.name.clone()).collect();
            (resolve(&state.url, url), cookies)
        };

        let html = lock(&self.routes).get(&route_key(&target)).and_then(|route| {
            route
                .by_cookie
                .iter()
                .find(|(name, _)| cookies.contains(name))
                .map(|(_, html)| html.clone())
                .or_else(|| route.html.clone())
        });
        let html = html.ok_or_else(|| TrailbusterError::Navigation {
            url: target.clone(),
            attempts: 1,
            message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
        })?;

        let domain = Url::parse(&target)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        let set_cookies = meta_cookies(&html, &domain);

        let mut state = lock(&self.state);
        for cookie in set_cookies {
            state.storage.cookies.retain(|c| c.name != cookie.name);
            state.storage.cookies.push(cookie);
        }
        state.url = target.clone();
        state.html = html;
        state.visits.push(target);
        Ok(())
    }
}

fn meta_cookies(html: &str, domain: &str) -> Vec<StoredCookie> {
    let doc = Html::parse_document(html);
    let Ok(meta) = scraper::Selector::parse("meta[http-equiv][content]") else {
        return Vec::new();
    };
    doc.select(&meta)
        .filter(|m| {
            m.value()
                .attr("http-equiv")
                .is_some_and(|v| v.eq_ignore_ascii_case("set-cookie"))
        })
        .filter_map(|m| {
            let content = m.value().attr("content")?;
            let pair = content.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            Some(StoredCookie {
                name: name.trim().to_string(),
                value: value.trim().to_string(),
                domain: domain.to_string(),
                path: "/".to_string(),
                expires: -1.0,
                http_only: false,
                secure: false,
                same_site: None,
            })
        })
        .collect()
}

fn resolve(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

fn parse_css(selector: &Selector) -> Result<scraper::Selector> {
    scraper::Selector::parse(selector.css())
        .map_err(|e| TrailbusterError::Selector(format!("{}: {:?}", selector, e)))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn text_of(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn hides(element: &scraper::node::Element) -> bool {
    if element.attr("hidden").is_some() || NON_RENDERED.contains(&element.name()) {
        return true;
    }
    if element.name() == "input"
        && element
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
    {
        return true;
    }
    element.attr("style").is_some_and(|style| {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

fn is_visible(element: ElementRef<'_>) -> bool {
    !hides(element.value())
        && element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .all(|a| !hides(a.value()))
}

fn all_elements(doc: &Html) -> Vec<ElementRef<'_>> {
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect()
}

fn describe(element: ElementRef<'_>, index: usize) -> ElementInfo {
    let value = element.value();
    let attrs: BTreeMap<String, String> = CAPTURED_ATTRS
        .iter()
        .filter_map(|name| value.attr(name).map(|v| (name.to_string(), v.to_string())))
        .collect();

    ElementInfo {
        handle: ElementHandle(index as u64),
        tag: value.name().to_lowercase(),
        text: text_of(element),
        visible: is_visible(element),
        attrs,
    }
}

fn query_document(
    html: &str,
    selector: &Selector,
    scope: Option<ElementHandle>,
) -> Result<Vec<ElementInfo>> {
    let css = parse_css(selector)?;
    let doc = Html::parse_document(html);
    let elements = all_elements(&doc);
    let index: HashMap<_, usize> = elements
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id(), i))
        .collect();

    let matches: Vec<ElementRef<'_>> = match scope {
        Some(handle) => {
            let root = elements
                .get(handle.0 as usize)
                .ok_or_else(|| TrailbusterError::ElementNotFound(format!("stale handle {}", handle.0)))?;
            root.select(&css).filter(|e| e.id() != root.id()).collect()
        }
        None => doc.select(&css).collect(),
    };

    Ok(matches
        .into_iter()
        .filter(|e| selector.text_matches(&text_of(*e)))
        .filter_map(|e| index.get(&e.id()).map(|&i| describe(e, i)))
        .collect())
}

fn is_submit_control(element: &scraper::node::Element) -> bool {
    let kind = element.attr("type").map(str::to_ascii_lowercase);
    match element.name() {
        "button" => matches!(kind.as_deref(), None | Some("submit")),
        "input" => matches!(kind.as_deref(), Some("submit") | Some("image")),
        name => name.contains("button"),
    }
}

/// Where a click on the element at `index` navigates to, if anywhere.
fn click_target(html: &str, index: usize, strategy: ClickStrategy) -> Result<Option<String>> {
    let doc = Html::parse_document(html);
    let elements = all_elements(&doc);
    let mut target = *elements
        .get(index)
        .ok_or_else(|| TrailbusterError::ElementNotFound(format!("stale handle {}", index)))?;

    if strategy == ClickStrategy::NestedLabel {
        target = target
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "span" && is_visible(*e))
            .ok_or_else(|| TrailbusterError::ElementNotFound("visible span inside element".into()))?;
    }

    let chain = std::iter::once(target).chain(target.ancestors().filter_map(ElementRef::wrap));
    let mut submits = false;
    for element in chain {
        let value = element.value();
        if value.name() == "a" {
            if let Some(href) = value.attr("href") {
                return Ok(Some(href.to_string()));
            }
        }
        if is_submit_control(value) {
            submits = true;
        }
        if value.name() == "form" {
            return Ok(if submits {
                value.attr("action").map(str::to_string)
            } else {
                None
            });
        }
    }
    Ok(None)
}

#[async_trait]
impl Page for HtmlPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.load(url)
    }

    async fn current_url(&self) -> Result<String> {
        Ok(lock(&self.state).url.clone())
    }

    async fn title(&self) -> Result<Option<String>> {
        let doc = Html::parse_document(&self.html());
        let title = scraper::Selector::parse("title")
            .ok()
            .and_then(|s| doc.select(&s).next().map(text_of))
            .filter(|t| !t.is_empty());
        Ok(title)
    }

    async fn body_text(&self) -> Result<String> {
        let doc = Html::parse_document(&self.html());
        let body = scraper::Selector::parse("body")
            .ok()
            .and_then(|s| doc.select(&s).next().map(|b| b.text().collect::<String>()));
        Ok(body.unwrap_or_default())
    }

    async fn query(
        &self,
        selector: &Selector,
        scope: Option<ElementHandle>,
    ) -> Result<Vec<ElementInfo>> {
        query_document(&self.html(), selector, scope)
    }

    async fn fill(&self, element: ElementHandle, value: &str) -> Result<()> {
        let tag = {
            let doc = Html::parse_document(&self.html());
            all_elements(&doc)
                .get(element.0 as usize)
                .map(|e| e.value().name().to_string())
        };
        match tag.as_deref() {
            Some("input") | Some("textarea") => {
                lock(&self.state).fills.push((element, value.to_string()));
                Ok(())
            }
            Some(other) => Err(TrailbusterError::Browser(format!(
                "Element <{}> is not an <input> or <textarea>",
                other
            ))),
            None => Err(TrailbusterError::ElementNotFound(format!(
                "stale handle {}",
                element.0
            ))),
        }
    }

    async fn click(&self, element: ElementHandle, strategy: ClickStrategy) -> Result<()> {
        let target = click_target(&self.html(), element.0 as usize, strategy)?;
        lock(&self.state).clicks.push((element, strategy));
        match target {
            Some(href) => self.load(&href),
            None => Ok(()),
        }
    }

    async fn wait_until_hidden(&self, selector: &Selector, _timeout: Duration) -> Result<bool> {
        let matches = query_document(&self.html(), selector, None)?;
        Ok(!matches.iter().any(|m| m.visible))
    }

    async fn storage_state(&self) -> Result<StorageState> {
        Ok(lock(&self.state).storage.clone())
    }

    async fn restore_storage_state(&self, state: &StorageState) -> Result<()> {
        lock(&self.state).storage = state.clone();
        Ok(())
    }

    async fn settle(&self) {}
}
