//! Login state machine.
//!
//! ```text
//! Unauthenticated → SessionProbing → Restored
//!                                  ↘ FreshLoginStarted → CredentialSubmitted
//!                                      → AwaitingCode → CodeSubmitted → Authenticated
//! ```
//!
//! Any step may end in `Failed`. A failed restore falls through to a fresh
//! login; a fresh login is attempted once per [`AuthSession::login`] call.

mod captcha;
mod config;
mod session;

pub use captcha::{CaptchaGate, NoopCaptchaGate, StdinCaptchaGate};
pub use config::AuthSettings;
pub use session::SessionStore;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use crate::app::{Result, TrailbusterError};
use crate::browser::{navigate_with_retry, ElementInfo, Page, PageOpener, PageSource, RetryPolicy, Selector};
use crate::domain::StorageState;
use crate::locator::ElementLocator;
use crate::mail::CodeSource;

/// Input types a verification code can be typed into.
const CODE_INPUT_TYPES: [&str; 3] = ["text", "number", "tel"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Unauthenticated,
    SessionProbing,
    Restored,
    FreshLoginStarted,
    CredentialSubmitted,
    AwaitingCode,
    CodeSubmitted,
    Authenticated,
    Failed,
}

/// Outcome of one [`AuthSession::login`] call.
#[derive(Clone)]
pub struct LoginResult {
    pub page: Option<Arc<dyn Page>>,
    pub session_restored: bool,
    pub is_logged_in: bool,
    pub error: Option<String>,
}

impl fmt::Debug for LoginResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResult")
            .field("page", &self.page.as_ref().map(|_| "<page>"))
            .field("session_restored", &self.session_restored)
            .field("is_logged_in", &self.is_logged_in)
            .field("error", &self.error)
            .finish()
    }
}

/// Owns the authenticated page and the saved session.
pub struct AuthSession {
    opener: Arc<dyn PageOpener>,
    settings: AuthSettings,
    store: SessionStore,
    codes: Arc<dyn CodeSource>,
    captcha: Arc<dyn CaptchaGate>,
    retry: RetryPolicy,
    page: Option<Arc<dyn Page>>,
    state: LoginState,
}

impl AuthSession {
    pub fn new(
        opener: Arc<dyn PageOpener>,
        settings: AuthSettings,
        codes: Arc<dyn CodeSource>,
        captcha: Arc<dyn CaptchaGate>,
    ) -> Self {
        let store = SessionStore::new(settings.session_file.clone());
        Self {
            opener,
            settings,
            store,
            codes,
            captcha,
            retry: RetryPolicy::default(),
            page: None,
            state: LoginState::Unauthenticated,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    pub fn session_store(&self) -> &SessionStore {
        &self.store
    }

    fn transition(&mut self, next: LoginState) {
        debug!("Login state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Log in, reusing the saved session when `use_saved_session` is set and
    /// it still works.
    ///
    /// Never fails: problems are reported through [`LoginResult::error`].
    #[instrument(name = "auth", skip(self))]
    pub async fn login(&mut self, email: &str, use_saved_session: bool) -> LoginResult {
        let started = Instant::now();
        self.transition(LoginState::Unauthenticated);

        if use_saved_session {
            self.transition(LoginState::SessionProbing);
            match self.restore().await {
                Ok(Some(page)) => {
                    self.transition(LoginState::Restored);
                    self.page = Some(Arc::clone(&page));
                    info!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Session restored successfully"
                    );
                    return LoginResult {
                        page: Some(page),
                        session_restored: true,
                        is_logged_in: true,
                        error: None,
                    };
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to restore session: {}", e),
            }
        }

        info!("Starting login process...");
        match self.fresh_login(email).await {
            Ok(()) => {
                info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Login completed successfully!"
                );
                LoginResult {
                    page: self.page.clone(),
                    session_restored: false,
                    is_logged_in: true,
                    error: None,
                }
            }
            Err(e) => {
                self.transition(LoginState::Failed);
                error!("Login failed: {}", e);
                LoginResult {
                    page: self.page.clone(),
                    session_restored: false,
                    is_logged_in: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Open a context from the saved session and keep it if the probe says
    /// we are signed in. The session file is only read here.
    async fn restore(&mut self) -> Result<Option<Arc<dyn Page>>> {
        let Some(state) = self.store.load()? else {
            debug!("No saved session at {}", self.store.path().display());
            return Ok(None);
        };

        let page = self.opener.open(Some(&state)).await?;
        if self.probe(page.as_ref()).await {
            Ok(Some(page))
        } else {
            info!("Saved session is no longer valid");
            Ok(None)
        }
    }

    async fn fresh_login(&mut self, email: &str) -> Result<()> {
        self.transition(LoginState::FreshLoginStarted);
        let page = self.opener.open(None).await?;
        self.page = Some(Arc::clone(&page));
        let page = page.as_ref();

        navigate_with_retry(page, &self.settings.root_url(), &self.retry).await?;
        if self.probe(page).await {
            info!("Already logged in, no need for login process");
            self.transition(LoginState::Authenticated);
            return Ok(());
        }

        info!("Navigating directly to login URL...");
        navigate_with_retry(page, &self.settings.login_url(), &self.retry).await?;
        page.settle().await;

        let locator = ElementLocator::new(page);
        self.submit_credentials(&locator, email).await?;
        self.transition(LoginState::CredentialSubmitted);
        page.settle().await;

        if locator.find(&self.settings.captcha, "reCAPTCHA").await.is_some() {
            warn!("reCAPTCHA detected - manual intervention required");
            self.captcha.wait_for_human().await?;
        }

        self.transition(LoginState::AwaitingCode);
        info!("Retrieving verification code...");
        let code = self
            .codes
            .fetch_code()
            .await
            .ok_or_else(|| TrailbusterError::Login("Failed to retrieve verification code".into()))?;
        debug!("Got verification code: {}", code);

        self.submit_code(&locator, &code).await?;
        self.transition(LoginState::CodeSubmitted);
        page.settle().await;

        if !self.probe(page).await {
            return Err(TrailbusterError::Login("Login verification failed".into()));
        }

        self.transition(LoginState::Authenticated);
        self.save_session(page).await;
        Ok(())
    }

    async fn submit_credentials(&self, locator: &ElementLocator<'_>, email: &str) -> Result<()> {
        let input = match locator.find_any(&self.settings.email_input, "email input").await {
            Some(input) => input,
            None => {
                locator.log_candidates(&Selector::parse("input"), "email input").await;
                return Err(TrailbusterError::ElementNotFound(
                    "Could not find email input field".into(),
                ));
            }
        };
        locator.page().fill(input.handle, email).await?;

        let mut candidates = Vec::new();
        for selector in &self.settings.submit {
            candidates.extend(locator.find_visible_all(selector).await);
        }
        if !self.click_first(locator, &candidates, "submit button").await {
            locator
                .log_candidates(&self.settings.button_candidates, "submit button")
                .await;
            return Err(TrailbusterError::ElementNotFound(
                "Could not find submit button".into(),
            ));
        }
        Ok(())
    }

    async fn submit_code(&self, locator: &ElementLocator<'_>, code: &str) -> Result<()> {
        let input = match locator.find(&self.settings.code_input, "verification code input").await {
            Some(input) => Some(input),
            None => {
                info!("No specific verification field found, looking for any suitable input...");
                locator
                    .find_visible_all(&Selector::parse("input"))
                    .await
                    .into_iter()
                    .find(|i| CODE_INPUT_TYPES.contains(&i.attr("type").unwrap_or("text")))
            }
        };
        let input = input.ok_or_else(|| {
            TrailbusterError::ElementNotFound("Could not find verification code input field".into())
        })?;
        locator.page().fill(input.handle, code).await?;

        let mut candidates = Vec::new();
        for selector in &self.settings.verify {
            candidates.extend(locator.first_visible(selector).await);
        }
        if !self.click_first(locator, &candidates, "verify button").await {
            return Err(TrailbusterError::ElementNotFound(
                "Could not find verification submit button".into(),
            ));
        }
        Ok(())
    }

    /// Click the first candidate that accepts a click under any strategy.
    async fn click_first(&self, locator: &ElementLocator<'_>, candidates: &[ElementInfo], what: &str) -> bool {
        for element in candidates {
            let page = locator.page();
            match page
                .wait_until_hidden(&self.settings.loading_indicator, self.settings.loading_wait())
                .await
            {
                Ok(true) => {}
                Ok(false) => debug!("Loading indicator still visible, clicking anyway"),
                Err(e) => debug!("Loading indicator check failed: {}", e),
            }

            match locator.click_escalating(element).await {
                Ok(strategy) => {
                    info!("Clicked {} <{}> with {:?} strategy", what, element.tag, strategy);
                    return true;
                }
                Err(e) => debug!("{}", e),
            }
        }
        false
    }

    /// Whether `page` is signed in.
    ///
    /// Loads the home page, then checks signed-in markers, signed-out
    /// markers, and finally the URL. Undecidable or failed probes count as
    /// signed out.
    pub async fn probe(&self, page: &dyn Page) -> bool {
        info!("Checking login status...");
        if let Err(e) = page.goto(&self.settings.home_url()).await {
            error!("Login status check failed: {}", e);
            return false;
        }

        let locator = ElementLocator::new(page);
        for selector in &self.settings.logged_in {
            if locator.first_visible(selector).await.is_some() {
                info!("User is logged in: found {}", selector);
                return true;
            }
        }
        for selector in &self.settings.logged_out {
            if locator.first_visible(selector).await.is_some() {
                info!("User is not logged in: found {}", selector);
                return false;
            }
        }

        let current = match page.current_url().await {
            Ok(url) => url,
            Err(e) => {
                error!("Login status check failed: {}", e);
                return false;
            }
        };
        if self.settings.login_url_markers.iter().any(|m| current.contains(m.as_str())) {
            info!("User is not logged in: current URL is a login page: {}", current);
            return false;
        }
        let on_site = self
            .settings
            .site_host()
            .is_some_and(|host| current.contains(&host));
        if on_site || current.contains(&self.settings.home_path) {
            info!("User appears to be logged in: current URL: {}", current);
            return true;
        }

        warn!("Could not determine login status");
        false
    }

    async fn save_session(&self, page: &dyn Page) {
        let saved = match page.storage_state().await {
            Ok(state) => self.store.save(&state),
            Err(e) => Err(e),
        };
        match saved {
            Ok(()) => info!("Session saved successfully!"),
            Err(e) => warn!("Could not save session: {}", e),
        }
    }

    /// Delete the saved session file.
    pub fn clear_session(&self) -> Result<bool> {
        self.store.clear()
    }

    pub fn saved_session(&self) -> Result<Option<StorageState>> {
        self.store.load()
    }
}

impl PageSource for AuthSession {
    fn page(&self) -> Result<Arc<dyn Page>> {
        self.page
            .clone()
            .ok_or_else(|| TrailbusterError::Other("No page available. Call login() first.".into()))
    }
}
