use std::sync::Arc;

use tracing::info;

use crate::app::error::{Result, TrailbusterError};
use crate::auth::{AuthSession, SessionStore, StdinCaptchaGate};
use crate::browser::{ChromeBrowser, PageOpener};
use crate::config::Config;
use crate::crawler::Crawler;
use crate::mail::{GmailMailbox, VerificationCodeFetcher};
use crate::parser::ContentParser;

/// Wires configuration to the crawl pipeline.
///
/// The browser is only launched by [`authenticate`](Self::authenticate), so
/// commands that never touch the site (stats, clear-session, parse) stay
/// cheap.
pub struct AppContext {
    pub config: Config,
    pub parser: ContentParser,
    pub crawler: Crawler,
}

/// A logged-in browser and the session driving it.
pub struct Authenticated {
    pub session: AuthSession,
    browser: Arc<ChromeBrowser>,
}

impl Authenticated {
    pub async fn close(self) {
        drop(self.session);
        match Arc::try_unwrap(self.browser) {
            Ok(browser) => browser.close().await,
            Err(_) => info!("Browser still in use, leaving it to shut down on drop"),
        }
    }
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let parser = ContentParser::new(config.parser.clone());
        let crawler = Crawler::new(config.crawler.clone(), parser.clone())?;
        Ok(Self {
            config,
            parser,
            crawler,
        })
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.config.auth.session_file.clone())
    }

    /// Launch the browser and log in as `email`.
    pub async fn authenticate(&self, email: &str, use_saved_session: bool) -> Result<Authenticated> {
        let browser = Arc::new(ChromeBrowser::launch(self.config.browser.clone()).await?);
        let mailbox = Arc::new(GmailMailbox::new(self.config.mail.clone())?);
        let codes = Arc::new(VerificationCodeFetcher::new(mailbox, self.config.mail.clone()));
        let opener: Arc<dyn PageOpener> = browser.clone();

        let mut session = AuthSession::new(
            opener,
            self.config.auth.clone(),
            codes,
            Arc::new(StdinCaptchaGate),
        )
        .with_retry_policy(self.config.crawler.retry_policy());

        let result = session.login(email, use_saved_session).await;
        if !result.is_logged_in {
            let reason = result.error.unwrap_or_else(|| "Login failed".to_string());
            drop(session);
            if let Ok(browser) = Arc::try_unwrap(browser) {
                browser.close().await;
            }
            return Err(TrailbusterError::Login(reason));
        }

        info!(session_restored = result.session_restored, "Logged in");
        Ok(Authenticated { session, browser })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_uses_configured_paths() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.crawler.output_dir = dir.path().join("out");
        config.auth.session_file = dir.path().join("session.json");

        let ctx = AppContext::new(config).unwrap();
        assert!(dir.path().join("out").is_dir());
        assert_eq!(ctx.session_store().path(), dir.path().join("session.json"));
        assert_eq!(ctx.crawler.stats().total_urls, 0);
    }
}
