//! Out-of-band verification code retrieval.
//!
//! ```text
//! VerificationCodeFetcher → Mailbox (GmailMailbox) → message body → 6-digit code
//! ```

mod body;
mod code;
mod config;
mod gmail;
mod token;

pub use body::{decode_base64url, html_to_text, message_body, GmailMessage};
pub use code::extract_verification_code;
pub use config::MailSettings;
pub use gmail::GmailMailbox;
pub use token::{ClientSecret, OAuthToken};

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::app::{Result, TrailbusterError};

/// One message returned by a mailbox search, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    pub id: String,
    pub body: Option<String>,
}

#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Up to `limit` of the most recent messages matching `query`.
    async fn recent_messages(&self, query: &str, limit: usize) -> Result<Vec<MailMessage>>;
}

/// Anything that can produce a one-time verification code.
#[async_trait]
pub trait CodeSource: Send + Sync {
    async fn fetch_code(&self) -> Option<String>;
}

/// Polls a mailbox until a verification code shows up.
pub struct VerificationCodeFetcher {
    mailbox: Arc<dyn Mailbox>,
    settings: MailSettings,
}

impl VerificationCodeFetcher {
    pub fn new(mailbox: Arc<dyn Mailbox>, settings: MailSettings) -> Self {
        Self { mailbox, settings }
    }

    /// Search for a code up to `max_attempts` times, sleeping `delay`
    /// between attempts.
    ///
    /// Returns `None` once the attempts are spent or when mailbox credentials
    /// are unavailable; other mailbox errors only cost an attempt.
    #[instrument(name = "mail", skip(self))]
    pub async fn fetch(&self, max_attempts: u32, delay: Duration) -> Option<String> {
        let started = Instant::now();
        let max_attempts = max_attempts.max(1);

        for attempt in 1..=max_attempts {
            info!("Attempt {}/{} to find verification code", attempt, max_attempts);

            match self
                .mailbox
                .recent_messages(&self.settings.query, self.settings.messages_per_attempt)
                .await
            {
                Ok(messages) if messages.is_empty() => {
                    info!("No verification code messages found");
                }
                Ok(messages) => {
                    let code = messages
                        .iter()
                        .filter_map(|m| m.body.as_deref())
                        .find_map(extract_verification_code);
                    if let Some(code) = code {
                        info!(
                            attempt,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Found verification code"
                        );
                        return Some(code);
                    }
                }
                Err(TrailbusterError::MailCredentials(reason)) => {
                    error!("Failed to authenticate with Gmail: {}", reason);
                    return None;
                }
                Err(e) => warn!("Error during attempt {}: {}", attempt, e),
            }

            if attempt < max_attempts {
                info!("Waiting {:?} before next attempt...", delay);
                tokio::time::sleep(delay).await;
            }
        }

        warn!("No 6-digit verification code found in message");
        None
    }
}

#[async_trait]
impl CodeSource for VerificationCodeFetcher {
    async fn fetch_code(&self) -> Option<String> {
        self.fetch(self.settings.max_attempts, self.settings.delay())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays one scripted response per call.
    struct ScriptedMailbox {
        responses: Mutex<VecDeque<Result<Vec<MailMessage>>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedMailbox {
        fn new(responses: Vec<Result<Vec<MailMessage>>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Mailbox for ScriptedMailbox {
        async fn recent_messages(&self, _query: &str, _limit: usize) -> Result<Vec<MailMessage>> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn message(body: &str) -> MailMessage {
        MailMessage {
            id: "m".into(),
            body: Some(body.into()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_code_arrives() {
        let mailbox = ScriptedMailbox::new(vec![
            Ok(Vec::new()),
            Err(TrailbusterError::Mail("503".into())),
            Ok(vec![message("Welcome!"), message("Your verification code is 042317")]),
        ]);
        let fetcher = VerificationCodeFetcher::new(mailbox.clone(), MailSettings::default());

        let code = fetcher.fetch(5, Duration::from_secs(5)).await;
        assert_eq!(code.as_deref(), Some("042317"));
        assert_eq!(mailbox.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let mailbox = ScriptedMailbox::new(Vec::new());
        let fetcher = VerificationCodeFetcher::new(mailbox.clone(), MailSettings::default());

        let started = tokio::time::Instant::now();
        assert_eq!(fetcher.fetch(3, Duration::from_secs(5)).await, None);
        assert_eq!(mailbox.calls(), 3);
        // no sleep after the final attempt
        assert!(started.elapsed() < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_credentials_failure_aborts() {
        let mailbox = ScriptedMailbox::new(vec![Err(TrailbusterError::MailCredentials(
            "credentials.json file not found".into(),
        ))]);
        let fetcher = VerificationCodeFetcher::new(mailbox.clone(), MailSettings::default());

        assert_eq!(fetcher.fetch(10, Duration::from_secs(5)).await, None);
        assert_eq!(mailbox.calls(), 1);
    }
}
