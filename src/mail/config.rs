use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Mailbox access and verification-code polling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    /// Cached OAuth token, refreshed in place (default: token.json)
    pub token_file: PathBuf,

    /// OAuth client secret downloaded from the Google Cloud console (default: credentials.json)
    pub client_secret_file: PathBuf,

    /// Gmail search query for verification messages
    pub query: String,

    /// Polling attempts before giving up (default: 10)
    pub max_attempts: u32,

    /// Delay between attempts in seconds (default: 5)
    pub delay_secs: u64,

    /// Most recent messages inspected per attempt (default: 5)
    pub messages_per_attempt: usize,

    /// Gmail REST endpoint
    pub api_base: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            token_file: PathBuf::from("token.json"),
            client_secret_file: PathBuf::from("credentials.json"),
            query: "from:salesforce.com subject:verification newer_than:1d".to_string(),
            max_attempts: 10,
            delay_secs: 5,
            messages_per_attempt: 5,
            api_base: "https://gmail.googleapis.com/gmail/v1".to_string(),
        }
    }
}

impl MailSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}
