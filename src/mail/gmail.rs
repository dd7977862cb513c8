use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use url::Url;

use crate::app::{Result, TrailbusterError};
use crate::mail::body::{message_body, GmailMessage};
use crate::mail::token::{parse_pasted_code, ClientSecret, OAuthToken, TokenResponse};
use crate::mail::{MailMessage, MailSettings, Mailbox};

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

/// [`Mailbox`] backed by the Gmail REST API.
pub struct GmailMailbox {
    client: Client,
    settings: MailSettings,
    token: Mutex<Option<OAuthToken>>,
}

impl GmailMailbox {
    pub fn new(settings: MailSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("trailbuster/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            settings,
            token: Mutex::new(None),
        })
    }

    /// A valid access token: cached, loaded from disk, refreshed, or granted
    /// interactively, in that order.
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;

        if cached.is_none() {
            if let Some(token) = OAuthToken::load(&self.settings.token_file)? {
                info!("Loading existing Gmail credentials...");
                *cached = Some(token);
            }
        }

        let token = match cached.take() {
            Some(token) if !token.is_expired(Utc::now()) => token,
            Some(token) if token.refresh_token.is_some() => {
                info!("Refreshing Gmail credentials...");
                let token = self.refresh(token).await?;
                token.save(&self.settings.token_file)?;
                token
            }
            _ => {
                let token = self.interactive_grant().await?;
                token.save(&self.settings.token_file)?;
                token
            }
        };

        let access = token.access_token.clone();
        *cached = Some(token);
        Ok(access)
    }

    async fn post_form(&self, uri: &str, form: String) -> Result<TokenResponse> {
        let response = self
            .client
            .post(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TrailbusterError::MailCredentials(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        Ok(serde_json::from_slice(&response.bytes().await?)?)
    }

    async fn refresh(&self, mut token: OAuthToken) -> Result<OAuthToken> {
        let form = token
            .refresh_form()
            .ok_or_else(|| TrailbusterError::MailCredentials("no refresh token".into()))?;
        let response = self.post_form(&token.token_uri, form).await?;
        token.apply(response, Utc::now());
        Ok(token)
    }

    async fn interactive_grant(&self) -> Result<OAuthToken> {
        info!("Getting new Gmail credentials...");
        if !self.settings.client_secret_file.exists() {
            return Err(TrailbusterError::MailCredentials(format!(
                "{} file not found. Please download it from Google Cloud Console",
                self.settings.client_secret_file.display()
            )));
        }

        let secret = ClientSecret::load(&self.settings.client_secret_file)?;
        let consent = secret.consent_url()?;

        println!("Please authenticate with your Gmail account to enable verification code retrieval:");
        println!("  {}", consent);
        println!("After approving, paste the code (or the full redirected URL) here:");
        if let Err(e) = open::that(consent.as_str()) {
            warn!("Could not open browser: {}", e);
        }

        let pasted = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await
        .map_err(|e| TrailbusterError::Other(format!("Prompt task failed: {}", e)))??;

        let code = parse_pasted_code(&pasted)
            .ok_or_else(|| TrailbusterError::MailCredentials("no authorization code entered".into()))?;

        let form = secret.exchange_form(&code);
        let response = self.post_form(&secret.token_uri, form).await?;
        Ok(secret.into_token(response, Utc::now()))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await?;
        response.error_for_status_ref()?;
        Ok(serde_json::from_slice(&response.bytes().await?)?)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}/{}",
            self.settings.api_base.trim_end_matches('/'),
            path
        ))?)
    }
}

#[async_trait]
impl Mailbox for GmailMailbox {
    #[instrument(name = "mail", skip(self))]
    async fn recent_messages(&self, query: &str, limit: usize) -> Result<Vec<MailMessage>> {
        let mut list_url = self.endpoint("users/me/messages")?;
        list_url
            .query_pairs_mut()
            .append_pair("q", query)
            .append_pair("maxResults", &limit.to_string());

        let list: MessageList = self.get_json(list_url).await?;

        let mut messages = Vec::new();
        for reference in list.messages.into_iter().take(limit) {
            let mut url = self.endpoint(&format!("users/me/messages/{}", reference.id))?;
            url.query_pairs_mut().append_pair("format", "full");
            let message: GmailMessage = self.get_json(url).await?;
            messages.push(MailMessage {
                body: message_body(&message),
                id: message.id,
            });
        }
        Ok(messages)
    }
}
