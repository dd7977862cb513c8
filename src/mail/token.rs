//! OAuth credentials for the Gmail API.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::{Result, TrailbusterError};

pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const REDIRECT_URI: &str = "http://localhost";

/// Tokens within this window of expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Cached authorized-user credentials.
///
/// Field aliases accept token files written by Google's own client libraries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthToken {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, alias = "expiry")]
    pub expires_at: Option<DateTime<Utc>>,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl OAuthToken {
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now,
            None => false,
        }
    }

    /// Apply a token endpoint response, keeping the old refresh token when
    /// the endpoint does not rotate it.
    pub fn apply(&mut self, response: TokenResponse, now: DateTime<Utc>) {
        self.access_token = response.access_token;
        if response.refresh_token.is_some() {
            self.refresh_token = response.refresh_token;
        }
        self.expires_at = response.expires_in.map(|secs| now + Duration::seconds(secs));
    }

    pub fn refresh_form(&self) -> Option<String> {
        let refresh_token = self.refresh_token.as_deref()?;
        Some(
            url::form_urlencoded::Serializer::new(String::new())
                .append_pair("grant_type", "refresh_token")
                .append_pair("refresh_token", refresh_token)
                .append_pair("client_id", &self.client_id)
                .append_pair("client_secret", &self.client_secret)
                .finish(),
        )
    }
}

/// Response body of the OAuth token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Client secret file as downloaded from the Google Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecretFile {
    #[serde(default)]
    installed: Option<ClientSecret>,
    #[serde(default)]
    web: Option<ClientSecret>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

impl ClientSecret {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let file: ClientSecretFile = serde_json::from_str(&content)?;
        file.installed.or(file.web).ok_or_else(|| {
            TrailbusterError::MailCredentials(format!(
                "{} has neither an \"installed\" nor a \"web\" client",
                path.display()
            ))
        })
    }

    /// Consent page the operator opens to grant read-only mailbox access.
    pub fn consent_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.auth_uri)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", REDIRECT_URI)
            .append_pair("response_type", "code")
            .append_pair("scope", GMAIL_READONLY_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        Ok(url)
    }

    pub fn exchange_form(&self, code: &str) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "authorization_code")
            .append_pair("code", code)
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("redirect_uri", REDIRECT_URI)
            .finish()
    }

    pub fn into_token(self, response: TokenResponse, now: DateTime<Utc>) -> OAuthToken {
        let mut token = OAuthToken {
            access_token: String::new(),
            refresh_token: None,
            expires_at: None,
            client_id: self.client_id,
            client_secret: self.client_secret,
            token_uri: self.token_uri,
        };
        token.apply(response, now);
        token
    }
}

/// Pull the authorization code out of whatever the operator pasted: either
/// the bare code or the full redirect URL.
pub fn parse_pasted_code(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match Url::parse(input) {
        Ok(url) => url
            .query_pairs()
            .find(|(k, _)| k == "code")
            .map(|(_, v)| v.into_owned()),
        Err(_) => Some(input.to_string()),
    }
}
