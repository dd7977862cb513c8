//! Gmail message payloads and body extraction.

use std::sync::LazyLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use regex::Regex;
use serde::Deserialize;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static SKIPPED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(style|script)[^>]*>.*?</(style|script)>").expect("valid regex")
});

#[derive(Debug, Clone, Deserialize)]
pub struct GmailMessage {
    pub id: String,
    #[serde(default)]
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartBody {
    #[serde(default)]
    pub data: Option<String>,
}

impl MessagePart {
    fn decoded(&self) -> Option<String> {
        self.body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .and_then(decode_base64url)
    }

    fn find(&self, mime_type: &str) -> Option<String> {
        if self.mime_type.eq_ignore_ascii_case(mime_type) {
            if let Some(text) = self.decoded() {
                return Some(text);
            }
        }
        self.parts.iter().find_map(|p| p.find(mime_type))
    }
}

/// Decode Gmail's URL-safe base64, with or without padding.
pub fn decode_base64url(data: &str) -> Option<String> {
    let trimmed = data.trim().trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(trimmed).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Plain text of an HTML body: markup removed, entities decoded.
pub fn html_to_text(html: &str) -> String {
    let without_blocks = SKIPPED_BLOCK.replace_all(html, " ");
    let without_tags = TAG.replace_all(&without_blocks, " ");
    let decoded = html_escape::decode_html_entities(&without_tags);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text body of a message.
///
/// The first `text/plain` part wins, searching nested multiparts; otherwise
/// a `text/html` part is converted to text.
pub fn message_body(message: &GmailMessage) -> Option<String> {
    let payload = message.payload.as_ref()?;
    payload
        .find("text/plain")
        .or_else(|| payload.find("text/html").map(|html| html_to_text(&html)))
        .filter(|body| !body.trim().is_empty())
}
