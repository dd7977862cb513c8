use std::fmt;

use serde::{Deserialize, Serialize};

const HAS_TEXT: &str = ":has-text(";

/// A CSS selector with an optional trailing `:has-text('…')` filter.
///
/// The text filter is a case-insensitive substring match against the
/// element's text content. It is evaluated by the page implementation,
/// not by the CSS engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Selector {
    css: String,
    has_text: Option<String>,
}

impl Selector {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(start) = raw.rfind(HAS_TEXT) {
            if let Some(needle) = raw[start + HAS_TEXT.len()..]
                .strip_suffix(')')
                .and_then(unquote)
            {
                let css = raw[..start].trim();
                return Self {
                    css: if css.is_empty() { "*".to_string() } else { css.to_string() },
                    has_text: Some(needle.to_string()),
                };
            }
        }

        Self {
            css: raw.to_string(),
            has_text: None,
        }
    }

    pub fn parse_all<S: AsRef<str>>(raw: &[S]) -> Vec<Self> {
        raw.iter().map(|s| Self::parse(s.as_ref())).collect()
    }

    pub fn css(&self) -> &str {
        &self.css
    }

    pub fn has_text(&self) -> Option<&str> {
        self.has_text.as_deref()
    }

    /// Whether `text` passes the `:has-text` filter.
    pub fn text_matches(&self, text: &str) -> bool {
        match &self.has_text {
            Some(needle) => text.to_lowercase().contains(&needle.to_lowercase()),
            None => true,
        }
    }
}

fn unquote(s: &str) -> Option<&str> {
    let s = s.trim();
    for quote in ['\'', '"'] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return Some(inner);
        }
    }
    None
}

impl From<String> for Selector {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for Selector {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.to_string()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.has_text {
            Some(needle) if self.css == "*" => write!(f, ":has-text('{}')", needle),
            Some(needle) => write!(f, "{}:has-text('{}')", self.css, needle),
            None => f.write_str(&self.css),
        }
    }
}
