use serde::{Deserialize, Serialize};

pub const UNTITLED: &str = "Untitled";
pub const NO_DESCRIPTION: &str = "No description available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Heading,
    Paragraph,
    Code,
    List,
}

/// One atomic piece of lesson content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub text: String,
    pub kind: ContentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ContentItem {
    pub fn heading(text: impl Into<String>, level: u8) -> Self {
        Self {
            text: text.into(),
            kind: ContentKind::Heading,
            level: Some(level.clamp(1, 6)),
            url: None,
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::plain(text, ContentKind::Paragraph)
    }

    pub fn code(text: impl Into<String>) -> Self {
        Self::plain(text, ContentKind::Code)
    }

    /// A list item block; entries are rendered as `• entry` lines.
    pub fn list<S: AsRef<str>>(entries: &[S]) -> Self {
        let text = entries
            .iter()
            .map(|e| format!("• {}", e.as_ref()))
            .collect::<Vec<_>>()
            .join("\n");
        Self::plain(text, ContentKind::List)
    }

    fn plain(text: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            text: text.into(),
            kind,
            level: None,
            url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRef {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonContent {
    pub title: String,
    pub url: String,
    pub content: Vec<ContentItem>,
    pub learning_objectives: Vec<String>,
    pub instructions: Vec<String>,
    pub links: Vec<Link>,
    pub estimated_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleContent {
    pub title: String,
    pub url: String,
    pub description: String,
    pub lessons: Vec<LessonRef>,
    pub estimated_time: Option<String>,
    pub difficulty: Option<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailInfo {
    pub title: String,
    pub description: String,
    pub url: String,
}
