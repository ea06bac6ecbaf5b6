use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single catalogue row.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub url: String,
    pub date_accessed: Option<DateTime<Utc>>,
    pub page_title: Option<String>,
    pub page_content: Option<String>,
    pub meta_tags: Vec<MetaTag>,
    pub parent_url: Option<String>,
    pub new_url: bool,
    pub date_added: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaTag {
    pub key: Option<String>,
    pub value: Option<String>,
}

/// Wire payload carried on `processor_q`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub url: String,
    pub page_title: Option<String>,
    pub page_content: Option<String>,
    pub meta_tags: Vec<MetaTag>,
    pub links: Vec<String>,
}

/// A `{url, title, description}` record returned from a model query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageView {
    pub url: String,
    pub title: String,
    pub description: String,
}

impl Page {
    /// Falls back to the URL when the title is absent or empty.
    pub fn display_title(&self) -> String {
        match &self.page_title {
            Some(t) if !t.is_empty() => t.clone(),
            _ => self.url.clone(),
        }
    }

    pub fn description(&self) -> String {
        self.meta_tags
            .iter()
            .find(|t| t.key.as_deref() == Some("description"))
            .and_then(|t| t.value.clone())
            .unwrap_or_default()
    }

    pub fn to_view(&self) -> PageView {
        PageView {
            url: self.url.clone(),
            title: self.display_title(),
            description: self.description(),
        }
    }
}

/// Lifecycle state of the singleton topic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelStatus {
    SettingUp,
    Ready,
    Updating,
}

impl ModelStatus {
    pub fn as_literal(&self) -> &'static str {
        match self {
            ModelStatus::SettingUp => "setting_up",
            ModelStatus::Ready => "ready",
            ModelStatus::Updating => "updating",
        }
    }
}
