//! Content collections, their storage names and document shapes.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Parsed content document. In practice a mapping with an `items` sequence.
pub type Document = Value;

/// Logical content collection served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKey {
    Events,
    News,
    Faq,
}

impl ContentKey {
    pub const ALL: [ContentKey; 3] = [ContentKey::Events, ContentKey::News, ContentKey::Faq];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKey::Events => "events",
            ContentKey::News => "news",
            ContentKey::Faq => "faq",
        }
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown content key `{0}` (expected events, news or faq)")]
pub struct UnknownContentKey(pub String);

impl FromStr for ContentKey {
    type Err = UnknownContentKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "events" => Ok(ContentKey::Events),
            "news" => Ok(ContentKey::News),
            "faq" => Ok(ContentKey::Faq),
            _ => Err(UnknownContentKey(value.to_string())),
        }
    }
}

/// Serialization format of a stored resource, chosen by filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Json,
    Yaml,
}

impl ContentFormat {
    /// `.yaml`/`.yml` select YAML; every other name is parsed as JSON.
    pub fn from_name(name: &str) -> Self {
        let lowered = name.to_ascii_lowercase();
        if lowered.ends_with(".yaml") || lowered.ends_with(".yml") {
            ContentFormat::Yaml
        } else {
            ContentFormat::Json
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentFormat::Json => "JSON",
            ContentFormat::Yaml => "YAML",
        }
    }
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource names backing each collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFiles {
    pub events: String,
    pub news: String,
    pub faq: String,
}

impl ContentFiles {
    pub fn filename(&self, key: ContentKey) -> &str {
        match key {
            ContentKey::Events => &self.events,
            ContentKey::News => &self.news,
            ContentKey::Faq => &self.faq,
        }
    }
}

impl Default for ContentFiles {
    fn default() -> Self {
        Self {
            events: "events.json".to_string(),
            news: "news.json".to_string(),
            faq: "faq.json".to_string(),
        }
    }
}

/// Document returned in place of a collection that could not be loaded.
pub fn failure_document(message: impl Into<String>) -> Document {
    json!({
        "items": [],
        "error": message.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_parse_case_insensitively() {
        assert_eq!("Events".parse::<ContentKey>(), Ok(ContentKey::Events));
        assert_eq!(" faq ".parse::<ContentKey>(), Ok(ContentKey::Faq));
        assert!("blog".parse::<ContentKey>().is_err());
    }

    #[test]
    fn format_follows_suffix() {
        assert_eq!(ContentFormat::from_name("faq.yaml"), ContentFormat::Yaml);
        assert_eq!(ContentFormat::from_name("faq.YML"), ContentFormat::Yaml);
        assert_eq!(ContentFormat::from_name("faq.json"), ContentFormat::Json);
        assert_eq!(ContentFormat::from_name("faq"), ContentFormat::Json);
    }

    #[test]
    fn default_files_map_each_key() {
        let files = ContentFiles::default();
        assert_eq!(files.filename(ContentKey::Events), "events.json");
        assert_eq!(files.filename(ContentKey::News), "news.json");
        assert_eq!(files.filename(ContentKey::Faq), "faq.json");
    }

    #[test]
    fn failure_document_has_empty_items() {
        let document = failure_document("File not found: news.json");
        assert_eq!(document["items"], json!([]));
        assert_eq!(document["error"], "File not found: news.json");
    }
}
