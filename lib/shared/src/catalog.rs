use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::ReleaseIdentity;

/// One release from the remote collection, normalized at ingestion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub artist: String,
    pub title: String,
    pub year: Option<u32>,
    pub labels: Vec<String>,
    /// Genres first, then styles, deduplicated.
    pub genres: Vec<String>,
    pub date_added: Option<DateTime<Utc>>,
    pub image: Option<String>,
    /// The untouched payload this item was normalized from
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl CatalogItem {
    pub fn identity(&self) -> ReleaseIdentity {
        ReleaseIdentity::new(&self.artist, &self.title)
    }

    pub fn primary_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }
}

/// A single page of the collection as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    pub page: u32,
    pub pages: u32,
    pub total_items: Option<u64>,
    pub items: Vec<CatalogItem>,
    /// Entries the server sent that could not be normalized
    #[serde(default)]
    pub skipped: usize,
}
