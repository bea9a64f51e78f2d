use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{
    catalog::CatalogPage, details::ReleaseDetails, fields::Field, identity::ReleaseIdentity,
};
use std::path::{Path, PathBuf};

use crate::cache::FieldValues;
use crate::error::Result;
use crate::resolver::{identifiers::TypedId, ResolvedEntity};

/// A paginated remote collection.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetches one page. Non-success statuses come back as `Err`.
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<CatalogPage>;

    /// Lightweight "who am I" call used to diagnose an empty collection.
    async fn identity(&self) -> Result<String>;
}

/// Read-only local store of previously gathered values.
#[async_trait]
pub trait ReleaseCache: Send + Sync {
    async fn release(&self, identity: &ReleaseIdentity) -> Result<Option<FieldValues>>;
    async fn artist(&self, name: &str) -> Result<Option<FieldValues>>;
    async fn network(&self, identity: &ReleaseIdentity) -> Result<Option<FieldValues>>;
}

/// A remote per-field lookup, consulted only in the completion pass.
#[async_trait]
pub trait FieldLookup: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn supports(&self, field: Field) -> bool;

    /// `Ok(None)` means the service had nothing for this field.
    async fn lookup(&self, entity: &ResolvedEntity, field: Field) -> Result<Option<String>>;
}

/// Tracklist / credits lookup keyed on an identifier extracted from a link.
#[async_trait]
pub trait DeepEnricher: Send + Sync {
    fn name(&self) -> &'static str;
    async fn enrich(&self, id: &TypedId) -> Result<ReleaseDetails>;
}

#[async_trait]
pub trait CoverFetcher: Send + Sync {
    /// Downloads `url` into `dir`, returning the written file.
    async fn fetch(&self, url: &str, dir: &Path) -> Result<PathBuf>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub path: PathBuf,
    pub artist: String,
    pub title: String,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

/// Downstream consumer of published documents (site build, sync, ...).
#[async_trait]
pub trait QueueSink: Send + Sync {
    async fn enqueue(&self, entry: &QueueEntry) -> Result<()>;
}

/// Interactive yes/no prompt.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;
}

/// Blocking, user-visible report of a fatal error.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}
