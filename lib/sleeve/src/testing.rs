//! In-crate fakes for the collaborator traits.

use async_trait::async_trait;
use shared::{
    catalog::{CatalogItem, CatalogPage},
    details::ReleaseDetails,
    fields::Field,
    identity::ReleaseIdentity,
};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::cache::FieldValues;
use crate::error::{Result, SleeveError};
use crate::resolver::{ResolvedEntity, TypedId};
use crate::traits::{
    CatalogSource, Confirmer, CoverFetcher, DeepEnricher, FieldLookup, Notifier, QueueEntry,
    QueueSink, ReleaseCache,
};

pub fn sample_item(id: &str, artist: &str, title: &str) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        artist: artist.to_string(),
        title: title.to_string(),
        year: Some(1993),
        labels: vec!["Creation".to_string()],
        genres: vec!["Rock".to_string(), "Shoegaze".to_string()],
        date_added: None,
        image: Some("https://i.discogs.com/cover.jpg".to_string()),
        raw: serde_json::Value::Null,
    }
}

fn key(identity: &ReleaseIdentity) -> (String, String) {
    (identity.artist.to_lowercase(), identity.title.to_lowercase())
}

#[derive(Default)]
pub struct FakeCache {
    releases: HashMap<(String, String), FieldValues>,
    artists: HashMap<String, FieldValues>,
    network: HashMap<(String, String), FieldValues>,
}

impl FakeCache {
    pub fn with_release(mut self, identity: &ReleaseIdentity, values: FieldValues) -> Self {
        self.releases.insert(key(identity), values);
        self
    }

    pub fn with_artist(mut self, name: &str, values: FieldValues) -> Self {
        self.artists.insert(name.to_lowercase(), values);
        self
    }

    pub fn with_network(mut self, identity: &ReleaseIdentity, values: FieldValues) -> Self {
        self.network.insert(key(identity), values);
        self
    }
}

#[async_trait]
impl ReleaseCache for FakeCache {
    async fn release(&self, identity: &ReleaseIdentity) -> Result<Option<FieldValues>> {
        Ok(self.releases.get(&key(identity)).cloned())
    }

    async fn artist(&self, name: &str) -> Result<Option<FieldValues>> {
        Ok(self.artists.get(&name.to_lowercase()).cloned())
    }

    async fn network(&self, identity: &ReleaseIdentity) -> Result<Option<FieldValues>> {
        Ok(self.network.get(&key(identity)).cloned())
    }
}

type ErrorFactory = Box<dyn Fn() -> SleeveError + Send + Sync>;

/// Lookup answering from a fixed table and recording what it was asked.
pub struct StaticLookup {
    id: &'static str,
    answers: HashMap<Field, String>,
    failure: Option<ErrorFactory>,
    asked: Mutex<Vec<Field>>,
}

impl StaticLookup {
    pub fn new(id: &'static str) -> Self {
        Self {
            id,
            answers: HashMap::new(),
            failure: None,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(mut self, field: Field, value: &str) -> Self {
        self.answers.insert(field, value.to_string());
        self
    }

    pub fn failing(mut self, make: impl Fn() -> SleeveError + Send + Sync + 'static) -> Self {
        self.failure = Some(Box::new(make));
        self
    }

    pub fn asked(&self) -> Vec<Field> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl FieldLookup for StaticLookup {
    fn id(&self) -> &'static str {
        self.id
    }

    fn name(&self) -> &'static str {
        self.id
    }

    fn supports(&self, _field: Field) -> bool {
        true
    }

    async fn lookup(&self, _entity: &ResolvedEntity, field: Field) -> Result<Option<String>> {
        self.asked.lock().unwrap().push(field);
        if let Some(make) = &self.failure {
            return Err(make());
        }
        Ok(self.answers.get(&field).cloned())
    }
}

/// Serves a fixed collection in pages and counts requests.
pub struct FakeCatalog {
    items: Vec<CatalogItem>,
    username: String,
    failure_status: Option<u16>,
    malformed_pages: Vec<u32>,
    requested: Mutex<Vec<u32>>,
    identity_calls: Mutex<usize>,
}

impl FakeCatalog {
    pub fn with_items(count: usize) -> Self {
        let items = (1..=count)
            .map(|i| sample_item(&i.to_string(), &format!("Artist {i}"), &format!("Album {i}")))
            .collect();
        Self::new(items)
    }

    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self {
            items,
            username: "collector".to_string(),
            failure_status: None,
            malformed_pages: Vec::new(),
            requested: Mutex::new(Vec::new()),
            identity_calls: Mutex::new(0),
        }
    }

    pub fn owned_by(mut self, username: &str) -> Self {
        self.username = username.to_string();
        self
    }

    pub fn failing_with(mut self, status: u16) -> Self {
        self.failure_status = Some(status);
        self
    }

    /// Every entry on `page` fails to normalize.
    pub fn malformed_on(mut self, page: u32) -> Self {
        self.malformed_pages.push(page);
        self
    }

    pub fn requested(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }

    pub fn identity_calls(&self) -> usize {
        *self.identity_calls.lock().unwrap()
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<CatalogPage> {
        self.requested.lock().unwrap().push(page);
        if let Some(status) = self.failure_status {
            return Err(SleeveError::from_status(status, "rejected"));
        }
        let pages = (self.items.len() as u32).div_ceil(per_page).max(1);
        let start = ((page - 1) * per_page) as usize;
        let items: Vec<CatalogItem> = self
            .items
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect();
        let (items, skipped) = if self.malformed_pages.contains(&page) {
            (Vec::new(), items.len())
        } else {
            (items, 0)
        };
        Ok(CatalogPage {
            page,
            pages,
            total_items: Some(self.items.len() as u64),
            items,
            skipped,
        })
    }

    async fn identity(&self) -> Result<String> {
        *self.identity_calls.lock().unwrap() += 1;
        Ok(self.username.clone())
    }
}

#[derive(Default)]
pub struct FakeEnricher {
    pub details: ReleaseDetails,
    pub fail: bool,
    calls: Mutex<Vec<TypedId>>,
}

impl FakeEnricher {
    pub fn returning(details: ReleaseDetails) -> Self {
        Self {
            details,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<TypedId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeepEnricher for FakeEnricher {
    fn name(&self) -> &'static str {
        "fake-enricher"
    }

    async fn enrich(&self, id: &TypedId) -> Result<ReleaseDetails> {
        self.calls.lock().unwrap().push(*id);
        if self.fail {
            return Err(SleeveError::Transient("enricher offline".into()));
        }
        Ok(self.details.clone())
    }
}

#[derive(Default)]
pub struct FakeCoverFetcher {
    pub fail: bool,
}

#[async_trait]
impl CoverFetcher for FakeCoverFetcher {
    async fn fetch(&self, _url: &str, dir: &Path) -> Result<PathBuf> {
        if self.fail {
            return Err(SleeveError::Transient("cover host unreachable".into()));
        }
        let path = dir.join("cover.jpg");
        std::fs::create_dir_all(dir)?;
        std::fs::write(&path, b"jpeg")?;
        Ok(path)
    }
}

#[derive(Default)]
pub struct RecordingQueue {
    pub fail: bool,
    entries: Mutex<Vec<QueueEntry>>,
}

impl RecordingQueue {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn entries(&self) -> Vec<QueueEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueueSink for RecordingQueue {
    async fn enqueue(&self, entry: &QueueEntry) -> Result<()> {
        if self.fail {
            return Err(SleeveError::Transient("queue unavailable".into()));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// Answers prompts from a script, then falls back to the prompt default.
#[derive(Default)]
pub struct ScriptedConfirmer {
    answers: Mutex<Vec<bool>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirmer {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().rev().copied().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Confirmer for ScriptedConfirmer {
    async fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.answers.lock().unwrap().pop().unwrap_or(default))
    }
}

/// Never answers.
pub struct SilentConfirmer;

#[async_trait]
impl Confirmer for SilentConfirmer {
    async fn confirm(&self, _prompt: &str, _default: bool) -> Result<bool> {
        std::future::pending().await
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("{title}: {message}"));
    }
}
