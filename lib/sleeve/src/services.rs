use std::collections::HashMap;
use std::sync::Arc;

use crate::interaction::{AutoConfirm, LogNotifier};
use crate::resolver::{FieldResolver, SourceChains};
use crate::traits::{
    Confirmer, CoverFetcher, DeepEnricher, FieldLookup, Notifier, QueueSink, ReleaseCache,
};

pub struct Services {
    cache: Arc<dyn ReleaseCache>,
    lookups: HashMap<String, Arc<dyn FieldLookup>>,
    enricher: Option<Arc<dyn DeepEnricher>>,
    cover: Option<Arc<dyn CoverFetcher>>,
    queue: Option<Arc<dyn QueueSink>>,
    confirmer: Arc<dyn Confirmer>,
    notifier: Arc<dyn Notifier>,
}

impl Services {
    pub fn cache(&self) -> &Arc<dyn ReleaseCache> {
        &self.cache
    }

    pub fn lookup(&self, id: &str) -> Option<&Arc<dyn FieldLookup>> {
        self.lookups.get(id)
    }

    pub fn list_lookups(&self) -> Vec<(&str, &str)> {
        self.lookups
            .values()
            .map(|l| (l.id(), l.name()))
            .collect()
    }

    pub fn enricher(&self) -> Option<&Arc<dyn DeepEnricher>> {
        self.enricher.as_ref()
    }

    pub fn cover(&self) -> Option<&Arc<dyn CoverFetcher>> {
        self.cover.as_ref()
    }

    pub fn queue(&self) -> Option<&Arc<dyn QueueSink>> {
        self.queue.as_ref()
    }

    pub fn confirmer(&self) -> &Arc<dyn Confirmer> {
        &self.confirmer
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// A resolver over the registered cache and lookups.
    pub fn resolver(&self, chains: SourceChains) -> FieldResolver {
        FieldResolver::new(
            chains,
            self.cache.clone(),
            self.lookups.values().cloned().collect(),
        )
    }
}

#[derive(Default)]
pub struct ServicesBuilder {
    cache: Option<Arc<dyn ReleaseCache>>,
    lookups: HashMap<String, Arc<dyn FieldLookup>>,
    enricher: Option<Arc<dyn DeepEnricher>>,
    cover: Option<Arc<dyn CoverFetcher>>,
    queue: Option<Arc<dyn QueueSink>>,
    confirmer: Option<Arc<dyn Confirmer>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl ServicesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(mut self, cache: Arc<dyn ReleaseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Registers a remote lookup under its id. A later lookup with the same
    /// id replaces the earlier one.
    pub fn add_lookup(mut self, lookup: Arc<dyn FieldLookup>) -> Self {
        self.lookups.insert(lookup.id().to_string(), lookup);
        self
    }

    pub fn enricher(mut self, enricher: Arc<dyn DeepEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn cover(mut self, cover: Arc<dyn CoverFetcher>) -> Self {
        self.cover = Some(cover);
        self
    }

    pub fn queue(mut self, queue: Arc<dyn QueueSink>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn confirmer(mut self, confirmer: Arc<dyn Confirmer>) -> Self {
        self.confirmer = Some(confirmer);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Unanswered prompts default to "no" and fatal errors go to the log
    /// unless a confirmer and notifier were given.
    pub fn build(self) -> Result<Services, &'static str> {
        let cache = self.cache.ok_or("a release cache is required")?;

        Ok(Services {
            cache,
            lookups: self.lookups,
            enricher: self.enricher,
            cover: self.cover,
            queue: self.queue,
            confirmer: self.confirmer.unwrap_or_else(|| Arc::new(AutoConfirm::no())),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::chain;
    use crate::testing::{FakeCache, StaticLookup};

    #[test]
    fn cache_is_required() {
        assert!(ServicesBuilder::new().build().is_err());
    }

    #[test]
    fn lookups_are_keyed_by_id() {
        let services = ServicesBuilder::new()
            .cache(Arc::new(FakeCache::default()))
            .add_lookup(Arc::new(StaticLookup::new(chain::AGGREGATOR)))
            .add_lookup(Arc::new(StaticLookup::new(chain::MUSICBRAINZ)))
            .add_lookup(Arc::new(StaticLookup::new(chain::AGGREGATOR)))
            .build()
            .unwrap();

        let mut ids: Vec<&str> = services.list_lookups().into_iter().map(|(id, _)| id).collect();
        ids.sort();
        assert_eq!(ids, vec![chain::AGGREGATOR, chain::MUSICBRAINZ]);
        assert!(services.lookup(chain::DISCOGS_SEARCH).is_none());
        assert!(services.enricher().is_none());
    }
}
