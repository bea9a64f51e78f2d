//! Field-by-field source selection.
//!
//! Pass 1 walks every field's chain over the cheap, local sources (the
//! catalog item and the three cache levels). Pass 2, the completion pass, only
//! looks at fields pass 1 left unavailable and asks the remote lookups named
//! in their chains. A field resolved in pass 1 is never touched again.

pub mod chain;
pub mod identifiers;
pub mod validate;

use shared::{catalog::CatalogItem, fields::Field, identity::ReleaseIdentity};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, info, warn};

use crate::cache::FieldValues;
use crate::error::{ErrorKind, Result, SleeveError};
use crate::traits::{FieldLookup, ReleaseCache};

pub use chain::{Source, SourceChains};
pub use identifiers::{IdKind, TypedId};

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved { value: String, provenance: Source },
    /// No candidate passed the field predicate. A normal, renderable state.
    Unavailable,
}

/// Everything known about one release for the duration of a single run.
#[derive(Debug, Clone)]
pub struct ResolvedEntity {
    pub identity: ReleaseIdentity,
    pub catalog: Option<CatalogItem>,
    pub cache_hit: bool,
    pub typed_id: Option<TypedId>,
    fields: BTreeMap<Field, Resolution>,
}

impl ResolvedEntity {
    pub fn new(identity: ReleaseIdentity, catalog: Option<CatalogItem>) -> Self {
        Self {
            identity,
            catalog,
            cache_hit: false,
            typed_id: None,
            fields: Field::ALL
                .into_iter()
                .map(|f| (f, Resolution::Unavailable))
                .collect(),
        }
    }

    pub fn resolution(&self, field: Field) -> &Resolution {
        self.fields.get(&field).unwrap_or(&Resolution::Unavailable)
    }

    pub fn value(&self, field: Field) -> Option<&str> {
        match self.resolution(field) {
            Resolution::Resolved { value, .. } => Some(value),
            Resolution::Unavailable => None,
        }
    }

    pub fn provenance(&self, field: Field) -> Option<&Source> {
        match self.resolution(field) {
            Resolution::Resolved { provenance, .. } => Some(provenance),
            Resolution::Unavailable => None,
        }
    }

    pub fn is_available(&self, field: Field) -> bool {
        self.value(field).is_some()
    }

    pub fn unavailable(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| !self.is_available(*f))
            .collect()
    }

    pub fn available_count(&self) -> usize {
        Field::ALL.len() - self.unavailable().len()
    }

    /// Records a value unless the field already has one. Returns whether it was set.
    pub fn resolve(&mut self, field: Field, value: String, provenance: Source) -> bool {
        if self.is_available(field) {
            return false;
        }
        self.fields
            .insert(field, Resolution::Resolved { value, provenance });
        true
    }

    pub fn links(&self) -> impl Iterator<Item = &str> {
        Field::ALL
            .into_iter()
            .filter(Field::is_link)
            .filter_map(|f| self.value(f))
    }

    /// Re-derives the deep-enrichment identifier from the resolved links.
    pub fn refresh_identifier(&mut self) {
        // The Discogs field is checked first so that equally specific ids from
        // other links never shadow it.
        let discogs = self.value(Field::Discogs).into_iter();
        self.typed_id = identifiers::best(discogs.chain(self.links()));
    }
}

/// Values offered by each cheap source for one entity.
#[derive(Debug, Clone, Default)]
pub struct LocalSources {
    pub catalog: Option<FieldValues>,
    pub release: Option<FieldValues>,
    pub artist: Option<FieldValues>,
    pub network: Option<FieldValues>,
}

impl LocalSources {
    pub fn values(&self, source: &Source) -> Option<&FieldValues> {
        match source {
            Source::Catalog => self.catalog.as_ref(),
            Source::ReleaseCache => self.release.as_ref(),
            Source::ArtistCache => self.artist.as_ref(),
            Source::NetworkCache => self.network.as_ref(),
            Source::Remote(_) => None,
        }
    }
}

/// What the catalog item itself can answer.
pub fn catalog_values(item: &CatalogItem) -> FieldValues {
    let mut values = FieldValues::new();
    if let Some(year) = item.year.filter(|y| *y > 0) {
        values.insert(Field::Year, year.to_string());
    }
    if let Some(label) = item.primary_label() {
        values.insert(Field::Label, label);
    }
    if !item.genres.is_empty() {
        values.insert(Field::Genres, item.genres.join(", "));
    }
    if let Some(image) = &item.image {
        values.insert(Field::Cover, image.clone());
    }
    if item.id.chars().all(|c| c.is_ascii_digit()) && !item.id.is_empty() {
        values.insert(
            Field::Discogs,
            format!("https://www.discogs.com/release/{}", item.id),
        );
    }
    values
}

/// A non-fatal failure of one source, surfaced as a run warning.
#[derive(Debug)]
pub struct SourceFailure {
    pub source: String,
    pub field: Option<Field>,
    pub error: SleeveError,
}

#[derive(Debug)]
pub struct ResolveReport {
    pub entity: ResolvedEntity,
    pub failures: Vec<SourceFailure>,
    /// Number of remote lookup calls issued by the completion pass
    pub remote_calls: usize,
}

pub struct FieldResolver {
    chains: SourceChains,
    cache: Arc<dyn ReleaseCache>,
    lookups: Vec<Arc<dyn FieldLookup>>,
}

impl FieldResolver {
    pub fn new(
        chains: SourceChains,
        cache: Arc<dyn ReleaseCache>,
        lookups: Vec<Arc<dyn FieldLookup>>,
    ) -> Self {
        Self {
            chains,
            cache,
            lookups,
        }
    }

    pub fn chains(&self) -> &SourceChains {
        &self.chains
    }

    fn lookup(&self, id: &str) -> Option<&Arc<dyn FieldLookup>> {
        self.lookups.iter().find(|l| l.id() == id)
    }

    /// Reads the cache levels. Only fatal cache errors propagate.
    pub async fn gather(
        &self,
        identity: &ReleaseIdentity,
        catalog: Option<&CatalogItem>,
        failures: &mut Vec<SourceFailure>,
    ) -> Result<LocalSources> {
        let release = tolerate(self.cache.release(identity).await, "release-cache", failures)?;
        let artist = tolerate(self.cache.artist(&identity.artist).await, "artist-cache", failures)?;
        let network = tolerate(self.cache.network(identity).await, "network-cache", failures)?;

        Ok(LocalSources {
            catalog: catalog.map(catalog_values),
            release,
            artist,
            network,
        })
    }

    /// Pass 1: first valid candidate from the cheap sources, per field.
    pub fn first_pass(&self, entity: &mut ResolvedEntity, local: &LocalSources) {
        for field in Field::ALL {
            if entity.is_available(field) {
                continue;
            }
            for source in self.chains.cheap(field) {
                let Some(raw) = local.values(source).and_then(|v| v.get(field)) else {
                    continue;
                };
                match validate::check(field, raw) {
                    Ok(value) => {
                        entity.resolve(field, value, source.clone());
                        break;
                    }
                    Err(e) => debug!("Rejected {} candidate from {}: {}", field, source, e),
                }
            }
        }
    }

    /// Pass 2: remote lookups for the fields still unavailable.
    ///
    /// Returns the number of lookup calls made. An authentication failure
    /// aborts; every other lookup error is recorded and the next lookup tried.
    pub async fn complete(
        &self,
        entity: &mut ResolvedEntity,
        failures: &mut Vec<SourceFailure>,
    ) -> Result<usize> {
        let mut calls = 0;

        for field in entity.unavailable() {
            for id in self.chains.remote(field) {
                let Some(lookup) = self.lookup(id) else {
                    debug!("No lookup registered for {}, skipping", id);
                    continue;
                };
                if !lookup.supports(field) {
                    continue;
                }

                calls += 1;
                let outcome = lookup.lookup(entity, field).await;
                match outcome {
                    Ok(Some(raw)) => match validate::check(field, &raw) {
                        Ok(value) => {
                            debug!("{} resolved {} remotely", lookup.name(), field);
                            entity.resolve(field, value, Source::remote(id));
                            break;
                        }
                        Err(e) => debug!("Rejected {} from {}: {}", field, lookup.name(), e),
                    },
                    Ok(None) => {}
                    Err(e) if e.kind() == ErrorKind::Auth => return Err(e),
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        debug!("{} has no {}: {}", lookup.name(), field, e)
                    }
                    Err(e) => {
                        warn!("{} failed for {}: {}", lookup.name(), field, e);
                        failures.push(SourceFailure {
                            source: lookup.name().to_string(),
                            field: Some(field),
                            error: e,
                        });
                    }
                }
            }
        }

        Ok(calls)
    }

    /// Cache-first resolution of one release.
    ///
    /// A release-level cache hit resolves from local sources only and skips
    /// the completion pass; a miss sends every unavailable field through it.
    pub async fn resolve(
        &self,
        identity: &ReleaseIdentity,
        catalog: Option<&CatalogItem>,
    ) -> Result<ResolveReport> {
        let mut failures = Vec::new();
        let local = self.gather(identity, catalog, &mut failures).await?;

        let mut entity = ResolvedEntity::new(identity.clone(), catalog.cloned());
        entity.cache_hit = local.release.is_some();
        self.first_pass(&mut entity, &local);

        let remote_calls = if entity.cache_hit {
            info!(
                "Cache hit for {}: {} fields resolved locally, skipping remote lookups",
                identity,
                entity.available_count()
            );
            0
        } else {
            info!(
                "Cache miss for {}: completing {} fields remotely",
                identity,
                entity.unavailable().len()
            );
            self.complete(&mut entity, &mut failures).await?
        };

        entity.refresh_identifier();
        Ok(ResolveReport {
            entity,
            failures,
            remote_calls,
        })
    }
}

fn tolerate(
    result: Result<Option<FieldValues>>,
    source: &str,
    failures: &mut Vec<SourceFailure>,
) -> Result<Option<FieldValues>> {
    match result {
        Ok(values) => Ok(values),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!("{} unavailable: {}", source, e);
            failures.push(SourceFailure {
                source: source.to_string(),
                field: None,
                error: e,
            });
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_item, FakeCache, StaticLookup};
    use proptest::prelude::*;

    fn resolver(cache: FakeCache, lookups: Vec<Arc<dyn FieldLookup>>) -> FieldResolver {
        FieldResolver::new(SourceChains::default(), Arc::new(cache), lookups)
    }

    #[tokio::test]
    async fn release_level_link_beats_artist_level_link() {
        let identity = ReleaseIdentity::new("Foo", "Bar");
        let cache = FakeCache::default()
            .with_release(
                &identity,
                FieldValues::new().with(Field::Bandcamp, "https://x.bandcamp.com/release/5"),
            )
            .with_artist(
                "Foo",
                FieldValues::new().with(Field::Bandcamp, "https://x.bandcamp.com/artist/9"),
            );

        let report = resolver(cache, vec![]).resolve(&identity, None).await.unwrap();
        assert_eq!(
            report.entity.value(Field::Bandcamp),
            Some("https://x.bandcamp.com/release/5")
        );
        assert_eq!(
            report.entity.provenance(Field::Bandcamp),
            Some(&Source::ReleaseCache)
        );
    }

    #[tokio::test]
    async fn invalid_candidate_falls_through_to_the_next_source() {
        let identity = ReleaseIdentity::new("Foo", "Bar");
        let cache = FakeCache::default()
            .with_release(&identity, FieldValues::new().with(Field::Spotify, "not a link"))
            .with_artist(
                "Foo",
                FieldValues::new().with(Field::Spotify, "https://open.spotify.com/artist/9"),
            );

        let report = resolver(cache, vec![]).resolve(&identity, None).await.unwrap();
        assert_eq!(
            report.entity.provenance(Field::Spotify),
            Some(&Source::ArtistCache)
        );
    }

    #[tokio::test]
    async fn unresolvable_field_is_unavailable_not_an_error() {
        let identity = ReleaseIdentity::new("Foo", "Bar");
        let cache = FakeCache::default().with_release(&identity, FieldValues::new());
        let report = resolver(cache, vec![]).resolve(&identity, None).await.unwrap();
        assert_eq!(report.entity.resolution(Field::Tidal), &Resolution::Unavailable);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn cache_miss_sends_every_field_through_the_remote_chain() {
        let identity = ReleaseIdentity::new("Foo", "Bar");
        let aggregator = Arc::new(StaticLookup::new(chain::AGGREGATOR));
        let musicbrainz = Arc::new(StaticLookup::new(chain::MUSICBRAINZ));
        let discogs = Arc::new(StaticLookup::new(chain::DISCOGS_SEARCH));
        let lookups: Vec<Arc<dyn FieldLookup>> =
            vec![aggregator.clone(), musicbrainz.clone(), discogs.clone()];

        let chains = SourceChains::default();
        let report = resolver(FakeCache::default(), lookups)
            .resolve(&identity, None)
            .await
            .unwrap();

        assert!(!report.entity.cache_hit);
        let mut asked: Vec<Field> = aggregator.asked();
        asked.extend(musicbrainz.asked());
        asked.extend(discogs.asked());
        for field in Field::ALL {
            if chains.remote(field).next().is_some() {
                assert!(asked.contains(&field), "{field} never reached a remote lookup");
            }
        }
        assert_eq!(report.remote_calls, asked.len());
    }

    #[tokio::test]
    async fn cache_hit_skips_all_remote_lookups() {
        let identity = ReleaseIdentity::new("Foo", "Bar");
        let cache = FakeCache::default().with_release(
            &identity,
            FieldValues::new().with(Field::Spotify, "https://open.spotify.com/album/1"),
        );
        let aggregator = Arc::new(
            StaticLookup::new(chain::AGGREGATOR)
                .answering(Field::Deezer, "https://www.deezer.com/album/1"),
        );

        let report = resolver(cache, vec![aggregator.clone()])
            .resolve(&identity, None)
            .await
            .unwrap();

        assert!(report.entity.cache_hit);
        assert_eq!(report.remote_calls, 0);
        assert!(aggregator.asked().is_empty());
        assert!(!report.entity.is_available(Field::Deezer));
    }

    #[tokio::test]
    async fn completion_never_overwrites_first_pass_values() {
        let item = sample_item("42", "Foo", "Bar");
        let identity = item.identity();
        let cache = FakeCache::default().with_artist(
            "Foo",
            FieldValues::new().with(Field::Spotify, "https://open.spotify.com/artist/local"),
        );
        let mut remote = StaticLookup::new(chain::AGGREGATOR);
        for field in Field::ALL {
            remote = remote.answering(field, "https://remote.example.com/value/1");
        }
        let remote = Arc::new(remote);

        let resolver = resolver(cache, vec![remote.clone()]);
        let mut failures = Vec::new();
        let local = resolver
            .gather(&identity, Some(&item), &mut failures)
            .await
            .unwrap();
        let mut entity = ResolvedEntity::new(identity.clone(), Some(item.clone()));
        resolver.first_pass(&mut entity, &local);
        let before: Vec<(Field, Resolution)> = Field::ALL
            .into_iter()
            .filter(|f| entity.is_available(*f))
            .map(|f| (f, entity.resolution(f).clone()))
            .collect();
        assert!(!before.is_empty());

        resolver.complete(&mut entity, &mut failures).await.unwrap();

        for (field, resolution) in before {
            assert_eq!(entity.resolution(field), &resolution, "{field} changed");
            assert!(!remote.asked().contains(&field));
        }
        assert_eq!(
            entity.provenance(Field::Deezer),
            Some(&Source::remote(chain::AGGREGATOR))
        );
    }

    #[tokio::test]
    async fn remote_errors_are_warnings_and_the_next_lookup_is_tried() {
        let identity = ReleaseIdentity::new("Foo", "Bar");
        let discogs = Arc::new(
            StaticLookup::new(chain::DISCOGS_SEARCH)
                .failing(|| SleeveError::Transient("connection reset".into())),
        );
        let musicbrainz =
            Arc::new(StaticLookup::new(chain::MUSICBRAINZ).answering(Field::Year, "1993"));

        let report = resolver(FakeCache::default(), vec![discogs, musicbrainz])
            .resolve(&identity, None)
            .await
            .unwrap();

        assert_eq!(report.entity.value(Field::Year), Some("1993"));
        assert!(report
            .failures
            .iter()
            .any(|f| f.field == Some(Field::Year) && f.source == chain::DISCOGS_SEARCH));
    }

    #[tokio::test]
    async fn auth_failure_in_a_lookup_aborts() {
        let identity = ReleaseIdentity::new("Foo", "Bar");
        let discogs = Arc::new(
            StaticLookup::new(chain::DISCOGS_SEARCH).failing(|| SleeveError::from_status(401, "bad")),
        );
        let err = resolver(FakeCache::default(), vec![discogs])
            .resolve(&identity, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[tokio::test]
    async fn identifier_prefers_release_over_master() {
        let identity = ReleaseIdentity::new("Foo", "Bar");
        let cache = FakeCache::default().with_release(
            &identity,
            FieldValues::new()
                .with(Field::Discogs, "https://www.discogs.com/master/77")
                .with(Field::Wikipedia, "https://en.wikipedia.org/wiki/Bar"),
        );
        let report = resolver(cache, vec![]).resolve(&identity, None).await.unwrap();
        assert_eq!(report.entity.typed_id, Some(TypedId::master(77)));

        let item = sample_item("1234", "Foo", "Bar");
        let cache = FakeCache::default().with_release(
            &identity,
            FieldValues::new().with(Field::Discogs, "https://www.discogs.com/master/77"),
        );
        let report = resolver(cache, vec![])
            .resolve(&identity, Some(&item))
            .await
            .unwrap();
        // The catalog source outranks the cache for the Discogs link.
        assert_eq!(report.entity.typed_id, Some(TypedId::release(1234)));
    }

    #[test]
    fn catalog_values_cover_header_fields() {
        let item = sample_item("99", "Foo", "Bar");
        let values = catalog_values(&item);
        assert_eq!(values.get(Field::Year), Some("1993"));
        assert_eq!(values.get(Field::Label), Some("Creation"));
        assert_eq!(values.get(Field::Genres), Some("Rock, Shoegaze"));
        assert_eq!(
            values.get(Field::Discogs),
            Some("https://www.discogs.com/release/99")
        );
    }

    fn link_for(tag: u8) -> String {
        format!("https://source{tag}.example.com/album/{tag}")
    }

    proptest! {
        // For candidates [A, B, C], a valid A always wins regardless of B and C.
        #[test]
        fn first_valid_candidate_wins(
            b_present in any::<bool>(),
            c_present in any::<bool>(),
            b_valid in any::<bool>(),
            c_valid in any::<bool>(),
            a_valid in any::<bool>(),
        ) {
            let chains = SourceChains::empty().set(
                Field::Spotify,
                vec![Source::ReleaseCache, Source::ArtistCache, Source::NetworkCache],
            );
            let resolver = FieldResolver::new(chains, Arc::new(FakeCache::default()), vec![]);

            let candidate = |tag: u8, valid: bool| {
                if valid { link_for(tag) } else { format!("garbage {tag}") }
            };
            let local = LocalSources {
                catalog: None,
                release: Some(FieldValues::new().with(Field::Spotify, candidate(1, a_valid))),
                artist: b_present.then(|| FieldValues::new().with(Field::Spotify, candidate(2, b_valid))),
                network: c_present.then(|| FieldValues::new().with(Field::Spotify, candidate(3, c_valid))),
            };

            let mut entity = ResolvedEntity::new(ReleaseIdentity::new("A", "B"), None);
            resolver.first_pass(&mut entity, &local);

            let expected = if a_valid {
                Some(link_for(1))
            } else if b_present && b_valid {
                Some(link_for(2))
            } else if c_present && c_valid {
                Some(link_for(3))
            } else {
                None
            };
            prop_assert_eq!(entity.value(Field::Spotify).map(str::to_string), expected);
        }
    }
}
