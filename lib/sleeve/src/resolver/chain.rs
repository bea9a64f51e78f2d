use serde::{Deserialize, Serialize};
use shared::fields::Field;
use std::{collections::BTreeMap, fmt};

/// Remote lookup ids used by the default chains.
pub const AGGREGATOR: &str = "aggregator";
pub const MUSICBRAINZ: &str = "musicbrainz";
pub const DISCOGS_SEARCH: &str = "discogs";

/// Where a candidate value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// The catalog item being processed
    Catalog,
    /// Release-level cache row
    ReleaseCache,
    /// Artist-level cache row
    ArtistCache,
    /// Cached aggregator / network links
    NetworkCache,
    /// Live lookup, by lookup id
    Remote(String),
}

impl Source {
    pub fn remote(id: &str) -> Self {
        Source::Remote(id.to_string())
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Source::Remote(_))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Catalog => f.write_str("catalog"),
            Source::ReleaseCache => f.write_str("release-cache"),
            Source::ArtistCache => f.write_str("artist-cache"),
            Source::NetworkCache => f.write_str("network-cache"),
            Source::Remote(id) => write!(f, "remote:{id}"),
        }
    }
}

/// Per-field candidate order. Static configuration, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceChains {
    chains: BTreeMap<Field, Vec<Source>>,
}

impl SourceChains {
    pub fn empty() -> Self {
        Self {
            chains: BTreeMap::new(),
        }
    }

    pub fn set(mut self, field: Field, chain: Vec<Source>) -> Self {
        self.chains.insert(field, chain);
        self
    }

    pub fn chain(&self, field: Field) -> &[Source] {
        self.chains.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cheap(&self, field: Field) -> impl Iterator<Item = &Source> {
        self.chain(field).iter().filter(|s| !s.is_remote())
    }

    /// Remote lookup ids for `field`, in priority order.
    pub fn remote(&self, field: Field) -> impl Iterator<Item = &str> {
        self.chain(field).iter().filter_map(|s| match s {
            Source::Remote(id) => Some(id.as_str()),
            _ => None,
        })
    }
}

impl Default for SourceChains {
    /// Release-level values beat artist-level ones, which beat cached
    /// aggregator links; live lookups come last.
    fn default() -> Self {
        use Source::*;

        let streaming = || {
            vec![
                ReleaseCache,
                ArtistCache,
                NetworkCache,
                Source::remote(AGGREGATOR),
            ]
        };

        Self::empty()
            .set(
                Field::Year,
                vec![
                    Catalog,
                    ReleaseCache,
                    Source::remote(DISCOGS_SEARCH),
                    Source::remote(MUSICBRAINZ),
                ],
            )
            .set(
                Field::Label,
                vec![Catalog, ReleaseCache, Source::remote(DISCOGS_SEARCH)],
            )
            .set(
                Field::Genres,
                vec![Catalog, ReleaseCache, Source::remote(DISCOGS_SEARCH)],
            )
            .set(
                Field::Cover,
                vec![Catalog, ReleaseCache, Source::remote(DISCOGS_SEARCH)],
            )
            .set(Field::Bandcamp, streaming())
            .set(Field::Spotify, streaming())
            .set(Field::AppleMusic, streaming())
            .set(Field::YoutubeMusic, streaming())
            .set(Field::Tidal, streaming())
            .set(Field::Deezer, streaming())
            .set(
                Field::Discogs,
                vec![Catalog, ReleaseCache, Source::remote(DISCOGS_SEARCH)],
            )
            .set(
                Field::MusicBrainz,
                vec![ReleaseCache, Source::remote(MUSICBRAINZ)],
            )
            .set(Field::Wikipedia, vec![ReleaseCache, ArtistCache])
            .set(Field::Website, vec![ArtistCache])
            .set(Field::Instagram, vec![ArtistCache])
            .set(Field::Facebook, vec![ArtistCache])
            .set(Field::Description, vec![ReleaseCache, ArtistCache])
            .set(Field::Tracklist, vec![ReleaseCache])
            .set(Field::Credits, vec![ReleaseCache])
            .set(Field::Notes, vec![ReleaseCache])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_field_has_a_chain() {
        let chains = SourceChains::default();
        for field in Field::ALL {
            assert!(!chains.chain(field).is_empty(), "{field} has no sources");
        }
    }

    #[test]
    fn remote_sources_always_come_last() {
        let chains = SourceChains::default();
        for field in Field::ALL {
            let chain = chains.chain(field);
            let first_remote = chain.iter().position(Source::is_remote).unwrap_or(chain.len());
            assert!(chain[first_remote..].iter().all(Source::is_remote), "{field}");
        }
    }

    #[test]
    fn artist_level_precedes_network_level() {
        let chains = SourceChains::default();
        let chain = chains.chain(Field::Spotify);
        let artist = chain.iter().position(|s| *s == Source::ArtistCache).unwrap();
        let network = chain.iter().position(|s| *s == Source::NetworkCache).unwrap();
        assert!(artist < network);
        assert_eq!(chains.remote(Field::Spotify).collect::<Vec<_>>(), vec![AGGREGATOR]);
    }
}
