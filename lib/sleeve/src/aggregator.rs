//! Cross-platform link aggregator (song.link style API).
//!
//! Given one streaming link the service answers with the same release on
//! every platform it knows. The seed is the first release-level streaming
//! link already resolved; without one the lookup has nothing to ask.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shared::fields::{Field, FieldGroup};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::error::{Result, SleeveError};
use crate::resolver::{chain::AGGREGATOR, ResolvedEntity, Source};
use crate::traits::FieldLookup;

pub const DEFAULT_AGGREGATOR_URL: &str = "https://api.song.link/v1-alpha.1";

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct LinksResponse {
    #[serde(default)]
    links_by_platform: HashMap<String, PlatformLink>,
}

#[derive(Deserialize, Debug)]
struct PlatformLink {
    url: String,
}

/// Maps the service's platform keys onto fields.
fn platform_field(platform: &str) -> Option<Field> {
    match platform {
        "bandcamp" => Some(Field::Bandcamp),
        "spotify" => Some(Field::Spotify),
        "appleMusic" => Some(Field::AppleMusic),
        "youtubeMusic" => Some(Field::YoutubeMusic),
        "tidal" => Some(Field::Tidal),
        "deezer" => Some(Field::Deezer),
        _ => None,
    }
}

fn seed_link(entity: &ResolvedEntity) -> Option<&str> {
    Field::in_group(FieldGroup::PrimaryLinks)
        .filter(|f| entity.provenance(*f) != Some(&Source::ArtistCache))
        .find_map(|f| entity.value(f))
}

pub struct AggregatorLookup {
    base_url: Url,
    client: Client,
    memo: Mutex<HashMap<String, HashMap<Field, String>>>,
}

impl AggregatorLookup {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?,
            client: Client::new(),
            memo: Mutex::new(HashMap::new()),
        })
    }

    async fn links_for(&self, seed: &str) -> Result<HashMap<Field, String>> {
        if let Some(links) = self.memo.lock().await.get(seed) {
            return Ok(links.clone());
        }

        let url = self.base_url.join("links")?;
        debug!("Request: GET {} for {}", url, seed);
        let response = self.client.get(url).query(&[("url", seed)]).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SleeveError::from_status(status.as_u16(), text));
        }
        let body: LinksResponse = response.json().await?;

        let links: HashMap<Field, String> = body
            .links_by_platform
            .into_iter()
            .filter_map(|(platform, link)| platform_field(&platform).map(|f| (f, link.url)))
            .collect();
        info!("Aggregator returned {} platform links", links.len());

        self.memo
            .lock()
            .await
            .insert(seed.to_string(), links.clone());
        Ok(links)
    }
}

#[async_trait]
impl FieldLookup for AggregatorLookup {
    fn id(&self) -> &'static str {
        AGGREGATOR
    }

    fn name(&self) -> &'static str {
        "song.link"
    }

    fn supports(&self, field: Field) -> bool {
        field.group() == FieldGroup::PrimaryLinks
    }

    async fn lookup(&self, entity: &ResolvedEntity, field: Field) -> Result<Option<String>> {
        let Some(seed) = seed_link(entity) else {
            debug!("No streaming link to seed the aggregator for {}", entity.identity);
            return Ok(None);
        };
        let seed = seed.to_string();
        Ok(self.links_for(&seed).await?.remove(&field))
    }
}
