use async_trait::async_trait;
use musicbrainz_rs::{
    entity::{
        artist_credit::ArtistCredit,
        release::ReleaseStatus,
        release_group::{ReleaseGroup, ReleaseGroupPrimaryType, ReleaseGroupSearchQuery},
    },
    MusicBrainzClient, Search,
};
use shared::{fields::Field, identity::ReleaseIdentity};
use std::{collections::HashMap, fmt::Debug, future::Future, time::Duration};
use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, info, warn};

use crate::error::{Result, SleeveError};
use crate::resolver::{chain::MUSICBRAINZ, ResolvedEntity};
use crate::traits::FieldLookup;

/// Timeout for individual MusicBrainz requests (15 seconds)
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Maximum retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds)
const BASE_DELAY_MS: u64 = 500;

/// Maximum backoff delay cap (milliseconds)
const MAX_BACKOFF_MS: u64 = 5000;

const SEARCH_LIMIT: u8 = 5;

/// Formats the artist credits into a single, comma-separated string.
fn format_artist_credit(credits: &Option<Vec<ArtistCredit>>) -> String {
    credits
        .as_ref()
        .map(|credits| {
            credits
                .iter()
                .map(|credit| credit.name.clone())
                .collect::<Vec<String>>()
                .join(", ")
        })
        .unwrap_or_else(|| "Unknown Artist".to_string())
}

/// Check if an error is retryable (transient network/server issues)
fn is_retryable_error(error: &musicbrainz_rs::Error) -> bool {
    let error_lower = format!("{:?}", error).to_lowercase();

    // Retry on timeout, connection, 5xx and rate limiting
    if error_lower.contains("timeout")
        || error_lower.contains("connection")
        || error_lower.contains("timed out")
        || error_lower.contains("503")
        || error_lower.contains("502")
        || error_lower.contains("500")
        || error_lower.contains("429")
        || error_lower.contains("service unavailable")
    {
        return true;
    }

    // Don't retry client errors (4xx except 429)
    if error_lower.contains("400")
        || error_lower.contains("401")
        || error_lower.contains("403")
        || error_lower.contains("404")
        || error_lower.contains("bad request")
        || error_lower.contains("not found")
        || error_lower.contains("unauthorized")
    {
        return false;
    }

    // Unknown errors are usually network issues
    true
}

fn into_sleeve_error(error: musicbrainz_rs::Error) -> SleeveError {
    let message = format!("{:?}", error);
    let lower = message.to_lowercase();
    if lower.contains("404") || lower.contains("not found") {
        SleeveError::NotFound(format!("MusicBrainz: {message}"))
    } else {
        SleeveError::Transient(format!("MusicBrainz: {message}"))
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(std::cmp::min(
        BASE_DELAY_MS * 2u64.pow(attempt),
        MAX_BACKOFF_MS,
    ))
}

/// Retries an async operation with exponential backoff and request timeout.
///
/// Only errors accepted by `retryable` are retried. Every error is converted
/// with `convert`; running out of attempts on timeouts alone is `Transient`.
pub(crate) async fn with_retry<T, E, F, Fut>(
    operation_name: &str,
    retryable: fn(&E) -> bool,
    convert: fn(E) -> SleeveError,
    mut operation: F,
) -> Result<T>
where
    E: Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let mut last_error = None;

    for attempt in 0..MAX_RETRIES {
        let result =
            tokio::time::timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), operation()).await;

        match result {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                if !retryable(&e) {
                    warn!(
                        "{} failed with non-retryable error: {:?}",
                        operation_name, e
                    );
                    return Err(convert(e));
                }
                warn!(
                    "{} failed (attempt {}/{}): {:?}",
                    operation_name,
                    attempt + 1,
                    MAX_RETRIES,
                    e
                );
                last_error = Some(e);
            }
            Err(_timeout) => {
                warn!(
                    "{} timed out after {}s (attempt {}/{})",
                    operation_name,
                    REQUEST_TIMEOUT_SECS,
                    attempt + 1,
                    MAX_RETRIES
                );
            }
        }

        if attempt < MAX_RETRIES - 1 {
            let delay = backoff(attempt);
            debug!("Retrying {} in {}ms", operation_name, delay.as_millis());
            sleep(delay).await;
        }
    }

    match last_error {
        Some(e) => Err(convert(e)),
        None => Err(SleeveError::Transient(format!(
            "{operation_name} timed out {MAX_RETRIES} times"
        ))),
    }
}

/// The canonical release picked for an identity.
#[derive(Debug, Clone, PartialEq)]
struct Canonical {
    release_id: String,
    date: Option<String>,
}

/// Remote lookup for the MusicBrainz link and release year.
pub struct MusicBrainzLookup {
    client: MusicBrainzClient,
    memo: Mutex<HashMap<ReleaseIdentity, Option<Canonical>>>,
}

impl MusicBrainzLookup {
    pub fn new() -> Result<Self> {
        let version = env!("CARGO_PKG_VERSION");
        let client = MusicBrainzClient::new(&format!("Sleeve/{version}"))
            .map_err(|e| SleeveError::NotConfigured(format!("MusicBrainz client: {e:?}")))?;
        Ok(Self {
            client,
            memo: Mutex::new(HashMap::new()),
        })
    }

    /// Earliest official album/EP release of the best matching release group.
    async fn canonical(&self, identity: &ReleaseIdentity) -> Result<Option<Canonical>> {
        if let Some(found) = self.memo.lock().await.get(identity) {
            return Ok(found.clone());
        }

        info!("Searching MusicBrainz for {}", identity);
        let client = &self.client;
        let search_results = with_retry(
            "MusicBrainz album search",
            is_retryable_error,
            into_sleeve_error,
            || {
                let mut album_query = ReleaseGroupSearchQuery::query_builder();
                album_query.artist(&identity.artist).and();
                let search_query = album_query.release_group(&identity.title).build();
                async move {
                    ReleaseGroup::search(search_query)
                        .limit(SEARCH_LIMIT)
                        .with_releases()
                        .execute_with_client(client)
                        .await
                }
            },
        )
        .await?;

        let found = search_results
            .entities
            .into_iter()
            .filter(|group| {
                group.primary_type == Some(ReleaseGroupPrimaryType::Album)
                    || group.primary_type == Some(ReleaseGroupPrimaryType::Ep)
            })
            .find_map(|group| {
                debug!(
                    "Candidate release group '{}' by {}",
                    group.title,
                    format_artist_credit(&group.artist_credit)
                );
                group
                    .releases
                    .as_ref()
                    .and_then(|releases| {
                        releases
                            .iter()
                            .filter(|r| r.status == Some(ReleaseStatus::Official))
                            .min_by_key(|release| release.date.as_ref().map(|d| d.0.clone()))
                    })
                    .map(|release| Canonical {
                        release_id: release.id.clone(),
                        date: release.date.as_ref().map(|d| d.0.clone()),
                    })
            });

        self.memo
            .lock()
            .await
            .insert(identity.clone(), found.clone());
        Ok(found)
    }
}

#[async_trait]
impl FieldLookup for MusicBrainzLookup {
    fn id(&self) -> &'static str {
        MUSICBRAINZ
    }

    fn name(&self) -> &'static str {
        "MusicBrainz"
    }

    fn supports(&self, field: Field) -> bool {
        matches!(field, Field::MusicBrainz | Field::Year)
    }

    async fn lookup(&self, entity: &ResolvedEntity, field: Field) -> Result<Option<String>> {
        let Some(canonical) = self.canonical(&entity.identity).await? else {
            return Ok(None);
        };
        Ok(match field {
            Field::MusicBrainz => Some(format!(
                "https://musicbrainz.org/release/{}",
                canonical.release_id
            )),
            Field::Year => canonical.date,
            _ => None,
        })
    }
}
