use super::models::{
    ArtistRef, CollectionRelease, CollectionResponse, ReleaseDetail, SearchHit,
};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use regex::Regex;
use shared::{
    catalog::{CatalogItem, CatalogPage},
    details::{Credit, ReleaseDetails, TrackEntry},
};
use std::sync::LazyLock;
use tracing::warn;

static RE_DISAMBIGUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d+\)$").unwrap());

/// Drops the numeric suffix Discogs appends to homonymous artists.
///
/// `"Placebo (2)"` becomes `"Placebo"`; other parentheses are kept.
pub fn strip_disambiguation(name: &str) -> String {
    RE_DISAMBIGUATION.replace(name.trim(), "").to_string()
}

/// Joins a credit list using the separators Discogs ships with it.
pub(crate) fn join_artists(artists: &[ArtistRef]) -> String {
    let mut out = String::new();
    for (i, artist) in artists.iter().enumerate() {
        out.push_str(&strip_disambiguation(&artist.name));
        if i + 1 == artists.len() {
            break;
        }
        match artist.join.trim() {
            "" | "," => out.push_str(", "),
            join => {
                out.push(' ');
                out.push_str(join);
                out.push(' ');
            }
        }
    }
    out
}

fn distinct(values: impl IntoIterator<Item = String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unique()
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Normalizes one collection entry, keeping the raw payload alongside.
pub(crate) fn normalize_release(raw: serde_json::Value) -> serde_json::Result<CatalogItem> {
    let release: CollectionRelease = serde_json::from_value(raw.clone())?;
    let info = release.basic_information;

    let date_added = release
        .date_added
        .as_deref()
        .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.with_timezone(&Utc));

    Ok(CatalogItem {
        id: release.id.to_string(),
        artist: join_artists(&info.artists),
        title: info.title.trim().to_string(),
        year: info.year.filter(|y| *y > 0),
        labels: distinct(info.labels.into_iter().map(|l| l.name)),
        genres: distinct(info.genres.into_iter().chain(info.styles)),
        date_added,
        image: non_empty(info.cover_image).or_else(|| non_empty(info.thumb)),
        raw,
    })
}

/// Builds a page, skipping entries that do not normalize.
pub(crate) fn page_from(response: CollectionResponse) -> CatalogPage {
    let sent = response.releases.len();
    let items: Vec<CatalogItem> = response
        .releases
        .into_iter()
        .filter_map(|raw| match normalize_release(raw) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping malformed collection entry: {}", e);
                None
            }
        })
        .collect();

    CatalogPage {
        page: response.pagination.page,
        pages: response.pagination.pages,
        total_items: response.pagination.items,
        skipped: sent - items.len(),
        items,
    }
}

pub(crate) fn details_from(detail: ReleaseDetail) -> ReleaseDetails {
    let tracklist = detail
        .tracklist
        .into_iter()
        .filter(|t| t.kind.as_deref().is_none_or(|k| k == "track"))
        .map(|t| TrackEntry {
            position: t.position.trim().to_string(),
            title: t.title.trim().to_string(),
            duration: non_empty(Some(t.duration)),
        })
        .collect();

    let credits = detail
        .extraartists
        .into_iter()
        .map(|a| Credit {
            name: strip_disambiguation(&a.name),
            role: a.role.trim().to_string(),
        })
        .unique_by(|c| (c.name.clone(), c.role.clone()))
        .collect();

    // Primary image first, the rest in server order.
    let images = detail
        .images
        .into_iter()
        .sorted_by_key(|i| i.kind.as_deref() != Some("primary"))
        .map(|i| i.uri)
        .filter(|uri| !uri.is_empty())
        .collect();

    ReleaseDetails {
        tracklist,
        credits,
        notes: non_empty(detail.notes).map(|n| n.trim().to_string()),
        images,
    }
}

pub(crate) fn hit_genres(hit: &SearchHit) -> Option<String> {
    let all = distinct(hit.genre.iter().chain(&hit.style).cloned());
    (!all.is_empty()).then(|| all.join(", "))
}
