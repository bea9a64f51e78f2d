//! Read-only SQLite cache of links and notes gathered by earlier tooling.
//!
//! Three tables are consulted, one per source level:
//! `releases(artist, title, <release columns>)`, `artists(name, <artist columns>)`
//! and `network_links(artist, title, platform, url)`. Every text comparison is
//! case-insensitive: an exact match is tried first, then a substring match.

use async_trait::async_trait;
use shared::{fields::Field, identity::ReleaseIdentity};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Row, SqlitePool,
};
use std::{collections::BTreeMap, str::FromStr};
use tracing::debug;

use crate::error::Result;
use crate::traits::ReleaseCache;

pub const RELEASE_COLUMNS: [Field; 17] = [
    Field::Year,
    Field::Label,
    Field::Genres,
    Field::Cover,
    Field::Bandcamp,
    Field::Spotify,
    Field::AppleMusic,
    Field::YoutubeMusic,
    Field::Tidal,
    Field::Deezer,
    Field::Discogs,
    Field::MusicBrainz,
    Field::Wikipedia,
    Field::Description,
    Field::Tracklist,
    Field::Credits,
    Field::Notes,
];

pub const ARTIST_COLUMNS: [Field; 11] = [
    Field::Bandcamp,
    Field::Spotify,
    Field::AppleMusic,
    Field::YoutubeMusic,
    Field::Tidal,
    Field::Deezer,
    Field::Wikipedia,
    Field::Website,
    Field::Instagram,
    Field::Facebook,
    Field::Description,
];

/// Layout the cache is expected to have. Only used to seed test databases;
/// the cache itself never writes.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS releases (
    artist TEXT NOT NULL, title TEXT NOT NULL,
    year INTEGER, label TEXT, genres TEXT, cover TEXT,
    bandcamp TEXT, spotify TEXT, apple_music TEXT, youtube_music TEXT, tidal TEXT, deezer TEXT,
    discogs TEXT, musicbrainz TEXT, wikipedia TEXT,
    description TEXT, tracklist TEXT, credits TEXT, notes TEXT
);
CREATE TABLE IF NOT EXISTS artists (
    name TEXT NOT NULL,
    bandcamp TEXT, spotify TEXT, apple_music TEXT, youtube_music TEXT, tidal TEXT, deezer TEXT,
    wikipedia TEXT, website TEXT, instagram TEXT, facebook TEXT, description TEXT
);
CREATE TABLE IF NOT EXISTS network_links (
    artist TEXT NOT NULL, title TEXT NOT NULL, platform TEXT NOT NULL, url TEXT
);
";

/// Raw values one source level holds for an entity, keyed by field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues(BTreeMap<Field, String>);

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn insert(&mut self, field: Field, value: impl Into<String>) {
        self.0.insert(field, value.into());
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Field, String)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (Field, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone)]
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    /// Opens the cache read-only.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Cheap query used by the connectivity check.
    pub async fn ping(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM releases")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn lookup_row(
        &self,
        table: &str,
        key_columns: &[&str],
        keys: &[&str],
        columns: &[Field],
    ) -> Result<Option<FieldValues>> {
        let select = select_list(columns);

        let exact = key_columns
            .iter()
            .map(|c| format!("lower({c}) = lower(?)"))
            .collect::<Vec<_>>()
            .join(" AND ");
        let sql = format!("SELECT {select} FROM {table} WHERE {exact} LIMIT 1");
        let mut query = sqlx::query(&sql);
        for key in keys {
            query = query.bind(*key);
        }
        if let Some(row) = query.fetch_optional(&self.pool).await? {
            debug!("Cache hit in {} (exact)", table);
            return row_values(&row, columns).map(Some);
        }

        let fuzzy = key_columns
            .iter()
            .map(|c| format!("lower({c}) LIKE '%' || lower(?) || '%' ESCAPE '\\'"))
            .collect::<Vec<_>>()
            .join(" AND ");
        let order = key_columns
            .iter()
            .map(|c| format!("length({c})"))
            .collect::<Vec<_>>()
            .join(" + ");
        let sql = format!("SELECT {select} FROM {table} WHERE {fuzzy} ORDER BY {order} LIMIT 1");
        let mut query = sqlx::query(&sql);
        for key in keys {
            query = query.bind(escape_like(key));
        }
        match query.fetch_optional(&self.pool).await? {
            Some(row) => {
                debug!("Cache hit in {} (substring)", table);
                row_values(&row, columns).map(Some)
            }
            None => Ok(None),
        }
    }
}

fn select_list(columns: &[Field]) -> String {
    columns
        .iter()
        .map(|f| format!("CAST({0} AS TEXT) AS {0}", f.key()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn row_values(row: &SqliteRow, columns: &[Field]) -> Result<FieldValues> {
    let mut values = FieldValues::new();
    for field in columns {
        let value: Option<String> = row.try_get(field.key())?;
        if let Some(value) = value {
            values.insert(*field, value);
        }
    }
    Ok(values)
}

#[async_trait]
impl ReleaseCache for SqliteCache {
    async fn release(&self, identity: &ReleaseIdentity) -> Result<Option<FieldValues>> {
        self.lookup_row(
            "releases",
            &["artist", "title"],
            &[identity.artist.as_str(), identity.title.as_str()],
            &RELEASE_COLUMNS,
        )
        .await
    }

    async fn artist(&self, name: &str) -> Result<Option<FieldValues>> {
        self.lookup_row("artists", &["name"], &[name], &ARTIST_COLUMNS)
            .await
    }

    async fn network(&self, identity: &ReleaseIdentity) -> Result<Option<FieldValues>> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            "SELECT platform, url FROM network_links WHERE lower(artist) = lower(?) AND lower(title) = lower(?)",
        )
        .bind(&identity.artist)
        .bind(&identity.title)
        .fetch_all(&self.pool)
        .await?;

        let values: FieldValues = rows
            .into_iter()
            .filter_map(|(platform, url)| {
                let field = Field::from_key(&platform.to_lowercase())?;
                Some((field, url?))
            })
            .collect();

        Ok((!values.is_empty()).then_some(values))
    }
}

/// Makes `%` and `_` match only themselves under `ESCAPE '\'`.
fn escape_like(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for c in key.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
