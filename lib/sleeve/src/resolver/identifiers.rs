use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::LazyLock};

static RE_TYPED_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(release|master)s?/(\d+)(?:[-/?#]|$)").unwrap());

/// Granularity of a catalog identifier. Ordered from coarse to fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
    /// Groups every pressing of a release
    Master,
    /// One specific pressing
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypedId {
    pub kind: IdKind,
    pub id: u64,
}

impl TypedId {
    pub fn release(id: u64) -> Self {
        Self {
            kind: IdKind::Release,
            id,
        }
    }

    pub fn master(id: u64) -> Self {
        Self {
            kind: IdKind::Master,
            id,
        }
    }
}

impl fmt::Display for TypedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            IdKind::Master => write!(f, "master/{}", self.id),
            IdKind::Release => write!(f, "release/{}", self.id),
        }
    }
}

/// Pulls a `{type}/{numeric id}` segment out of a link.
pub fn extract(link: &str) -> Option<TypedId> {
    let caps = RE_TYPED_ID.captures(link)?;
    let id = caps.get(2)?.as_str().parse().ok()?;
    let kind = match caps.get(1)?.as_str() {
        "release" => IdKind::Release,
        _ => IdKind::Master,
    };
    Some(TypedId { kind, id })
}

/// Most specific identifier among `links`; the first one wins among equals.
pub fn best<'a>(links: impl IntoIterator<Item = &'a str>) -> Option<TypedId> {
    links
        .into_iter()
        .filter_map(extract)
        .fold(None, |best: Option<TypedId>, candidate| match best {
            Some(current) if current.kind >= candidate.kind => Some(current),
            _ => Some(candidate),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_typed_ids() {
        assert_eq!(
            extract("https://www.discogs.com/release/249504-Rick-Astley"),
            Some(TypedId::release(249504))
        );
        assert_eq!(
            extract("https://www.discogs.com/Slowdive-Souvlaki/master/24155"),
            Some(TypedId::master(24155))
        );
        assert_eq!(
            extract("https://api.discogs.com/releases/42?token=x"),
            Some(TypedId::release(42))
        );
    }

    #[test]
    fn ignores_non_numeric_and_unrelated_paths() {
        assert_eq!(
            extract("https://musicbrainz.org/release/8d1bc5a4-5ab3-4d3d-9b3e-1e1f3a0c7c55"),
            None
        );
        assert_eq!(extract("https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy"), None);
        assert_eq!(extract("https://example.com/release/12abc"), None);
    }

    #[test]
    fn prefers_the_more_specific_identifier() {
        let links = [
            "https://www.discogs.com/master/100",
            "https://www.discogs.com/release/200",
            "https://www.discogs.com/release/300",
        ];
        assert_eq!(best(links), Some(TypedId::release(200)));
        assert_eq!(best(["https://www.discogs.com/master/100"]), Some(TypedId::master(100)));
        assert_eq!(best(Vec::<&str>::new()), None);
    }
}
