use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a field ends up in the output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldGroup {
    Header,
    PrimaryLinks,
    SecondaryLinks,
    SocialLinks,
    Info,
    Enrichment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Link,
    Year,
    /// Newline separated entries (tracklist, credits)
    Lines,
}

/// Every value the resolver knows how to fill in.
///
/// The declaration order is the rendering order inside each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Year,
    Label,
    Genres,
    Cover,
    Bandcamp,
    Spotify,
    AppleMusic,
    YoutubeMusic,
    Tidal,
    Deezer,
    Discogs,
    MusicBrainz,
    Wikipedia,
    Website,
    Instagram,
    Facebook,
    Description,
    Tracklist,
    Credits,
    Notes,
}

impl Field {
    pub const ALL: [Field; 20] = [
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
        Field::Website,
        Field::Instagram,
        Field::Facebook,
        Field::Description,
        Field::Tracklist,
        Field::Credits,
        Field::Notes,
    ];

    /// Column / config key.
    pub fn key(&self) -> &'static str {
        match self {
            Field::Year => "year",
            Field::Label => "label",
            Field::Genres => "genres",
            Field::Cover => "cover",
            Field::Bandcamp => "bandcamp",
            Field::Spotify => "spotify",
            Field::AppleMusic => "apple_music",
            Field::YoutubeMusic => "youtube_music",
            Field::Tidal => "tidal",
            Field::Deezer => "deezer",
            Field::Discogs => "discogs",
            Field::MusicBrainz => "musicbrainz",
            Field::Wikipedia => "wikipedia",
            Field::Website => "website",
            Field::Instagram => "instagram",
            Field::Facebook => "facebook",
            Field::Description => "description",
            Field::Tracklist => "tracklist",
            Field::Credits => "credits",
            Field::Notes => "notes",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::Year => "Year",
            Field::Label => "Label",
            Field::Genres => "Genres",
            Field::Cover => "Cover",
            Field::Bandcamp => "Bandcamp",
            Field::Spotify => "Spotify",
            Field::AppleMusic => "Apple Music",
            Field::YoutubeMusic => "YouTube Music",
            Field::Tidal => "Tidal",
            Field::Deezer => "Deezer",
            Field::Discogs => "Discogs",
            Field::MusicBrainz => "MusicBrainz",
            Field::Wikipedia => "Wikipedia",
            Field::Website => "Website",
            Field::Instagram => "Instagram",
            Field::Facebook => "Facebook",
            Field::Description => "About",
            Field::Tracklist => "Tracklist",
            Field::Credits => "Credits",
            Field::Notes => "Production notes",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Year => FieldKind::Year,
            Field::Label | Field::Genres | Field::Description | Field::Notes => FieldKind::Text,
            Field::Tracklist | Field::Credits => FieldKind::Lines,
            _ => FieldKind::Link,
        }
    }

    pub fn group(&self) -> FieldGroup {
        match self {
            Field::Year | Field::Label | Field::Genres | Field::Cover => FieldGroup::Header,
            Field::Bandcamp
            | Field::Spotify
            | Field::AppleMusic
            | Field::YoutubeMusic
            | Field::Tidal
            | Field::Deezer => FieldGroup::PrimaryLinks,
            Field::Discogs | Field::MusicBrainz | Field::Wikipedia => FieldGroup::SecondaryLinks,
            Field::Website | Field::Instagram | Field::Facebook => FieldGroup::SocialLinks,
            Field::Description => FieldGroup::Info,
            Field::Tracklist | Field::Credits | Field::Notes => FieldGroup::Enrichment,
        }
    }

    pub fn is_link(&self) -> bool {
        self.kind() == FieldKind::Link
    }

    pub fn in_group(group: FieldGroup) -> impl Iterator<Item = Field> {
        Field::ALL.into_iter().filter(move |f| f.group() == group)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_lists_every_field_once_in_declaration_order() {
        let mut sorted = Field::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, Field::ALL.to_vec());
        sorted.dedup();
        assert_eq!(sorted.len(), Field::ALL.len());
    }

    #[test]
    fn groups_partition_fields() {
        let primary: Vec<_> = Field::in_group(FieldGroup::PrimaryLinks).collect();
        assert_eq!(primary.first(), Some(&Field::Bandcamp));
        assert!(primary.iter().all(|f| f.is_link()));
        assert_eq!(Field::in_group(FieldGroup::SocialLinks).count(), 3);
    }

    #[test]
    fn keys_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_key(field.key()), Some(field));
        }
        assert_eq!(Field::from_key("myspace"), None);
    }
}
