use serde::Deserialize;

// Internal structs for deserializing raw API responses. Only the fields the
// pipeline reads are modelled.

#[derive(Deserialize, Debug)]
pub(crate) struct Pagination {
    pub page: u32,
    pub pages: u32,
    pub items: Option<u64>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct CollectionResponse {
    pub pagination: Pagination,
    #[serde(default)]
    pub releases: Vec<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct CollectionRelease {
    pub id: u64,
    pub date_added: Option<String>,
    pub basic_information: BasicInformation,
}

#[derive(Deserialize, Debug)]
pub(crate) struct BasicInformation {
    pub title: String,
    pub year: Option<u32>,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub labels: Vec<LabelRef>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    pub cover_image: Option<String>,
    pub thumb: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ArtistRef {
    pub name: String,
    #[serde(default)]
    pub join: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct LabelRef {
    pub name: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct Identity {
    pub username: String,
}

/// Shape shared by `/releases/{id}` and `/masters/{id}`.
#[derive(Deserialize, Debug, Default)]
pub(crate) struct ReleaseDetail {
    #[serde(default)]
    pub tracklist: Vec<TrackDto>,
    #[serde(default)]
    pub extraartists: Vec<ExtraArtist>,
    pub notes: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageDto>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct TrackDto {
    #[serde(default)]
    pub position: String,
    pub title: String,
    #[serde(default)]
    pub duration: String,
    #[serde(rename = "type_")]
    pub kind: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ExtraArtist {
    pub name: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ImageDto {
    pub uri: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct SearchHit {
    pub id: u64,
    pub year: Option<String>,
    #[serde(default)]
    pub label: Vec<String>,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub style: Vec<String>,
    pub cover_image: Option<String>,
}
