use serde::{Deserialize, Serialize};

/// A single row of a release tracklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackEntry {
    pub position: String,
    pub title: String,
    pub duration: Option<String>,
}

impl TrackEntry {
    pub fn line(&self) -> String {
        let mut line = String::new();
        if !self.position.is_empty() {
            line.push_str(&self.position);
            line.push_str(". ");
        }
        line.push_str(&self.title);
        if let Some(duration) = self.duration.as_deref().filter(|d| !d.is_empty()) {
            line.push_str(&format!(" ({duration})"));
        }
        line
    }
}

/// A contributor and what they did on the release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credit {
    pub name: String,
    pub role: String,
}

impl Credit {
    pub fn line(&self) -> String {
        if self.role.is_empty() {
            self.name.clone()
        } else {
            format!("{}: {}", self.role, self.name)
        }
    }
}

/// What a deep-enrichment lookup returns for one release.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseDetails {
    pub tracklist: Vec<TrackEntry>,
    pub credits: Vec<Credit>,
    pub notes: Option<String>,
    pub images: Vec<String>,
}

impl ReleaseDetails {
    pub fn is_empty(&self) -> bool {
        self.tracklist.is_empty()
            && self.credits.is_empty()
            && self.notes.as_deref().map_or(true, |n| n.trim().is_empty())
            && self.images.is_empty()
    }
}
