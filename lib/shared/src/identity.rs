use serde::{Deserialize, Serialize};
use std::fmt;

/// The (artist, release) pair every lookup is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseIdentity {
    pub artist: String,
    pub title: String,
}

impl ReleaseIdentity {
    pub fn new(artist: &str, title: &str) -> Self {
        Self {
            artist: artist.trim().to_string(),
            title: title.trim().to_string(),
        }
    }

    /// Lower-cased, punctuation stripped, whitespace runs joined by `-`.
    ///
    /// Used for output paths, so it must stay stable across runs.
    pub fn slug(&self) -> String {
        slugify(&format!("{} {}", self.artist, self.title))
    }
}

impl fmt::Display for ReleaseIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

pub fn slugify(input: &str) -> String {
    let cleaned: String = input
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' || c == '/' {
                ' '
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join("-")
}
