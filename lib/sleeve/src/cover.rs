use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use crate::error::{Result, SleeveError};
use crate::traits::CoverFetcher;

const KNOWN_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// File name the cover is stored under, keeping the remote extension.
fn cover_file_name(url: &Url) -> String {
    let ext = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| KNOWN_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| "jpg".to_string());
    format!("cover.{ext}")
}

#[derive(Debug, Clone, Default)]
pub struct HttpCoverFetcher {
    client: Client,
}

impl HttpCoverFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CoverFetcher for HttpCoverFetcher {
    async fn fetch(&self, url: &str, dir: &Path) -> Result<PathBuf> {
        let url = Url::parse(url)?;
        let target = dir.join(cover_file_name(&url));

        debug!("Downloading cover {} to {}", url, target.display());
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SleeveError::from_status(status.as_u16(), "cover download failed"));
        }
        let bytes = response.bytes().await?;

        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&target, &bytes).await?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_known_extensions() {
        let name = |u: &str| cover_file_name(&Url::parse(u).unwrap());
        assert_eq!(name("https://i.discogs.com/abc/R-1.png"), "cover.png");
        assert_eq!(name("https://i.discogs.com/abc/R-1.JPEG?x=1"), "cover.jpeg");
        assert_eq!(name("https://i.discogs.com/abc/R-1"), "cover.jpg");
        assert_eq!(name("https://i.discogs.com/abc/R-1.gif.php"), "cover.jpg");
    }
}
