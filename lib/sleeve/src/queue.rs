use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::traits::{QueueEntry, QueueSink};

/// Append-only newline-delimited JSON file read by the site tooling.
#[derive(Debug, Clone)]
pub struct FileQueue {
    path: PathBuf,
}

impl FileQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl QueueSink for FileQueue {
    async fn enqueue(&self, entry: &QueueEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
