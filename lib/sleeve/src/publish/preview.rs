use std::{io::Write, path::Path, process::Stdio};
use tempfile::NamedTempFile;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{Result, SleeveError};

/// A running preview of a rendered document.
///
/// The child is spawned with `kill_on_drop`, so it also dies when the guard
/// is dropped on an early return. The rendered text lives in a temporary file
/// for as long as the guard does.
pub struct PreviewGuard {
    child: Child,
    _file: NamedTempFile,
}

impl PreviewGuard {
    /// Runs `command` with the path of a temporary copy of `text` appended.
    pub fn spawn(command: &str, text: &str, dir: &Path) -> Result<Self> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| SleeveError::NotConfigured("empty preview command".into()))?;

        let mut file = tempfile::Builder::new()
            .prefix("sleeve-preview-")
            .suffix(".md")
            .tempfile_in(dir)?;
        file.write_all(text.as_bytes())?;
        file.flush()?;

        let child = Command::new(program)
            .args(parts)
            .arg(file.path())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        debug!("Preview started: {} {}", command, file.path().display());

        Ok(Self { child, _file: file })
    }

    /// Kills the preview and waits for it to exit.
    pub async fn stop(mut self) {
        if let Err(e) = self.child.kill().await {
            warn!("Could not stop preview: {}", e);
        }
    }
}
