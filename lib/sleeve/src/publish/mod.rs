//! One end-to-end publishing run for a single release.

mod coordinator;
pub mod preview;

use shared::{catalog::CatalogItem, identity::ReleaseIdentity};
use std::{fmt, path::PathBuf};
use thiserror::Error;

use crate::error::SleeveError;

pub use coordinator::{PublishCoordinator, PublishOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Init,
    Identify,
    Resolve,
    Assemble,
    Enrich,
    Finalize,
    Publish,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Identify => "identify",
            Stage::Resolve => "resolve",
            Stage::Assemble => "assemble",
            Stage::Enrich => "enrich",
            Stage::Finalize => "finalize",
            Stage::Publish => "publish",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// What a run is about.
#[derive(Debug, Clone)]
pub enum Subject {
    Catalog(CatalogItem),
    Manual { artist: String, title: String },
}

/// A non-critical failure, listed in the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub stage: Stage,
    pub message: String,
}

impl Warning {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    SuccessWithWarnings,
    Cancelled { at: Stage },
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub identity: Option<ReleaseIdentity>,
    /// Where the document was, or would have been, written
    pub path: Option<PathBuf>,
    pub warnings: Vec<Warning>,
    /// The rendered document, when rendering was reached
    pub document: Option<String>,
    pub remote_calls: usize,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            RunStatus::Success | RunStatus::SuccessWithWarnings
        )
    }
}

/// A fatal error and the stage it stopped the run at.
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct RunFailure {
    pub stage: Stage,
    #[source]
    pub error: SleeveError,
}
