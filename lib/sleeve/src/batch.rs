//! Drives a whole collection through the publishing pipeline.

use thiserror::Error;
use tracing::{info, warn};

use crate::error::SleeveError;
use crate::ingest::{CatalogIngestor, EmptyDiagnosis};
use crate::publish::{PublishCoordinator, RunFailure, RunStatus, Stage, Subject};
use crate::registry::{Outcome, ProcessingRegistry};

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Maximum number of unprocessed items to run
    pub limit: Option<usize>,
    /// Run without touching the registry
    pub dry_run: bool,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub fetched: usize,
    pub already_processed: usize,
    pub added: usize,
    pub skipped: usize,
    /// Items that failed without aborting the batch, left for the next run
    pub retried_later: usize,
    pub warnings: usize,
    pub diagnosis: Option<EmptyDiagnosis>,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Collection ingestion failed: {0}")]
    Ingest(#[source] SleeveError),

    #[error(transparent)]
    Run(#[from] RunFailure),

    #[error("Could not record {id}: {source}")]
    Registry { id: String, source: SleeveError },
}

pub async fn run_batch(
    ingestor: &CatalogIngestor,
    registry: &mut ProcessingRegistry,
    coordinator: &PublishCoordinator,
    options: &BatchOptions,
) -> Result<BatchReport, BatchError> {
    let ingest = ingestor.ingest().await.map_err(BatchError::Ingest)?;
    let mut report = BatchReport {
        fetched: ingest.items.len(),
        diagnosis: ingest.diagnosis,
        ..Default::default()
    };

    let (done, pending): (Vec<_>, Vec<_>) = ingest
        .items
        .into_iter()
        .partition(|item| registry.is_processed(&item.id));
    report.already_processed = done.len();

    let pending: Vec<_> = match options.limit {
        Some(limit) => pending.into_iter().take(limit).collect(),
        None => pending,
    };
    info!(
        "{} items fetched, {} already processed, running {}",
        report.fetched,
        report.already_processed,
        pending.len()
    );

    for item in pending {
        let id = item.id.clone();
        let outcome = match coordinator.run(Subject::Catalog(item)).await {
            Ok(outcome) => {
                report.warnings += outcome.warnings.len();
                match outcome.status {
                    RunStatus::Success | RunStatus::SuccessWithWarnings => Some(Outcome::Added),
                    RunStatus::Cancelled { .. } => Some(Outcome::Skipped),
                }
            }
            Err(failure) if failure.error.is_fatal() => return Err(failure.into()),
            Err(failure) if failure.stage == Stage::Identify => {
                warn!("Skipping {}: {}", id, failure);
                Some(Outcome::Skipped)
            }
            Err(failure) => {
                warn!("{} failed, it will be retried on the next run: {}", id, failure);
                report.retried_later += 1;
                None
            }
        };

        let Some(outcome) = outcome else { continue };
        match outcome {
            Outcome::Added => report.added += 1,
            Outcome::Skipped => report.skipped += 1,
        }
        if !options.dry_run {
            registry
                .mark_processed(&id, outcome)
                .map_err(|source| BatchError::Registry { id, source })?;
        }
    }

    info!(
        "Batch done: {} added, {} skipped, {} left for later, {} warnings",
        report.added, report.skipped, report.retried_later, report.warnings
    );
    Ok(report)
}
