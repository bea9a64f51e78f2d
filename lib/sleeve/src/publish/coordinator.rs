use chrono::Utc;
use shared::{catalog::CatalogItem, details::ReleaseDetails, identity::ReleaseIdentity};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, error, info, warn};

use super::{
    preview::PreviewGuard, RunFailure, RunOutcome, RunStatus, Stage, Subject, Warning,
};
use crate::assembler::ContentAssembler;
use crate::discogs::strip_disambiguation;
use crate::document::OutputDocument;
use crate::error::{Result, SleeveError};
use crate::resolver::{FieldResolver, ResolvedEntity, SourceChains};
use crate::services::Services;
use crate::traits::QueueEntry;

#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub content_dir: PathBuf,
    /// Program run on a temporary copy of the rendered document before
    /// publishing. Arguments are split on whitespace.
    pub preview_command: Option<String>,
    /// After this long an unanswered prompt takes its default answer.
    pub confirm_timeout: Duration,
    /// Resolve and render only; nothing is written.
    pub dry_run: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content/music"),
            preview_command: None,
            confirm_timeout: Duration::from_secs(120),
            dry_run: false,
        }
    }
}

#[derive(Default)]
struct RunState {
    stage: Option<Stage>,
    warnings: Vec<Warning>,
    identity: Option<ReleaseIdentity>,
    path: Option<PathBuf>,
    document: Option<String>,
    remote_calls: usize,
}

impl RunState {
    fn stage(&self) -> Stage {
        self.stage.unwrap_or(Stage::Init)
    }

    fn enter(&mut self, stage: Stage) {
        debug!("Entering {} stage", stage);
        self.stage = Some(stage);
    }

    fn warn(&mut self, message: impl Into<String>) {
        let warning = Warning::new(self.stage(), message);
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    fn finish(self, status: RunStatus) -> RunOutcome {
        RunOutcome {
            status,
            identity: self.identity,
            path: self.path,
            warnings: self.warnings,
            document: self.document,
            remote_calls: self.remote_calls,
        }
    }
}

fn identify(subject: Subject) -> Result<(ReleaseIdentity, Option<CatalogItem>)> {
    let (artist, title, catalog) = match subject {
        Subject::Catalog(item) => (item.artist.clone(), item.title.clone(), Some(item)),
        Subject::Manual { artist, title } => (artist, title, None),
    };

    let identity = ReleaseIdentity::new(&strip_disambiguation(&artist), &title);
    if identity.artist.is_empty() || identity.title.is_empty() || identity.slug().is_empty() {
        return Err(SleeveError::NotFound(format!(
            "no usable artist and title in \"{artist}\" / \"{title}\""
        )));
    }
    Ok((identity, catalog))
}

pub struct PublishCoordinator {
    services: Arc<Services>,
    resolver: FieldResolver,
    assembler: ContentAssembler,
    options: PublishOptions,
}

impl PublishCoordinator {
    pub fn new(
        services: Arc<Services>,
        chains: SourceChains,
        assembler: ContentAssembler,
        options: PublishOptions,
    ) -> Self {
        let resolver = services.resolver(chains);
        Self {
            services,
            resolver,
            assembler,
            options,
        }
    }

    pub fn options(&self) -> &PublishOptions {
        &self.options
    }

    pub fn output_path(&self, identity: &ReleaseIdentity) -> PathBuf {
        self.options
            .content_dir
            .join(identity.slug())
            .join("index.md")
    }

    /// Runs every stage for `subject`.
    ///
    /// Errors are returned with the stage they happened in; only fatal ones
    /// reach the notifier. Everything else ends in a [`RunOutcome`].
    pub async fn run(&self, subject: Subject) -> std::result::Result<RunOutcome, RunFailure> {
        let mut run = RunState::default();
        match self.drive(subject, &mut run).await {
            Ok(status) => {
                let outcome = run.finish(status);
                match outcome.status {
                    RunStatus::Cancelled { at } => info!("Run cancelled at {} stage", at),
                    _ => info!(
                        "Run finished with {} warning(s): {:?}",
                        outcome.warnings.len(),
                        outcome.status
                    ),
                }
                Ok(outcome)
            }
            Err(error) => {
                let failure = RunFailure {
                    stage: run.stage(),
                    error,
                };
                if failure.error.is_fatal() {
                    error!("Run failed: {}", failure);
                    self.services
                        .notifier()
                        .notify("Publishing failed", &failure.to_string());
                } else {
                    warn!("Run stopped: {}", failure);
                }
                Err(failure)
            }
        }
    }

    async fn drive(&self, subject: Subject, run: &mut RunState) -> Result<RunStatus> {
        run.enter(Stage::Identify);
        let (identity, catalog) = identify(subject)?;
        let path = self.output_path(&identity);
        info!("Processing {} -> {}", identity, path.display());
        run.identity = Some(identity.clone());
        run.path = Some(path.clone());

        if path.exists() && !self.options.dry_run {
            let prompt = format!("{} already exists. Overwrite?", path.display());
            if !self.ask(run, &prompt, false).await? {
                return Ok(RunStatus::Cancelled { at: Stage::Identify });
            }
        }

        run.enter(Stage::Resolve);
        let report = self.resolver.resolve(&identity, catalog.as_ref()).await?;
        run.remote_calls = report.remote_calls;
        for failure in report.failures {
            match failure.field {
                Some(field) => run.warn(format!("{} for {}: {}", failure.source, field, failure.error)),
                None => run.warn(format!("{}: {}", failure.source, failure.error)),
            }
        }
        let entity = report.entity;

        run.enter(Stage::Assemble);
        let mut doc = self.assembler.assemble(&entity, Utc::now())?;

        run.enter(Stage::Enrich);
        let details = self.enrich(&entity, &mut doc, run).await;
        if let Some(dir) = path.parent() {
            self.fetch_cover(&mut doc, dir, run).await;
        }

        run.enter(Stage::Finalize);
        doc.header.normalize()?;
        if self.assembler.apply_length_heuristic(&mut doc) {
            self.assembler.attach_images(&mut doc, &details.images);
        }
        let text = doc.render()?;
        run.document = Some(text.clone());

        if let Some(command) = self.options.preview_command.as_deref() {
            if !self.options.dry_run && !self.preview(command, &text, run).await? {
                return Ok(RunStatus::Cancelled { at: Stage::Finalize });
            }
        }

        run.enter(Stage::Publish);
        if self.options.dry_run {
            info!("Dry run, not writing {}", path.display());
        } else {
            if let Some(dir) = path.parent() {
                tokio::fs::create_dir_all(dir).await?;
            }
            tokio::fs::write(&path, &text).await?;
            info!("Wrote {}", path.display());
            self.enqueue(&identity, &path, run).await;
        }

        run.enter(Stage::Done);
        Ok(if run.warnings.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::SuccessWithWarnings
        })
    }

    /// Asks the confirmer, falling back to `default` once the timeout passes.
    async fn ask(&self, run: &mut RunState, prompt: &str, default: bool) -> Result<bool> {
        let confirmer = self.services.confirmer();
        match tokio::time::timeout(
            self.options.confirm_timeout,
            confirmer.confirm(prompt, default),
        )
        .await
        {
            Ok(answer) => answer,
            Err(_) => {
                run.warn(format!(
                    "No answer to \"{}\" within {}s, assuming {}",
                    prompt,
                    self.options.confirm_timeout.as_secs(),
                    if default { "yes" } else { "no" }
                ));
                Ok(default)
            }
        }
    }

    async fn enrich(
        &self,
        entity: &ResolvedEntity,
        doc: &mut OutputDocument,
        run: &mut RunState,
    ) -> ReleaseDetails {
        let (Some(enricher), Some(id)) = (self.services.enricher(), entity.typed_id) else {
            debug!("No deep enrichment available for {}", entity.identity);
            return ReleaseDetails::default();
        };

        match enricher.enrich(&id).await {
            Ok(details) => {
                let filled = self.assembler.apply_details(doc, &details);
                debug!("{} filled {:?} from {}", enricher.name(), filled, id);
                details
            }
            Err(e) => {
                run.warn(format!("{} enrichment of {} failed: {}", enricher.name(), id, e));
                ReleaseDetails::default()
            }
        }
    }

    /// Stores a remote cover next to the document and points the header at it.
    async fn fetch_cover(&self, doc: &mut OutputDocument, dir: &Path, run: &mut RunState) {
        if self.options.dry_run {
            return;
        }
        let Some(fetcher) = self.services.cover() else {
            return;
        };
        let Some(url) = doc.header.cover.clone().filter(|c| c.starts_with("http")) else {
            return;
        };

        match fetcher.fetch(&url, dir).await {
            Ok(file) => {
                if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
                    doc.header.cover = Some(name.to_string());
                }
            }
            Err(e) => run.warn(format!("Cover download failed, keeping {url}: {e}")),
        }
    }

    /// Shows the preview and asks whether to publish.
    async fn preview(&self, command: &str, text: &str, run: &mut RunState) -> Result<bool> {
        let guard = match PreviewGuard::spawn(command, text, &std::env::temp_dir()) {
            Ok(guard) => Some(guard),
            Err(e) => {
                run.warn(format!("Preview \"{command}\" could not start: {e}"));
                None
            }
        };

        let answer = self.ask(run, "Publish this document?", true).await;
        if let Some(guard) = guard {
            guard.stop().await;
        }
        answer
    }

    async fn enqueue(&self, identity: &ReleaseIdentity, path: &Path, run: &mut RunState) {
        let Some(queue) = self.services.queue() else {
            return;
        };
        let entry = QueueEntry {
            path: path.to_path_buf(),
            artist: identity.artist.clone(),
            title: identity.title.clone(),
            published_at: Utc::now(),
        };
        if let Err(e) = queue.enqueue(&entry).await {
            run.warn(format!("Could not queue {}: {}", path.display(), e));
        }
    }
}
