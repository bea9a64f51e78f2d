use anyhow::{Context, Result};
use clap::Parser;
use sleeve::{
    aggregator::AggregatorLookup,
    assembler::ContentAssembler,
    batch::{run_batch, BatchOptions, BatchReport},
    cache::SqliteCache,
    cover::HttpCoverFetcher,
    discogs::{DiscogsClient, DiscogsClientBuilder},
    ingest::{CatalogIngestor, EmptyDiagnosis, IngestOptions},
    interaction::AutoConfirm,
    musicbrainz::MusicBrainzLookup,
    publish::{PublishCoordinator, PublishOptions, RunOutcome, RunStatus, Subject},
    queue::FileQueue,
    registry::ProcessingRegistry,
    resolver::SourceChains,
    Confirmer, ServicesBuilder,
};
use sleeve_cli::{
    args::Args,
    config::AppConfig,
    logging,
    prompt::{TerminalConfirmer, TerminalNotifier},
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let log_path = logging::init(args.debug, &config.log_dir)?;
    info!("Logging this run to {}", log_path.display());

    let discogs = Arc::new(
        DiscogsClientBuilder::new()
            .base_url(&config.discogs_api_url)
            .token(&config.discogs_token)
            .username(&config.discogs_username)
            .build()
            .context("Failed to build the catalog client")?,
    );
    let cache = Arc::new(
        SqliteCache::connect(&config.cache_db)
            .await
            .with_context(|| format!("Failed to open cache {}", config.cache_db))?,
    );

    if args.test {
        return check_connectivity(&discogs, &cache).await;
    }

    let confirmer: Arc<dyn Confirmer> = if args.yes {
        Arc::new(AutoConfirm::yes())
    } else {
        Arc::new(TerminalConfirmer)
    };
    let mut services = ServicesBuilder::new()
        .cache(cache)
        .add_lookup(discogs.clone())
        .add_lookup(Arc::new(AggregatorLookup::new(&config.aggregator_url)?))
        .enricher(discogs.clone())
        .cover(Arc::new(HttpCoverFetcher::default()))
        .confirmer(confirmer)
        .notifier(Arc::new(TerminalNotifier));
    match MusicBrainzLookup::new() {
        Ok(lookup) => services = services.add_lookup(Arc::new(lookup)),
        Err(e) => warn!("MusicBrainz lookups disabled: {}", e),
    }
    if let Some(queue) = &config.queue_file {
        services = services.queue(Arc::new(FileQueue::new(queue)));
    }
    let services = services.build().map_err(anyhow::Error::msg)?;

    let coordinator = PublishCoordinator::new(
        Arc::new(services),
        SourceChains::default(),
        ContentAssembler::new(config.full_threshold),
        PublishOptions {
            content_dir: config.content_dir.clone(),
            preview_command: config.preview_command.clone(),
            confirm_timeout: config.confirm_timeout,
            dry_run: args.dry_run,
        },
    );

    if let Some((artist, title)) = args.manual() {
        let outcome = coordinator
            .run(Subject::Manual {
                artist: artist.to_string(),
                title: title.to_string(),
            })
            .await?;
        print_outcome(&outcome, args.dry_run);
        return Ok(());
    }

    let (mut registry, stats) = ProcessingRegistry::init(&config.registry_path)
        .context("Failed to load the processing registry")?;
    info!(
        "Registry {}: {} processed ({} added, {} skipped)",
        registry.path().display(),
        stats.processed,
        stats.added,
        stats.skipped
    );
    if args.force {
        if args.dry_run {
            warn!("--force ignored on a dry run");
        } else {
            registry.reset()?;
            info!("Registry reset");
        }
    }

    let ingestor = CatalogIngestor::new(
        discogs,
        IngestOptions {
            per_page: config.per_page,
            start_page: config.start_page,
            request_delay: config.request_delay,
            expected_identity: Some(config.discogs_username.clone()),
        },
    );
    let options = BatchOptions {
        limit: args.limit,
        dry_run: args.dry_run,
    };
    let report = run_batch(&ingestor, &mut registry, &coordinator, &options).await?;
    print_report(&report);
    Ok(())
}

async fn check_connectivity(discogs: &DiscogsClient, cache: &SqliteCache) -> Result<()> {
    let user = discogs
        .check_connection()
        .await
        .context("Catalog API check failed")?;
    println!("Catalog API: authenticated as {user}");
    if !user.eq_ignore_ascii_case(discogs.username()) {
        println!(
            "Warning: token belongs to {user}, but the collection owner is {}",
            discogs.username()
        );
    }

    let releases = cache.ping().await.context("Cache check failed")?;
    println!("Cache: {releases} cached releases");
    Ok(())
}

fn print_outcome(outcome: &RunOutcome, dry_run: bool) {
    match (outcome.status, &outcome.path) {
        (RunStatus::Cancelled { at }, _) => println!("Cancelled at the {at} stage"),
        (_, Some(path)) if !dry_run => println!("Published {}", path.display()),
        _ => {
            if let Some(document) = &outcome.document {
                print!("{document}");
            }
        }
    }
    for warning in &outcome.warnings {
        println!("  warning: {warning}");
    }
}

fn print_report(report: &BatchReport) {
    println!(
        "{} releases in the collection, {} already processed",
        report.fetched, report.already_processed
    );
    println!(
        "Added {}, skipped {}, left for the next run {}, warnings {}",
        report.added, report.skipped, report.retried_later, report.warnings
    );
    match &report.diagnosis {
        Some(EmptyDiagnosis::GenuinelyEmpty) => println!("The collection is empty"),
        Some(EmptyDiagnosis::IdentityMismatch { expected, actual }) => println!(
            "The collection came back empty: the token belongs to {actual}, not {expected}"
        ),
        Some(EmptyDiagnosis::IdentityUnavailable(reason)) => {
            println!("The collection came back empty and the identity check failed: {reason}")
        }
        None => {}
    }
}
