pub mod aggregator;
pub mod assembler;
pub mod batch;
pub mod cache;
pub mod cover;
pub mod discogs;
pub mod document;
pub mod error;
pub mod ingest;
pub mod interaction;
pub mod musicbrainz;
pub mod publish;
pub mod queue;
pub mod registry;
pub mod resolver;
pub mod services;
pub mod traits;

#[cfg(test)]
mod testing;

pub use error::{ErrorKind, Result, SleeveError};
pub use services::{Services, ServicesBuilder};
pub use traits::{
    CatalogSource, Confirmer, CoverFetcher, DeepEnricher, FieldLookup, Notifier, QueueEntry,
    QueueSink, ReleaseCache,
};
