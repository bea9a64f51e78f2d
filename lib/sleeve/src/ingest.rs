use shared::catalog::CatalogItem;
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::traits::CatalogSource;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub per_page: u32,
    pub start_page: u32,
    /// Fixed pause between consecutive page requests
    pub request_delay: Duration,
    /// Account the collection is expected to belong to, used only when
    /// diagnosing an empty collection.
    pub expected_identity: Option<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            per_page: 100,
            start_page: 1,
            request_delay: Duration::from_millis(1100),
            expected_identity: None,
        }
    }
}

/// Why a successful ingestion came back with nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyDiagnosis {
    GenuinelyEmpty,
    IdentityMismatch { expected: String, actual: String },
    IdentityUnavailable(String),
}

#[derive(Debug)]
pub struct IngestReport {
    pub items: Vec<CatalogItem>,
    pub pages_requested: u32,
    pub total_reported: Option<u64>,
    /// Set only when zero items were collected
    pub diagnosis: Option<EmptyDiagnosis>,
}

pub struct CatalogIngestor {
    source: Arc<dyn CatalogSource>,
    options: IngestOptions,
}

impl CatalogIngestor {
    pub fn new(source: Arc<dyn CatalogSource>, options: IngestOptions) -> Self {
        Self { source, options }
    }

    /// Pages through the collection until the server reports no further page.
    ///
    /// Any failed request aborts the whole ingestion; nothing is retried.
    pub async fn ingest(&self) -> Result<IngestReport> {
        let per_page = self.options.per_page.max(1);
        let mut page = self.options.start_page.max(1);
        let mut items = Vec::new();
        let mut pages_requested = 0;
        let mut total_reported = None;

        info!(
            "Fetching {} collection from page {} ({} per page)",
            self.source.name(),
            page,
            per_page
        );

        loop {
            if pages_requested > 0 {
                sleep(self.options.request_delay).await;
            }

            let response = self.source.fetch_page(page, per_page).await?;
            pages_requested += 1;
            total_reported = response.total_items.or(total_reported);

            debug!(
                "Page {}/{}: {} items, {} skipped",
                response.page,
                response.pages,
                response.items.len(),
                response.skipped
            );

            // Only a page the server sent empty ends the collection.
            if response.items.is_empty() && response.skipped == 0 {
                break;
            }
            items.extend(response.items);

            if page >= response.pages {
                break;
            }
            page += 1;
        }

        let diagnosis = if items.is_empty() {
            Some(self.diagnose().await)
        } else {
            None
        };

        info!(
            "Collected {} items in {} requests",
            items.len(),
            pages_requested
        );

        Ok(IngestReport {
            items,
            pages_requested,
            total_reported,
            diagnosis,
        })
    }

    async fn diagnose(&self) -> EmptyDiagnosis {
        let diagnosis = match self.source.identity().await {
            Err(e) => EmptyDiagnosis::IdentityUnavailable(e.to_string()),
            Ok(actual) => match &self.options.expected_identity {
                Some(expected) if !expected.eq_ignore_ascii_case(&actual) => {
                    EmptyDiagnosis::IdentityMismatch {
                        expected: expected.clone(),
                        actual,
                    }
                }
                _ => EmptyDiagnosis::GenuinelyEmpty,
            },
        };
        warn!("Collection is empty: {:?}", diagnosis);
        diagnosis
    }
}
