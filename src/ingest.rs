use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::db::Store;
use crate::document::Document;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::parser::{extract_html, ExtractOptions};

/// Counts returned after a batch ingestion.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

/// Fetches pages, extracts them and hands the documents to the store.
#[derive(Clone)]
pub struct Ingestor {
    fetcher: Fetcher,
    options: Arc<ExtractOptions>,
}

impl Ingestor {
    pub fn new(fetcher: Fetcher, options: ExtractOptions) -> Self {
        Self {
            fetcher,
            options: Arc::new(options),
        }
    }

    /// Fetch `url` and extract its document without storing it.
    pub async fn extract_url(&self, url: &str) -> Result<Document> {
        let body = self.fetcher.fetch_bytes(url).await?;
        let options = Arc::clone(&self.options);
        let url = url.to_string();
        let doc = tokio::task::spawn_blocking(move || extract_html(&body[..], &url, &options))
            .await??;
        Ok(doc)
    }

    /// Fetch, extract and store `url`; the returned document carries its new id.
    pub async fn ingest(&self, store: &Store, url: &str) -> Result<Document> {
        let mut doc = self.extract_url(url).await?;
        store.create(&mut doc)?;
        info!(
            id = doc.id,
            title = %doc.title,
            sections = doc.sections.len(),
            "stored {}",
            url
        );
        Ok(doc)
    }

    /// Ingest every URL, at most `concurrency` at a time. Failures are logged and counted.
    pub async fn ingest_many(
        &self,
        store: Arc<Store>,
        urls: Vec<String>,
        concurrency: usize,
    ) -> Result<IngestStats> {
        let total = urls.len();
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );

        let mut tasks = tokio::task::JoinSet::new();
        for url in urls {
            let ingestor = self.clone();
            let store = Arc::clone(&store);
            let sem = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = sem.acquire_owned().await;
                let outcome = ingestor.ingest(&store, &url).await;
                (url, outcome)
            });
        }

        let mut stats = IngestStats {
            total,
            ..Default::default()
        };
        while let Some(joined) = tasks.join_next().await {
            match joined? {
                (_, Ok(_)) => stats.ok += 1,
                (url, Err(e)) => {
                    warn!("Ingesting {} failed: {}", url, e);
                    stats.errors += 1;
                }
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        info!(
            "Ingested {} pages ({} ok, {} errors)",
            stats.total, stats.ok, stats.errors
        );
        Ok(stats)
    }
}
