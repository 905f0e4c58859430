//! Sequential run over a list of bulletins.
//!
//! Bulletins are processed one at a time; each page is opened, scanned and
//! dropped before the next one is opened, so the page resource is released
//! on every path out of [`StatsPipeline::extract_one`].

use crate::extract::{ExtractError, ExtractorConfig, ScanOutcome, scan_bulletin};
use crate::scraper::{BulletinPage, PageSource, ScraperError};
use crate::sink::{ResultSink, SinkError};
use crate::types::{BulletinReference, ExtractionResult, StatsRecord};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Scraper(#[from] ScraperError),
    #[error("Malformed bulletin {link}: {source}")]
    Extract {
        link: String,
        #[source]
        source: ExtractError,
    },
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// What to do when a bulletin mentions the anchor but cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the run.
    #[default]
    Abort,
    /// Log the failure and record the bulletin without data.
    Skip,
}

pub struct StatsPipeline<S> {
    source: S,
    config: ExtractorConfig,
    policy: FailurePolicy,
}

impl<S: PageSource> StatsPipeline<S> {
    pub fn new(source: S, config: ExtractorConfig) -> Self {
        Self {
            source,
            config,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetches and scans a single bulletin. `Ok(None)` is a logged miss.
    pub async fn extract_one(
        &self,
        post: &BulletinReference,
    ) -> Result<Option<ExtractionResult>, RunError> {
        let page = self.source.open_page(&post.link).await?;

        let outcome = scan_bulletin(post, page.paragraphs(), &self.config).map_err(|source| {
            RunError::Extract {
                link: post.link.clone(),
                source,
            }
        })?;

        match outcome {
            ScanOutcome::Found(result) => Ok(Some(result)),
            ScanOutcome::Miss { date, link } => {
                log::warn!("No count found for {date}: {link}");
                Ok(None)
            }
        }
    }

    /// Processes `posts` in order, producing exactly one record per post.
    pub async fn run(&self, posts: Vec<BulletinReference>) -> Result<Vec<StatsRecord>, RunError> {
        let mut records = Vec::with_capacity(posts.len());

        for (i, post) in posts.into_iter().enumerate() {
            log::info!("[{}] Extracting {} {}", i + 1, post.date, post.link);

            let data = match self.extract_one(&post).await {
                Ok(data) => data,
                Err(RunError::Extract { link, source }) if self.policy == FailurePolicy::Skip => {
                    log::error!("Skipping malformed bulletin {link}: {source}");
                    None
                }
                Err(e) => return Err(e),
            };

            records.push(StatsRecord { data, post });
        }

        Ok(records)
    }

    /// Runs over `posts` and hands the records to `sink`.
    pub async fn run_into<K: ResultSink>(
        &self,
        posts: Vec<BulletinReference>,
        sink: &K,
    ) -> Result<Vec<StatsRecord>, RunError> {
        let records = self.run(posts).await?;
        sink.save(&records)?;
        Ok(records)
    }
}
