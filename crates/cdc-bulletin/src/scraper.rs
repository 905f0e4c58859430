use crate::parser::{ParseError, parse_bulletin_list, parse_bulletin_paragraphs};
use crate::types::BulletinReference;

use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
}

/// Supplies bulletin listings and bulletin pages to the pipeline.
pub trait PageSource {
    type Page: BulletinPage;

    fn list_bulletins(
        &self,
        list_url: &str,
    ) -> impl Future<Output = Result<Vec<BulletinReference>, ScraperError>>;

    /// Acquires the page at `url`. The resource is held until the returned
    /// page is dropped.
    fn open_page(&self, url: &str) -> impl Future<Output = Result<Self::Page, ScraperError>>;
}

pub trait BulletinPage {
    /// Paragraph texts in document order, whitespace removed.
    fn paragraphs(&self) -> &[String];
}

/// A fetched bulletin page. Holds the scraper's single page slot.
#[derive(Debug)]
pub struct WebPage {
    url: String,
    paragraphs: Vec<String>,
    _slot: OwnedMutexGuard<()>,
}

impl BulletinPage for WebPage {
    fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }
}

impl Drop for WebPage {
    fn drop(&mut self) {
        log::debug!("Closing page {}", self.url);
    }
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
    page_slot: Arc<Mutex<()>>,
}

impl WebScraper {
    pub fn new() -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            page_slot: Arc::new(Mutex::new(())),
        })
    }

    async fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        let html = self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?;
        Ok(html)
    }
}

impl PageSource for WebScraper {
    type Page = WebPage;

    async fn list_bulletins(&self, list_url: &str) -> Result<Vec<BulletinReference>, ScraperError> {
        log::info!("Fetching bulletin list from {list_url}...");

        let html = self.fetch_html(list_url).await?;
        let posts = parse_bulletin_list(&html, list_url)?;

        log::info!("Found {} bulletins", posts.len());
        Ok(posts)
    }

    async fn open_page(&self, url: &str) -> Result<WebPage, ScraperError> {
        let slot = self.page_slot.clone().lock_owned().await;

        log::debug!("Opening page {url}");
        let html = self.fetch_html(url).await?;

        Ok(WebPage {
            url: url.to_string(),
            paragraphs: parse_bulletin_paragraphs(&html),
            _slot: slot,
        })
    }
}
