use crate::model::{ScrapeRequest, ScraperError};

#[async_trait::async_trait]
pub trait Scraper: Send + Sync {
    /// Returns the raw search results body for one query.
    async fn fetch(&self, req: &ScrapeRequest) -> Result<String, ScraperError>;
}
