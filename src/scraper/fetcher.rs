use crate::config::{DelayRange, ExecutionMode};
use crate::model::{Platform, ScrapeRequest, ScraperError};
use crate::scraper::traits::Scraper;

use rand::Rng;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub struct HttpScraper {
    client: Client,
    platform: Platform,
    delay: DelayRange,
}

impl HttpScraper {
    /// Builds the shared client. A workstation on a home line gets a longer timeout than a server.
    pub fn new(platform: Platform, mode: ExecutionMode, delay: DelayRange) -> Result<Self, ScraperError> {
        let timeout = match mode {
            ExecutionMode::Local => Duration::from_secs(30),
            ExecutionMode::Server => Duration::from_secs(15),
        };
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, platform, delay })
    }

    /// Same client, different storefront.
    pub fn for_platform(&self, platform: Platform) -> Self {
        Self {
            client: self.client.clone(),
            platform,
            delay: self.delay,
        }
    }

    fn build_request(&self, req: &ScrapeRequest) -> RequestBuilder {
        let query = req.query.trim();
        match self.platform {
            Platform::Amazon => self
                .client
                .get("https://www.amazon.in/s")
                .query(&[("k", query)]),
            Platform::Flipkart => self
                .client
                .get("https://www.flipkart.com/search")
                .query(&[("q", query)]),
            Platform::Croma => self
                .client
                .get("https://www.croma.com/searchB")
                .query(&[("text", query)]),
            Platform::Reliance => self
                .client
                .get("https://www.reliancedigital.in/ext/raven-api/catalog/v1.0/products")
                .query(&[("page_id", "1"), ("page_size", "100"), ("q", query)]),
        }
    }

    fn jitter(&self) -> Duration {
        if self.delay.max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(self.delay.min..=self.delay.max))
    }
}

fn map_reqwest(e: reqwest::Error) -> ScraperError {
    if e.is_timeout() {
        ScraperError::Timeout
    } else {
        ScraperError::HttpError(e)
    }
}

#[async_trait::async_trait]
impl Scraper for HttpScraper {
    async fn fetch(&self, req: &ScrapeRequest) -> Result<String, ScraperError> {
        let wait = self.jitter();
        debug!("{}: waiting {:?} before request", self.platform, wait);
        sleep(wait).await;

        let request = self.build_request(req).build().map_err(map_reqwest)?;
        info!(
            "{}: fetching {} (pincode {})",
            self.platform,
            request.url(),
            req.pincode
        );

        let response = self.client.execute(request).await.map_err(map_reqwest)?;
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest)?;

        if !status.is_success() {
            debug!("{}: status {}", self.platform, status);
            return Err(ScraperError::InvalidResponse(body));
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraper(platform: Platform) -> HttpScraper {
        HttpScraper::new(platform, ExecutionMode::Server, DelayRange { min: 0, max: 0 }).unwrap()
    }

    fn request(query: &str) -> ScrapeRequest {
        ScrapeRequest {
            query: query.to_string(),
            city: "Lucknow".to_string(),
            pincode: "226030".to_string(),
        }
    }

    #[test]
    fn builds_search_urls_per_platform() {
        let base = scraper(Platform::Amazon);
        let url = |platform| {
            base.for_platform(platform)
                .build_request(&request(" iPhone 16 128 GB "))
                .build()
                .unwrap()
                .url()
                .to_string()
        };

        assert_eq!(url(Platform::Amazon), "https://www.amazon.in/s?k=iPhone+16+128+GB");
        assert_eq!(url(Platform::Flipkart), "https://www.flipkart.com/search?q=iPhone+16+128+GB");
        assert_eq!(url(Platform::Croma), "https://www.croma.com/searchB?text=iPhone+16+128+GB");
        assert_eq!(
            url(Platform::Reliance),
            "https://www.reliancedigital.in/ext/raven-api/catalog/v1.0/products?page_id=1&page_size=100&q=iPhone+16+128+GB"
        );
    }

    #[test]
    fn jitter_stays_inside_range() {
        let s = HttpScraper::new(Platform::Croma, ExecutionMode::Local, DelayRange { min: 10, max: 20 }).unwrap();
        for _ in 0..50 {
            let wait = s.jitter();
            assert!(wait >= Duration::from_millis(10) && wait <= Duration::from_millis(20));
        }
        assert_eq!(scraper(Platform::Croma).jitter(), Duration::ZERO);
    }
}
