use crate::config::{AppConfig, LocationConfig};
use crate::model::{BatchMeta, CanonicalListing, Platform, ScrapeRequest, ScraperError};
use crate::normalizer::{ParsePolicy, normalize};
use crate::notifier::Notifier;
use crate::parser::parser_for;
use crate::scraper::Scraper;
use crate::storage::SqliteStorage;
use crate::utils::save_debug_body;
use chrono::NaiveDate;
use futures::future::join_all;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Shared collaborators for one run.
pub struct Pipeline {
    pub storage: Arc<Mutex<SqliteStorage>>,
    pub notifier: Arc<dyn Notifier>,
    pub scrapers: HashMap<Platform, Box<dyn Scraper>>,
    pub debug_dir: PathBuf,
}

/// What happened to one platform for one product and location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformOutcome {
    pub fetched: usize,
    pub retained: usize,
    pub stored: usize,
}

impl Pipeline {
    /// Fetch, extract, deduplicate, store, notify. Failures are logged and end
    /// this platform's turn only.
    pub async fn process_platform(
        &self,
        platform: Platform,
        request: &ScrapeRequest,
        date: NaiveDate,
    ) -> PlatformOutcome {
        let mut outcome = PlatformOutcome::default();

        let Some(scraper) = self.scrapers.get(&platform) else {
            warn!("No scraper registered for {}", platform);
            return outcome;
        };

        info!(
            "---Processing product {} for pincode {} for platform {}---",
            request.query, request.pincode, platform
        );

        let body = match scraper.fetch(request).await {
            Ok(body) => body,
            Err(ScraperError::InvalidResponse(body)) => {
                warn!("{}: search page was rejected", platform);
                save_debug_body(&self.debug_dir, platform, &request.query, &body);
                return outcome;
            }
            Err(e) => {
                warn!("{}: scraper error: {}", platform, e);
                return outcome;
            }
        };

        let raw = match parser_for(platform).parse(&body) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("{}: parse error: {}", platform, e);
                save_debug_body(&self.debug_dir, platform, &request.query, &body);
                return outcome;
            }
        };
        outcome.fetched = raw.len();
        debug!(
            "{}: {} of {} listings carry a rating",
            platform,
            raw.iter().filter(|l| l.rating_text.is_some()).count(),
            raw.len()
        );

        let listings = normalize(&raw, ParsePolicy::for_platform(platform));
        outcome.retained = listings.len();
        info!(
            "{}: {} listings scraped, {} kept after dedup",
            platform,
            raw.len(),
            listings.len()
        );

        if listings.is_empty() {
            warn!("No data to process for platform: {}", platform);
            return outcome;
        }

        let meta = BatchMeta {
            platform,
            scrape_date: date,
            city: request.city.clone(),
            pincode: request.pincode.clone(),
        };

        outcome.stored = match self.storage.lock().await.save_listings(&listings, &meta) {
            Ok(stored) => stored,
            Err(e) => {
                error!("Failed to process data for platform {}: {}", platform, e);
                return outcome;
            }
        };
        info!("Data for platform {} processed successfully.", platform);

        // Stored rows stay stored whether or not the message goes out.
        let subject = format!("Data processed--{}--", platform);
        let body = summary(&meta, &request.query, &listings, outcome.stored);
        if let Err(e) = self.notifier.notify(&subject, &body).await {
            warn!("Notification for {} failed: {}", platform, e);
        }

        outcome
    }

    /// Runs every selected platform for every product and location.
    /// Platforms that ignore the delivery pincode run only for the first location.
    pub async fn run_cycle(
        &self,
        config: &AppConfig,
        platforms: &[Platform],
        date: NaiveDate,
    ) -> HashMap<Platform, PlatformOutcome> {
        let mut totals: HashMap<Platform, PlatformOutcome> = HashMap::new();

        for product in config.products.iter().filter(|p| !p.trim().is_empty()) {
            for (index, location) in config.locations.iter().enumerate() {
                let request = scrape_request(product, location);

                let tasks: Vec<_> = platforms
                    .iter()
                    .copied()
                    .filter(|p| p.location_aware() || index == 0)
                    .map(|platform| {
                        let request = &request;
                        async move { (platform, self.process_platform(platform, request, date).await) }
                    })
                    .collect();

                for (platform, outcome) in join_all(tasks).await {
                    let total = totals.entry(platform).or_default();
                    total.fetched += outcome.fetched;
                    total.retained += outcome.retained;
                    total.stored += outcome.stored;
                }
            }
        }

        for (platform, total) in &totals {
            info!(
                "{}: {} scraped, {} unique, {} new rows",
                platform, total.fetched, total.retained, total.stored
            );
        }
        self.report_cheapest(config, platforms, date).await;
        info!("Finished processing all platforms.");
        totals
    }

    /// Logs the cheapest stored row per platform and location for the day.
    async fn report_cheapest(&self, config: &AppConfig, platforms: &[Platform], date: NaiveDate) {
        let storage = self.storage.lock().await;
        for &platform in platforms {
            for location in &config.locations {
                match storage.listings_for(platform, date, &location.city, location.pincode.trim()) {
                    Ok(rows) => {
                        if let Some(row) = rows.first() {
                            info!(
                                "💰 [cheapest] {} {} ({}) on {}: {} at ₹{}",
                                row.platform, row.city, row.pincode, row.scrape_date, row.title, row.price
                            );
                        }
                    }
                    Err(e) => warn!("❌ [cheapest] Failed to read {} rows: {}", platform, e),
                }
            }
        }
    }
}

fn scrape_request(product: &str, location: &LocationConfig) -> ScrapeRequest {
    ScrapeRequest {
        query: product.trim().to_string(),
        city: location.city.clone(),
        pincode: location.pincode.trim().to_string(),
    }
}

fn summary(meta: &BatchMeta, query: &str, listings: &[CanonicalListing], stored: usize) -> String {
    let mut body = format!(
        "Data for platform {} has been processed successfully.\n\
         Product: {}\nLocation: {} ({})\nDate: {}\nUnique listings: {}\nNew rows: {}",
        meta.platform,
        query,
        meta.city,
        meta.pincode,
        meta.scrape_date,
        listings.len(),
        stored
    );
    if let Some(cheapest) = listings.iter().min_by_key(|l| l.price) {
        body.push_str(&format!("\nCheapest: {} at ₹{}", cheapest.title, cheapest.price));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NotifyError;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedScraper {
        body: Result<String, ()>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Scraper for FixedScraper {
        async fn fetch(&self, _req: &ScrapeRequest) -> Result<String, ScraperError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.body {
                Ok(body) => Ok(body.clone()),
                Err(()) => Err(ScraperError::Timeout),
            }
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        fail: bool,
        sent: StdMutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push((subject.to_string(), body.to_string()));
            if self.fail { Err(NotifyError::Unreachable) } else { Ok(()) }
        }
    }

    const AMAZON_PAGE: &str = r#"
        <div data-component-type="s-search-result"><h2>iPhone 16 128 GB</h2><span class="a-price-whole">79,900</span></div>
        <div data-component-type="s-search-result"><h2>iPhone 16 128 GB</h2><span class="a-price-whole">75,999</span></div>
        <div data-component-type="s-search-result"><h2>iPhone 16 256 GB</h2><span class="a-price-whole">0</span></div>
    "#;

    const FLIPKART_PAGE: &str = r#"
        <div class="_75nlfW"><div class="KzDlHZ">Apple iPhone 16 (Black, 128 GB)</div><div class="Nx9bqj _4b5DiR">₹79,900</div></div>
    "#;

    fn config() -> AppConfig {
        AppConfig::from_json(
            r#"{
                "products": ["iPhone 16"],
                "locations": [
                    {"city": "Lucknow", "pincode": "226030"},
                    {"city": "Mumbai", "pincode": "400001"}
                ]
            }"#,
        )
        .unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn pipeline(
        scrapers: Vec<(Platform, Result<&str, ()>, Arc<AtomicUsize>)>,
        notifier: Arc<RecordingNotifier>,
    ) -> Pipeline {
        Pipeline {
            storage: Arc::new(Mutex::new(SqliteStorage::open_in_memory().unwrap())),
            notifier,
            scrapers: scrapers
                .into_iter()
                .map(|(platform, body, calls)| {
                    let scraper: Box<dyn Scraper> = Box::new(FixedScraper {
                        body: body.map(str::to_string),
                        calls,
                    });
                    (platform, scraper)
                })
                .collect(),
            debug_dir: std::env::temp_dir().join("price-aggregator-test"),
        }
    }

    #[tokio::test]
    async fn flipkart_runs_once_per_product_while_amazon_runs_per_location() {
        let amazon_calls = Arc::new(AtomicUsize::new(0));
        let flipkart_calls = Arc::new(AtomicUsize::new(0));
        let notifier = Arc::new(RecordingNotifier::default());
        let p = pipeline(
            vec![
                (Platform::Amazon, Ok(AMAZON_PAGE), amazon_calls.clone()),
                (Platform::Flipkart, Ok(FLIPKART_PAGE), flipkart_calls.clone()),
            ],
            notifier.clone(),
        );

        let totals = p
            .run_cycle(&config(), &[Platform::Amazon, Platform::Flipkart], date())
            .await;

        assert_eq!(amazon_calls.load(Ordering::SeqCst), 2);
        assert_eq!(flipkart_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            totals[&Platform::Amazon],
            PlatformOutcome { fetched: 6, retained: 2, stored: 2 }
        );
        assert_eq!(totals[&Platform::Flipkart].stored, 1);

        let storage = p.storage.lock().await;
        let lucknow = storage.listings_for(Platform::Amazon, date(), "Lucknow", "226030").unwrap();
        assert_eq!(lucknow.len(), 1);
        assert_eq!(lucknow[0].title, "iPhone 16 128 GB");
        assert_eq!(lucknow[0].price, 75999);
        assert_eq!(notifier.sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn notification_failure_keeps_stored_rows() {
        let notifier = Arc::new(RecordingNotifier { fail: true, ..Default::default() });
        let p = pipeline(
            vec![(Platform::Amazon, Ok(AMAZON_PAGE), Arc::new(AtomicUsize::new(0)))],
            notifier.clone(),
        );
        let request = scrape_request("iPhone 16", &config().locations[0]);

        let outcome = p.process_platform(Platform::Amazon, &request, date()).await;

        assert_eq!(outcome.stored, 1);
        assert_eq!(p.storage.lock().await.count().unwrap(), 1);
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent[0].0, "Data processed--Amazon--");
        assert!(sent[0].1.contains("Cheapest: iPhone 16 128 GB at ₹75999"));
    }

    #[tokio::test]
    async fn failing_platform_does_not_block_others() {
        let notifier = Arc::new(RecordingNotifier::default());
        let p = pipeline(
            vec![
                (Platform::Amazon, Ok(AMAZON_PAGE), Arc::new(AtomicUsize::new(0))),
                (Platform::Croma, Err(()), Arc::new(AtomicUsize::new(0))),
            ],
            notifier.clone(),
        );

        let totals = p
            .run_cycle(&config(), &[Platform::Amazon, Platform::Croma], date())
            .await;

        assert_eq!(totals[&Platform::Croma], PlatformOutcome::default());
        assert_eq!(totals[&Platform::Amazon].stored, 2);
    }

    #[tokio::test]
    async fn rerunning_the_same_day_adds_nothing_and_skips_empty_batches() {
        let notifier = Arc::new(RecordingNotifier::default());
        let p = pipeline(
            vec![
                (Platform::Amazon, Ok(AMAZON_PAGE), Arc::new(AtomicUsize::new(0))),
                (Platform::Reliance, Ok(r#"{"items": []}"#), Arc::new(AtomicUsize::new(0))),
            ],
            notifier.clone(),
        );
        let request = scrape_request("iPhone 16", &config().locations[0]);

        assert_eq!(p.process_platform(Platform::Amazon, &request, date()).await.stored, 1);
        assert_eq!(p.process_platform(Platform::Amazon, &request, date()).await.stored, 0);
        assert_eq!(
            p.process_platform(Platform::Reliance, &request, date()).await,
            PlatformOutcome::default()
        );
        // Empty batches are not announced.
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
    }
}
