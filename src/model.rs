// Core structs: RawListing, CanonicalListing, Platform and the collaborator errors
use chrono::NaiveDate;
use std::fmt;

/// Storefronts the aggregator knows how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Amazon,
    Croma,
    Flipkart,
    Reliance,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Amazon,
        Platform::Croma,
        Platform::Flipkart,
        Platform::Reliance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Amazon => "Amazon",
            Platform::Croma => "Croma",
            Platform::Flipkart => "Flipkart",
            Platform::Reliance => "Reliance",
        }
    }

    /// Whether search results depend on the delivery pincode.
    /// Flipkart shows the same listing page everywhere, so it is scraped once per product.
    pub fn location_aware(&self) -> bool {
        !matches!(self, Platform::Flipkart)
    }

    pub fn from_name(name: &str) -> Option<Platform> {
        let name = name.trim().to_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.name().to_lowercase() == name)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry as extracted from a search results page, before any cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawListing {
    pub title: String,
    pub price_text: String,
    pub rating_text: Option<String>,
}

impl RawListing {
    pub fn new(title: impl Into<String>, price_text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            price_text: price_text.into(),
            rating_text: None,
        }
    }

    pub fn with_rating(mut self, rating: impl Into<String>) -> Self {
        self.rating_text = Some(rating.into());
        self
    }
}

/// Deduplication identity: the same model in the same storage variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductKey {
    pub model: String,
    pub variant: String,
}

/// Best observed price for one product key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalListing {
    pub title: String,
    pub price: u32,
}

#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub query: String,
    pub city: String,
    pub pincode: String,
}

/// Where and when a batch of listings was collected.
#[derive(Debug, Clone)]
pub struct BatchMeta {
    pub platform: Platform,
    pub scrape_date: NaiveDate,
    pub city: String,
    pub pincode: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected response status")]
    InvalidResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("invalid selector: {0}")]
    Selector(String),
    #[error("malformed catalog json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("api error: {0}")]
    ApiError(String),
    #[error("notification endpoint unreachable")]
    Unreachable,
    #[error("invalid mailbox: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_names_round_trip() {
        for platform in Platform::ALL {
            assert_eq!(Platform::from_name(platform.name()), Some(platform));
        }
        assert_eq!(Platform::from_name("  FLIPKART "), Some(Platform::Flipkart));
        assert_eq!(Platform::from_name("ebay"), None);
    }

    #[test]
    fn only_flipkart_ignores_location() {
        let unaware: Vec<_> = Platform::ALL.into_iter().filter(|p| !p.location_aware()).collect();
        assert_eq!(unaware, vec![Platform::Flipkart]);
    }
}
