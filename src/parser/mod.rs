pub mod html;
pub mod reliance;

use crate::model::{ParserError, Platform, RawListing};

pub use html::HtmlListingParser;
pub use reliance::RelianceParser;

pub trait Parser: Send + Sync {
    fn parse(&self, body: &str) -> Result<Vec<RawListing>, ParserError>;
}

/// Picks the extractor matching the body a platform's fetcher returns.
pub fn parser_for(platform: Platform) -> Box<dyn Parser> {
    match platform {
        Platform::Amazon => Box::new(HtmlListingParser::new(&html::AMAZON_LAYOUT)),
        Platform::Croma => Box::new(HtmlListingParser::new(&html::CROMA_LAYOUT)),
        Platform::Flipkart => Box::new(HtmlListingParser::new(&html::FLIPKART_LAYOUT)),
        Platform::Reliance => Box::new(RelianceParser::new()),
    }
}
