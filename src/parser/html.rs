// Storefront search-result HTML parsing
use crate::model::{ParserError, RawListing};
use crate::parser::Parser;
use scraper::{ElementRef, Html, Selector};

/// CSS selectors describing one product card on a search results page.
pub struct CardLayout {
    pub card: &'static str,
    pub title: &'static str,
    pub price: &'static str,
    pub rating: &'static str,
    /// Cards carrying a "Sponsored" label are ads and are skipped.
    pub skip_sponsored: bool,
}

pub const AMAZON_LAYOUT: CardLayout = CardLayout {
    card: r#"div[data-component-type="s-search-result"]"#,
    title: "h2",
    price: "span.a-price-whole",
    rating: "span.a-icon-alt",
    skip_sponsored: true,
};

pub const CROMA_LAYOUT: CardLayout = CardLayout {
    card: "div.cp-product",
    title: "h3.product-title",
    price: "div.new-price",
    rating: "span.rating-text",
    skip_sponsored: false,
};

pub const FLIPKART_LAYOUT: CardLayout = CardLayout {
    card: "div._75nlfW",
    title: "div.KzDlHZ",
    price: "div.Nx9bqj",
    rating: "div.XQDdHH",
    skip_sponsored: false,
};

const MISSING: &str = "N/A";

pub struct HtmlListingParser {
    layout: &'static CardLayout,
}

impl HtmlListingParser {
    pub fn new(layout: &'static CardLayout) -> Self {
        Self { layout }
    }
}

fn selector(css: &str) -> Result<Selector, ParserError> {
    Selector::parse(css).map_err(|e| ParserError::Selector(format!("{}: {}", css, e)))
}

fn first_text(card: &ElementRef, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(|node| node.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// An ad label is a span reading "Sponsored" that sits outside the title.
fn is_sponsored(card: &ElementRef, label: &Selector, title: Option<&ElementRef>) -> bool {
    card.select(label).any(|span| {
        span.text().collect::<String>().trim() == "Sponsored"
            && !title.is_some_and(|t| span.ancestors().any(|node| node.id() == (**t).id()))
    })
}

impl Parser for HtmlListingParser {
    fn parse(&self, body: &str) -> Result<Vec<RawListing>, ParserError> {
        let document = Html::parse_document(body);

        let card_selector = selector(self.layout.card)?;
        let title_selector = selector(self.layout.title)?;
        let price_selector = selector(self.layout.price)?;
        let rating_selector = selector(self.layout.rating)?;
        let label_selector = selector("span")?;

        let mut listings = Vec::new();

        for card in document.select(&card_selector) {
            let title_node = card.select(&title_selector).next();
            if self.layout.skip_sponsored && is_sponsored(&card, &label_selector, title_node.as_ref()) {
                continue;
            }

            let Some(title) = first_text(&card, &title_selector) else {
                continue;
            };
            let price = first_text(&card, &price_selector).unwrap_or_else(|| MISSING.to_string());

            let listing = RawListing::new(title, price);
            listings.push(match first_text(&card, &rating_selector) {
                Some(rating) => listing.with_rating(rating),
                None => listing,
            });
        }

        Ok(listings)
    }
}
