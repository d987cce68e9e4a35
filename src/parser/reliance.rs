// Reliance Digital catalog API parsing
use crate::model::{ParserError, RawListing};
use crate::parser::Parser;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    items: Vec<CatalogItem>,
}

#[derive(Debug, Deserialize)]
struct CatalogItem {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(rename = "_custom_json", default)]
    details: Option<ProductDetails>,
}

#[derive(Debug, Deserialize)]
struct ProductDetails {
    name: Option<String>,
    offer_price: Option<Value>,
    average_rating: Option<Value>,
}

pub struct RelianceParser;

impl RelianceParser {
    pub fn new() -> Self {
        Self
    }
}

/// Prices arrive either as JSON numbers or as display strings.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Parser for RelianceParser {
    fn parse(&self, body: &str) -> Result<Vec<RawListing>, ParserError> {
        let response: CatalogResponse = serde_json::from_str(body)?;

        let listings = response
            .items
            .into_iter()
            .filter(|item| item.kind.as_deref() == Some("product"))
            .filter_map(|item| item.details)
            .filter_map(|details| {
                let name = details.name?.trim().to_string();
                if name.is_empty() {
                    return None;
                }
                let price = details
                    .offer_price
                    .as_ref()
                    .and_then(value_text)
                    .unwrap_or_else(|| "N/A".to_string());
                Some(RawListing {
                    title: name,
                    price_text: price,
                    rating_text: details.average_rating.as_ref().and_then(value_text),
                })
            })
            .collect();

        Ok(listings)
    }
}
