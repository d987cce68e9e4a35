use crate::model::{CanonicalListing, Platform, ProductKey, RawListing};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// How a product key is joined back into a display title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleFormat {
    /// `{model} {variant}`
    Space,
    /// `{model}, {variant}`
    Comma,
}

/// Tokens removed from a price string before it is read as an integer.
#[derive(Debug, Clone)]
pub struct PriceFormat {
    pub strip: &'static [&'static str],
    /// Only the first whitespace separated token carries the selling price.
    pub first_token_only: bool,
}

/// Per-storefront rules for turning free-text titles and prices into comparable values.
#[derive(Debug, Clone)]
pub struct ParsePolicy {
    pattern: Regex,
    title_format: TitleFormat,
    price: PriceFormat,
    zero_price_valid: bool,
}

const RUPEE: &[&str] = &["₹", "Rs.", ","];
// Croma pages are sometimes decoded as latin-1, turning the rupee sign into `â‚¹`.
const RUPEE_MOJIBAKE: &[&str] = &["â‚¹", "₹", "Rs.", ","];

static AMAZON: LazyLock<ParsePolicy> = LazyLock::new(|| {
    ParsePolicy::builtin(
        r"(?i)^(?P<model>[^(),]+?)\s*\(?\s*(?P<size>\d+)\s*(?P<unit>GB|TB)\b",
        TitleFormat::Space,
        PriceFormat { strip: RUPEE, first_token_only: false },
        false,
    )
});

static CROMA: LazyLock<ParsePolicy> = LazyLock::new(|| {
    ParsePolicy::builtin(
        r"(?i)^(?P<model>[^()]+?)\s*\(\s*(?P<size>\d+)\s*(?P<unit>GB|TB)\s*,[^)]*\)",
        TitleFormat::Space,
        PriceFormat { strip: RUPEE_MOJIBAKE, first_token_only: true },
        true,
    )
});

static FLIPKART: LazyLock<ParsePolicy> = LazyLock::new(|| {
    ParsePolicy::builtin(
        r"(?i)^(?P<model>[^()]+?)\s*\([^(),]+,\s*(?P<size>\d+)\s*(?P<unit>GB|TB)\s*\)",
        TitleFormat::Comma,
        PriceFormat { strip: RUPEE, first_token_only: true },
        true,
    )
});

static RELIANCE: LazyLock<ParsePolicy> = LazyLock::new(|| {
    ParsePolicy::builtin(
        r"(?i)^(?P<model>[^(),]+?)\s+(?P<size>\d+)\s*(?P<unit>GB|TB)\b",
        TitleFormat::Space,
        PriceFormat { strip: RUPEE, first_token_only: true },
        true,
    )
});

impl ParsePolicy {
    /// Builds a policy from a pattern with `model`, `size` and `unit` named groups.
    pub fn new(
        pattern: &str,
        title_format: TitleFormat,
        price: PriceFormat,
        zero_price_valid: bool,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            title_format,
            price,
            zero_price_valid,
        })
    }

    fn builtin(
        pattern: &str,
        title_format: TitleFormat,
        price: PriceFormat,
        zero_price_valid: bool,
    ) -> Self {
        Self::new(pattern, title_format, price, zero_price_valid)
            .expect("built-in title pattern must compile")
    }

    pub fn for_platform(platform: Platform) -> &'static ParsePolicy {
        match platform {
            Platform::Amazon => &*AMAZON,
            Platform::Croma => &*CROMA,
            Platform::Flipkart => &*FLIPKART,
            Platform::Reliance => &*RELIANCE,
        }
    }

    /// Extracts `(model, variant)` from a listing title, `None` if the title has the wrong shape.
    pub fn parse_title(&self, title: &str) -> Option<ProductKey> {
        let caps = self.pattern.captures(title.trim())?;
        let model = collapse_whitespace(caps.name("model")?.as_str());
        if model.is_empty() {
            return None;
        }
        let size = caps.name("size")?.as_str();
        let unit = caps.name("unit")?.as_str().to_uppercase();

        Some(ProductKey {
            model,
            variant: format!("{} {}", size, unit),
        })
    }

    /// Reads a price as a non-negative whole number of rupees.
    pub fn parse_price(&self, text: &str) -> Option<u32> {
        let mut cleaned = text.to_string();
        for token in self.price.strip {
            cleaned = cleaned.replace(token, "");
        }

        let cleaned = if self.price.first_token_only {
            cleaned.split_whitespace().next()?
        } else {
            cleaned.trim()
        };

        // `79900.00` -> `79900`; anything else after the dot is garbage.
        let whole = match cleaned.split_once('.') {
            Some((whole, fraction)) if fraction.bytes().all(|b| b.is_ascii_digit()) => whole,
            Some(_) => return None,
            None => cleaned,
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let price: u32 = whole.parse().ok()?;
        if price == 0 && !self.zero_price_valid {
            return None;
        }
        Some(price)
    }

    pub fn canonical_title(&self, key: &ProductKey) -> String {
        match self.title_format {
            TitleFormat::Space => format!("{} {}", key.model, key.variant),
            TitleFormat::Comma => format!("{}, {}", key.model, key.variant),
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Counters describing one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub seen: usize,
    pub bad_title: usize,
    pub bad_price: usize,
    pub retained: usize,
}

/// Collapses listings of the same product into one entry carrying the lowest price.
pub fn normalize(raw: &[RawListing], policy: &ParsePolicy) -> Vec<CanonicalListing> {
    normalize_with_stats(raw, policy).0
}

pub fn normalize_with_stats(
    raw: &[RawListing],
    policy: &ParsePolicy,
) -> (Vec<CanonicalListing>, NormalizeStats) {
    let mut stats = NormalizeStats::default();
    let mut best: IndexMap<ProductKey, CanonicalListing> = IndexMap::new();

    for listing in raw {
        stats.seen += 1;

        let Some(key) = policy.parse_title(&listing.title) else {
            stats.bad_title += 1;
            continue;
        };
        let Some(price) = policy.parse_price(&listing.price_text) else {
            stats.bad_price += 1;
            continue;
        };

        match best.get_mut(&key) {
            // Equal prices keep the first title seen.
            Some(current) if price < current.price => {
                current.price = price;
                current.title = policy.canonical_title(&key);
            }
            Some(_) => {}
            None => {
                let title = policy.canonical_title(&key);
                best.insert(key, CanonicalListing { title, price });
            }
        }
    }

    let listings: Vec<CanonicalListing> = best.into_values().collect();
    stats.retained = listings.len();
    debug!(
        seen = stats.seen,
        bad_title = stats.bad_title,
        bad_price = stats.bad_price,
        retained = stats.retained,
        "normalized listings"
    );

    (listings, stats)
}
