use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use scraper::{ElementRef, Html, Selector};

use crate::{crawler::Located, util::text};

/// Strict equity-price shape, e.g. "201.18". Integer-only or penny-range
/// matches are far more likely to be counts or percentages than a price.
static PRICE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,4}\.\d{2}$").expect("price pattern regex"));

static QSP_PRICE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"span[data-testid="qsp-price"]"#).expect("qsp-price selector")
});

static MARKET_PRICE_STREAMER: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"fin-streamer[data-field="regularMarketPrice"]"#)
        .expect("fin-streamer selector")
});

static QUOTE_PRICE_SECTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"section[data-testid="quote-price"]"#).expect("quote-price selector")
});

static QUOTE_HEADER: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[data-testid="quote-header"], section[data-testid="quote-hdr"]"#)
        .expect("quote-header selector")
});

static SPAN: Lazy<Selector> = Lazy::new(|| Selector::parse("span").expect("span selector"));

static SPAN_OR_DIV: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span, div").expect("span/div selector"));

/// Keywords a price-bearing parent element carries in its id/class.
const PRICE_PARENT_KEYWORDS: &[&str] = &["price", "quote", "market"];

type PriceLocator = fn(&Html) -> Located<Decimal>;

/// Runs the current-price locator chain in priority order, stopping at the
/// first strategy that yields a plausible value.
pub fn extract_current_price(document: &Html) -> Option<Decimal> {
    let locators: Vec<PriceLocator> = vec![
        price_from_qsp_tag,
        price_from_streamer,
        price_from_quote_price_section,
        price_from_quote_header,
        price_from_document_scan,
    ];

    for locate in locators {
        if let Located::Found(price) = locate(document) {
            return Some(price);
        }
    }

    None
}

/// Strategy 1: the dedicated qsp-price element.
fn price_from_qsp_tag(document: &Html) -> Located<Decimal> {
    let element = match document.select(&QSP_PRICE).next() {
        Some(element) => element,
        None => return Located::NotFound,
    };

    match text::normalize_numeric(&element_text(element)) {
        Some(price) if price > dec!(0) => Located::Found(price),
        _ => Located::Ignored,
    }
}

/// Strategy 2: live-quote streaming elements, preferring the value attribute
/// over displayed text.
fn price_from_streamer(document: &Html) -> Located<Decimal> {
    let mut seen = false;

    for element in document.select(&MARKET_PRICE_STREAMER) {
        seen = true;
        let raw = match element.value().attr("value") {
            Some(value) if !value.trim().is_empty() => value.to_string(),
            _ => element_text(element),
        };

        if let Some(price) = text::normalize_numeric(&raw) {
            if price > dec!(0) {
                return Located::Found(price);
            }
        }
    }

    if seen {
        Located::Ignored
    } else {
        Located::NotFound
    }
}

/// Strategy 3: spans with a price-hinting class inside the quote-price
/// container, matched against the strict price pattern.
fn price_from_quote_price_section(document: &Html) -> Located<Decimal> {
    let section = match document.select(&QUOTE_PRICE_SECTION).next() {
        Some(section) => section,
        None => return Located::NotFound,
    };

    for span in section.select(&SPAN) {
        let class = span.value().attr("class").unwrap_or("").to_lowercase();
        if !class.contains("price") && !class.contains("qsp") {
            continue;
        }

        if let Located::Found(price) = strict_price(&element_text(span)) {
            return Located::Found(price);
        }
    }

    Located::Ignored
}

/// Strategy 4: every span inside the quote header, strict pattern only.
fn price_from_quote_header(document: &Html) -> Located<Decimal> {
    let header = match document.select(&QUOTE_HEADER).next() {
        Some(header) => header,
        None => return Located::NotFound,
    };

    for span in header.select(&SPAN) {
        if let Located::Found(price) = strict_price(&element_text(span)) {
            return Located::Found(price);
        }
    }

    Located::Ignored
}

/// Strategy 5, global fallback: any span/div whose text matches the strict
/// pattern, accepted only when the parent's id/class hints at a quote value.
/// The parent guard keeps dates and volumes that happen to look like prices
/// from slipping through.
fn price_from_document_scan(document: &Html) -> Located<Decimal> {
    for element in document.select(&SPAN_OR_DIV) {
        let price = match strict_price(&element_text(element)) {
            Located::Found(price) => price,
            _ => continue,
        };

        if parent_hints_at_price(element) {
            return Located::Found(price);
        }
    }

    Located::NotFound
}

fn parent_hints_at_price(element: ElementRef<'_>) -> bool {
    let parent = match element.parent().and_then(ElementRef::wrap) {
        Some(parent) => parent,
        None => return false,
    };

    let attrs = format!(
        "{} {}",
        parent.value().attr("data-testid").unwrap_or(""),
        parent.value().attr("class").unwrap_or("")
    )
    .to_lowercase();

    PRICE_PARENT_KEYWORDS
        .iter()
        .any(|keyword| attrs.contains(keyword))
}

/// Accepts only strict-pattern text that normalizes above the 1.0 threshold.
fn strict_price(raw: &str) -> Located<Decimal> {
    let trimmed = raw.trim();
    if !PRICE_PATTERN.is_match(trimmed) {
        return Located::NotFound;
    }

    match text::normalize_numeric(trimmed) {
        Some(price) if price > dec!(1) => Located::Found(price),
        _ => Located::Ignored,
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qsp_tag_wins_without_fallthrough() {
        let html = r#"
            <html><body>
                <span data-testid="qsp-price">201.18</span>
                <fin-streamer data-field="regularMarketPrice" value="999.99"></fin-streamer>
            </body></html>"#;
        let document = Html::parse_document(html);

        assert_eq!(price_from_qsp_tag(&document), Located::Found(dec!(201.18)));
        assert_eq!(extract_current_price(&document), Some(dec!(201.18)));
    }

    #[test]
    fn test_streamer_prefers_value_attribute() {
        let html = r#"
            <html><body>
                <fin-streamer data-field="regularMarketPrice" value="45.67">45.70</fin-streamer>
            </body></html>"#;
        let document = Html::parse_document(html);

        assert_eq!(extract_current_price(&document), Some(dec!(45.67)));
    }

    #[test]
    fn test_streamer_falls_back_to_text() {
        let html = r#"
            <html><body>
                <fin-streamer data-field="regularMarketPrice">45.70</fin-streamer>
            </body></html>"#;
        let document = Html::parse_document(html);

        assert_eq!(extract_current_price(&document), Some(dec!(45.70)));
    }

    #[test]
    fn test_quote_price_section_strict_pattern() {
        let html = r#"
            <html><body>
                <section data-testid="quote-price">
                    <span class="volume">12345</span>
                    <span class="qsp-value">88.25</span>
                </section>
            </body></html>"#;
        let document = Html::parse_document(html);

        assert_eq!(
            price_from_quote_price_section(&document),
            Located::Found(dec!(88.25))
        );
    }

    #[test]
    fn test_quote_header_scan() {
        let html = r#"
            <html><body>
                <div data-testid="quote-header">
                    <span>Apple Inc. (AAPL)</span>
                    <span>173.50</span>
                </div>
            </body></html>"#;
        let document = Html::parse_document(html);

        assert_eq!(extract_current_price(&document), Some(dec!(173.50)));
    }

    #[test]
    fn test_global_scan_requires_parent_hint() {
        // Same shape of number, but the parent carries no quote keyword.
        let html = r#"
            <html><body>
                <div class="footer-stats"><span>12.34</span></div>
            </body></html>"#;
        let document = Html::parse_document(html);
        assert_eq!(extract_current_price(&document), None);

        let html = r#"
            <html><body>
                <div class="market-summary"><span>12.34</span></div>
            </body></html>"#;
        let document = Html::parse_document(html);
        assert_eq!(extract_current_price(&document), Some(dec!(12.34)));
    }

    #[test]
    fn test_penny_values_rejected_by_threshold() {
        let html = r#"
            <html><body>
                <div class="price-box"><span>0.42</span></div>
            </body></html>"#;
        let document = Html::parse_document(html);

        assert_eq!(extract_current_price(&document), None);
    }

    #[test]
    fn test_strict_price_shapes() {
        assert_eq!(strict_price("201.18"), Located::Found(dec!(201.18)));
        assert_eq!(strict_price("1234.56"), Located::Found(dec!(1234.56)));
        assert_eq!(strict_price("12345.67"), Located::NotFound);
        assert_eq!(strict_price("201"), Located::NotFound);
        assert_eq!(strict_price("201.1"), Located::NotFound);
        assert_eq!(strict_price("0.99"), Located::Ignored);
    }
}
