//! Price extraction from product page HTML.
//!
//! Two strategies, tried in order: schema.org `Product` JSON-LD blocks,
//! then OpenGraph meta tags. Scraping semi-structured markup is brittle,
//! so everything lives behind [`extract`] and the strategies can change
//! without touching the rest of the pipeline.

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::ExtractError;
use crate::models::PriceRecord;

/// Challenge-page markers for the site's bot-protection vendor. The
/// fetcher's retry decision and the extractor's `BotBlocked`
/// classification both key off this list.
const BOT_MARKERS: [&str; 2] = ["PerimeterX", "px-captcha"];

/// True when the body is the protection vendor's challenge page rather
/// than real content.
pub fn is_bot_blocked(html: &str) -> bool {
    BOT_MARKERS.iter().any(|marker| html.contains(marker))
}

/// Trailing `-12345.html` product id in a page URL, the site's SKU.
pub fn sku_from_url(url: &str) -> Option<String> {
    let re = Regex::new(r"-(\d+)\.html$").expect("valid regex");
    re.captures(url).map(|caps| caps[1].to_string())
}

/// Pull a normalized price record out of a product page.
///
/// The bot-protection check runs before any parsing: a challenge page can
/// contain arbitrary markup and must never be mistaken for real content.
pub fn extract(html: &str, source_url: &str) -> Result<PriceRecord, ExtractError> {
    if is_bot_blocked(html) {
        return Err(ExtractError::BotBlocked);
    }

    let document = Html::parse_document(html);

    if let Some(record) = extract_json_ld(&document) {
        return Ok(record);
    }
    if let Some(record) = extract_open_graph(&document, source_url) {
        return Ok(record);
    }
    Err(ExtractError::Unparseable)
}

/// Strategy 1: schema.org JSON-LD.
///
/// Takes the first candidate whose `@type` is `"Product"` and whose offer
/// price coerces to a number. Malformed blocks, non-Product entities and
/// bad prices skip the candidate, never fail the extraction.
fn extract_json_ld(document: &Html) -> Option<PriceRecord> {
    let selector =
        Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector");

    for script in document.select(&selector) {
        let text: String = script.text().collect();
        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(_) => continue,
        };

        // A block may hold a single entity or a top-level array of them.
        let candidates: Vec<&Value> = match &value {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        for item in candidates {
            if item.get("@type").and_then(Value::as_str) != Some("Product") {
                continue;
            }

            // `offers` is an object for single-offer products, an array
            // for variants; take the first either way.
            let offer = match item.get("offers") {
                Some(Value::Array(offers)) => offers.first(),
                other => other,
            };
            let Some(price) = offer.and_then(|o| o.get("price")).and_then(coerce_price) else {
                continue;
            };
            let availability = offer
                .and_then(|o| o.get("availability"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            return Some(PriceRecord {
                name: item.get("name").and_then(Value::as_str).map(str::to_string),
                sku: item.get("sku").and_then(coerce_string),
                price,
                availability,
            });
        }
    }

    None
}

/// Strategy 2: OpenGraph meta tags. Availability is unknowable here and
/// the SKU has to come from the URL.
fn extract_open_graph(document: &Html, source_url: &str) -> Option<PriceRecord> {
    let price_selector =
        Selector::parse(r#"meta[property="og:price:amount"]"#).expect("valid selector");
    let title_selector = Selector::parse(r#"meta[property="og:title"]"#).expect("valid selector");

    let price = document
        .select(&price_selector)
        .filter_map(|el| el.value().attr("content"))
        .find_map(|content| content.trim().parse::<f64>().ok())?;

    let name = document
        .select(&title_selector)
        .filter_map(|el| el.value().attr("content"))
        .next()
        .unwrap_or("Unknown")
        .to_string();

    Some(PriceRecord {
        name: Some(name),
        sku: sku_from_url(source_url),
        price,
        availability: "unknown".to_string(),
    })
}

/// Offer prices appear as JSON numbers or numeric strings in the wild.
fn coerce_price(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// SKUs are usually strings but some pages embed them as bare numbers.
fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.example-tools.com/digital-caliper-63586.html";

    fn page(head: &str) -> String {
        format!("<!DOCTYPE html><html><head>{head}</head><body><h1>item</h1></body></html>")
    }

    #[test]
    fn parses_json_ld_product() {
        let html = page(
            r#"<script type="application/ld+json">
            {"@context":"https://schema.org","@type":"Product","name":"6 in. Digital Caliper",
             "sku":"63586","offers":{"@type":"Offer","price":"22.99",
             "availability":"https://schema.org/InStock"}}
            </script>"#,
        );

        let record = extract(&html, URL).unwrap();
        assert_eq!(record.name.as_deref(), Some("6 in. Digital Caliper"));
        assert_eq!(record.sku.as_deref(), Some("63586"));
        assert_eq!(record.price, 22.99);
        assert_eq!(record.availability, "https://schema.org/InStock");
    }

    #[test]
    fn skips_malformed_and_non_product_blocks() {
        let html = page(
            r#"<script type="application/ld+json">{not json at all</script>
            <script type="application/ld+json">{"@type":"BreadcrumbList","itemListElement":[]}</script>
            <script type="application/ld+json">{"@type":"Product","name":"Widget","offers":{"price":19.5}}</script>"#,
        );

        let record = extract(&html, URL).unwrap();
        assert_eq!(record.name.as_deref(), Some("Widget"));
        assert_eq!(record.price, 19.5);
        assert_eq!(record.availability, "");
    }

    #[test]
    fn skips_candidate_with_unparseable_price() {
        let html = page(
            r#"<script type="application/ld+json">{"@type":"Product","name":"Broken","offers":{"price":"call us"}}</script>
            <script type="application/ld+json">{"@type":"Product","name":"Good","offers":{"price":"42.00"}}</script>"#,
        );

        let record = extract(&html, URL).unwrap();
        assert_eq!(record.name.as_deref(), Some("Good"));
        assert_eq!(record.price, 42.0);
    }

    #[test]
    fn accepts_product_inside_top_level_array() {
        let html = page(
            r#"<script type="application/ld+json">
            [{"@type":"WebSite","name":"shop"},
             {"@type":"Product","name":"Array Item","sku":12345,"offers":[{"price":9.99}]}]
            </script>"#,
        );

        let record = extract(&html, URL).unwrap();
        assert_eq!(record.name.as_deref(), Some("Array Item"));
        assert_eq!(record.sku.as_deref(), Some("12345"));
        assert_eq!(record.price, 9.99);
    }

    #[test]
    fn falls_back_to_open_graph_tags() {
        let html = page(
            r#"<meta property="og:title" content="Backup Camera"/>
            <meta property="og:price:amount" content="24.99"/>"#,
        );

        let record = extract(&html, URL).unwrap();
        assert_eq!(record.name.as_deref(), Some("Backup Camera"));
        assert_eq!(record.sku.as_deref(), Some("63586"));
        assert_eq!(record.price, 24.99);
        assert_eq!(record.availability, "unknown");
    }

    #[test]
    fn open_graph_without_title_uses_unknown() {
        let html = page(r#"<meta property="og:price:amount" content="5.00"/>"#);

        let record = extract(&html, "https://www.example-tools.com/page").unwrap();
        assert_eq!(record.name.as_deref(), Some("Unknown"));
        assert_eq!(record.sku, None);
        assert_eq!(record.price, 5.0);
    }

    #[test]
    fn bot_marker_wins_over_valid_product_data() {
        let html = page(
            r#"<script src="/px-captcha/challenge.js"></script>
            <script type="application/ld+json">{"@type":"Product","name":"Decoy","offers":{"price":"1.00"}}</script>"#,
        );

        assert_eq!(extract(&html, URL), Err(ExtractError::BotBlocked));
    }

    #[test]
    fn unparseable_when_no_strategy_yields_a_price() {
        let html = page(r#"<meta property="og:title" content="No price here"/>"#);

        assert_eq!(extract(&html, URL), Err(ExtractError::Unparseable));
    }

    #[test]
    fn derives_sku_from_trailing_numeric_segment() {
        assert_eq!(
            sku_from_url("https://shop.test/widget-12345.html").as_deref(),
            Some("12345")
        );
        assert_eq!(sku_from_url("https://shop.test/widget-12345.html?ref=x"), None);
        assert_eq!(sku_from_url("https://shop.test/widget.html"), None);
        assert_eq!(sku_from_url("https://shop.test/widget-abc.html"), None);
    }

    #[test]
    fn recognizes_both_protection_markers() {
        assert!(is_bot_blocked("<html>PerimeterX challenge</html>"));
        assert!(is_bot_blocked(r#"<div id="px-captcha"></div>"#));
        assert!(!is_bot_blocked("<html>ordinary page</html>"));
    }
}
