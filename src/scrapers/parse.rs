//! Turning rendered widget and search-page HTML into rows.

use crate::error::ScoutError;
use crate::models::{AvailabilityRow, Listing};
use crate::scrapers::types::RESULT_CARD_CSS;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, warn};
use url::Url;

static RE_UNIT_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\((\d+)\)").expect("invalid regex: unit count"));

static SEL_CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(RESULT_CARD_CSS).expect("invalid selector: card"));
static SEL_TILE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.floorplan-tile").expect("invalid selector: tile"));
static SEL_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.name").expect("invalid selector: name"));
static SEL_SPECS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.specs").expect("invalid selector: specs"));
static SEL_RANGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.range").expect("invalid selector: range"));
static SEL_BUTTON: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.tile-buttons > button").expect("invalid selector: tile button")
});

/// Leading parenthesised count on an availability button: "(4) Apply Now" -> 4
pub fn parse_unit_count(label: &str) -> u32 {
    RE_UNIT_COUNT
        .captures(label.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Low end of a "$2,100 - $2,400" range. Blank means a model unit with no price.
pub fn parse_min_price(text: &str) -> Decimal {
    let text = text.trim();
    if text.is_empty() {
        return Decimal::ZERO;
    }

    let low = text.split(['-', '–']).next().unwrap_or(text);
    let cleaned: String = low
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    match cleaned.parse::<Decimal>() {
        Ok(price) => price,
        Err(_) => {
            warn!(price = text, "Unrecognised price text, recording 0");
            Decimal::ZERO
        }
    }
}

/// Visible text of an element with runs of whitespace collapsed
fn element_text(el: ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn tile_field(tile: ElementRef, sel: &Selector, idx: usize, what: &str) -> Result<String, ScoutError> {
    tile.select(sel)
        .next()
        .map(element_text)
        .ok_or_else(|| ScoutError::Parse(format!("floorplan tile {} has no {} element", idx, what)))
}

/// Parse every floorplan tile in the widget HTML.
///
/// All four fields are read from inside the same tile container, so a tile
/// missing any of them is reported instead of shifting later tiles' values.
pub fn parse_tiles(html: &str) -> Result<Vec<AvailabilityRow>, ScoutError> {
    let document = Html::parse_document(html);
    let mut rows = Vec::new();

    for (idx, tile) in document.select(&SEL_TILE).enumerate() {
        let plan = tile_field(tile, &SEL_NAME, idx, "name")?;
        let specs = tile_field(tile, &SEL_SPECS, idx, "specs")?;
        let price = tile_field(tile, &SEL_RANGE, idx, "price range")?;
        let label = tile_field(tile, &SEL_BUTTON, idx, "availability button")?;

        debug!(plan = %plan, specs = %specs, price = %price, label = %label, "Parsed tile");

        rows.push(AvailabilityRow {
            plan,
            specs,
            min_price: parse_min_price(&price),
            unit_count: parse_unit_count(&label),
        });
    }

    if rows.is_empty() {
        return Err(ScoutError::Parse("no floorplan tiles in widget".to_string()));
    }

    Ok(rows)
}

/// Complex id is the last non-empty path segment of the card link
pub fn complex_id_from_href(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    path.split('/')
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

/// Lease-widget URL for a card link: the link with `suffix` appended as a path segment
pub fn lease_url(base: &Url, href: &str, suffix: &str) -> Option<String> {
    let mut url = base.join(href).ok()?;
    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.join(suffix.trim_start_matches('/')).ok().map(String::from)
}

/// Build a `Listing` for a result-card link
pub fn listing_from_href(base: &Url, href: &str, suffix: &str) -> Option<Listing> {
    let complex_id = complex_id_from_href(href)?;
    let url = lease_url(base, href, suffix)?;
    Some(Listing { complex_id, url })
}

/// Extract listings from rendered search-results HTML
pub fn parse_listing_cards(html: &str, base: &Url, suffix: &str) -> Vec<Listing> {
    let document = Html::parse_document(html);
    document
        .select(&SEL_CARD)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| {
            let listing = listing_from_href(base, href, suffix);
            if listing.is_none() {
                debug!(href, "Skipping card with unusable link");
            }
            listing
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn tile(name: &str, specs: &str, range: &str, button: &str) -> String {
        format!(
            r#"<div class="floorplan-tile">
                 <div><span class="name">{}</span><span class="specs">{}</span>
                      <span class="range">{}</span></div>
                 <div class="tile-buttons"><button>{}</button></div>
               </div>"#,
            name, specs, range, button
        )
    }

    #[test]
    fn test_parse_unit_count() {
        assert_eq!(parse_unit_count("(4) Apply Now"), 4);
        assert_eq!(parse_unit_count("  (12) Available"), 12);
        assert_eq!(parse_unit_count("Waitlist"), 0);
        assert_eq!(parse_unit_count("Apply (3)"), 0);
        assert_eq!(parse_unit_count(""), 0);
    }

    #[test]
    fn test_parse_min_price() {
        assert_eq!(parse_min_price("$2,100 - $2,400").to_string(), "2100");
        assert_eq!(parse_min_price("$3,050").to_string(), "3050");
        assert_eq!(parse_min_price("   ").to_string(), "0");
        assert_eq!(parse_min_price(""), Decimal::ZERO);
        assert_eq!(parse_min_price("Call for pricing"), Decimal::ZERO);
        assert_eq!(
            parse_min_price("$1,999.50 - $2,100"),
            Decimal::from_str("1999.50").unwrap()
        );
    }

    #[test]
    fn test_parse_tiles_reads_each_tile() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            tile("Plan A", "1 Bed | 1 Bath", "$2,100 - $2,400", "(4) Apply Now"),
            tile("Model", "2 Bed | 2 Bath", "", "Waitlist"),
        );

        let rows = parse_tiles(&html).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].plan, "Plan A");
        assert_eq!(rows[0].specs, "1 Bed | 1 Bath");
        assert_eq!(rows[0].min_price.to_string(), "2100");
        assert_eq!(rows[0].unit_count, 4);
        assert_eq!(rows[1].min_price, Decimal::ZERO);
        assert_eq!(rows[1].unit_count, 0);
    }

    #[test]
    fn test_parse_tiles_rejects_misaligned_tile() {
        let broken = r#"<div class="floorplan-tile"><div><span class="name">B</span></div></div>"#;
        let html = format!(
            "{}{}",
            tile("Plan A", "Studio", "$1,500", "(1) Apply"),
            broken
        );

        let err = parse_tiles(&html).unwrap_err();
        assert!(matches!(err, ScoutError::Parse(_)));
    }

    #[test]
    fn test_parse_tiles_without_tiles_is_parse_error() {
        let err = parse_tiles("<html><body><p>Loading…</p></body></html>").unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn test_complex_id_from_href() {
        assert_eq!(
            complex_id_from_href("https://example.com/apartments/ca/mansion-grove/").as_deref(),
            Some("mansion-grove")
        );
        assert_eq!(complex_id_from_href("/apartments/or/lake/?x=1").as_deref(), Some("lake"));
        assert_eq!(complex_id_from_href("///"), None);
    }

    #[test]
    fn test_parse_listing_cards() {
        let base = Url::parse("https://example.com/search/?term=Seattle").unwrap();
        let html = r#"
            <div id="results-cards">
              <div><a class="card-wrapper" href="https://example.com/apartments/wa/alpha/">A</a></div>
              <div><a class="card-wrapper" href="/apartments/wa/beta">B</a></div>
              <div><a class="other" href="/apartments/wa/ignored/">C</a></div>
              <div><a class="card-wrapper featured" href="/apartments/wa/gamma/">G</a></div>
            </div>"#;

        let listings = parse_listing_cards(html, &base, "lease/");
        assert_eq!(
            listings,
            vec![
                Listing {
                    complex_id: "alpha".into(),
                    url: "https://example.com/apartments/wa/alpha/lease/".into(),
                },
                Listing {
                    complex_id: "beta".into(),
                    url: "https://example.com/apartments/wa/beta/lease/".into(),
                },
                Listing {
                    complex_id: "gamma".into(),
                    url: "https://example.com/apartments/wa/gamma/lease/".into(),
                },
            ]
        );
    }
}
