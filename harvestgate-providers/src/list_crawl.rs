// harvestgate-providers/src/list_crawl.rs
// ============================================================================
// Module: List-mode crawling
// Description: Follows item links and pagination from a listing page (spec
//              §3 "ListConfig"), shared by the http and browser adapters.
// ============================================================================

use std::collections::BTreeMap;

use harvestgate_core::ListConfig;
use harvestgate_core::interfaces::AdapterError;
use harvestgate_core::interfaces::RawItem;

use crate::extraction;

/// One fetched page: its final HTTP status and raw HTML body.
pub struct FetchedPage {
    /// The HTTP status observed for this fetch.
    pub status: u16,
    /// The raw HTML body.
    pub html: String,
}

/// Crawls a listing page for item links (and, bounded by `max_pages`,
/// pagination), applying `selector_map` to each item page reached via
/// `fetch`. Stops early once `max_items` items have been collected.
///
/// `fetch` performs the actual network fetch for a resolved absolute URL;
/// injecting it lets both the http and browser adapters share this walk
/// while using their own client/timeout configuration.
///
/// # Errors
///
/// Returns [`AdapterError`] only if `fetch` itself errors on the initial
/// listing page; a failure to fetch an individual item page is skipped
/// rather than aborting the whole crawl, since one broken link should not
/// sink an otherwise-successful list crawl.
pub fn crawl(
    base_url: &str,
    listing_html: &str,
    selector_map: &BTreeMap<String, String>,
    list_config: &ListConfig,
    mut fetch: impl FnMut(&str) -> Result<FetchedPage, AdapterError>,
) -> Result<Vec<RawItem>, AdapterError> {
    let mut items = Vec::new();
    let mut current_html = listing_html.to_string();
    let mut current_url = base_url.to_string();
    let mut pages_visited = 0u32;

    loop {
        pages_visited += 1;
        let links = item_links(&current_url, &current_html, &list_config.item_link_selector);
        for link in links {
            if items.len() >= list_config.max_items as usize {
                return Ok(items);
            }
            let Ok(page) = fetch(&link) else {
                continue;
            };
            let item = extraction::extract_via_selectors(&page.html, selector_map);
            if !item.is_empty() {
                items.push(item);
            }
        }

        if items.len() >= list_config.max_items as usize || pages_visited >= list_config.max_pages {
            break;
        }

        let Some(pagination_selector) = &list_config.pagination_selector else {
            break;
        };
        let Some(next_url) = next_page_link(&current_url, &current_html, pagination_selector) else {
            break;
        };
        let Ok(page) = fetch(&next_url) else {
            break;
        };
        current_url = next_url;
        current_html = page.html;
    }

    Ok(items)
}

fn resolve(base_url: &str, href: &str) -> Option<String> {
    let base = url::Url::parse(base_url).ok()?;
    base.join(href).ok().map(|resolved| resolved.to_string())
}

fn item_links(base_url: &str, html: &str, selector_str: &str) -> Vec<String> {
    let Ok(selector) = scraper::Selector::parse(selector_str) else {
        return Vec::new();
    };
    let document = scraper::Html::parse_document(html);
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve(base_url, href))
        .collect()
}

fn next_page_link(base_url: &str, html: &str, selector_str: &str) -> Option<String> {
    let selector = scraper::Selector::parse(selector_str).ok()?;
    let document = scraper::Html::parse_document(html);
    let href = document.select(&selector).next()?.value().attr("href")?;
    resolve(base_url, href)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]
    use super::*;

    fn config(max_pages: u32, max_items: u32) -> ListConfig {
        ListConfig {
            item_link_selector: "a.item".to_string(),
            pagination_selector: Some("a.next".to_string()),
            max_pages,
            max_items,
        }
    }

    #[test]
    fn follows_item_links_and_extracts_each() {
        let listing = r#"<html><body><a class="item" href="/item/1">one</a><a class="item" href="/item/2">two</a></body></html>"#;
        let mut selectors = BTreeMap::new();
        selectors.insert("title".to_string(), "h1".to_string());
        let items = crawl("https://example.com/list", listing, &selectors, &config(1, 10), |url| {
            Ok(FetchedPage {
                status: 200,
                html: format!("<html><body><h1>{url}</h1></body></html>"),
            })
        })
        .expect("crawl");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].get("title").map(String::as_str), Some("https://example.com/item/1"));
    }

    #[test]
    fn stops_at_max_items() {
        let listing = r#"<html><body><a class="item" href="/a">a</a><a class="item" href="/b">b</a></body></html>"#;
        let mut selectors = BTreeMap::new();
        selectors.insert("title".to_string(), "h1".to_string());
        let items = crawl("https://example.com/list", listing, &selectors, &config(1, 1), |_| {
            Ok(FetchedPage { status: 200, html: "<html><body><h1>x</h1></body></html>".to_string() })
        })
        .expect("crawl");
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn follows_pagination_up_to_max_pages() {
        let mut call_count = 0;
        let listing = r#"<html><body><a class="next" href="/page/2"></a></body></html>"#;
        let selectors = BTreeMap::new();
        let items = crawl("https://example.com/list", listing, &selectors, &config(3, 100), |_| {
            call_count += 1;
            Ok(FetchedPage {
                status: 200,
                html: r#"<html><body><a class="next" href="/page/3"></a></body></html>"#.to_string(),
            })
        })
        .expect("crawl");
        assert!(items.is_empty());
        assert_eq!(call_count, 2);
    }
}
