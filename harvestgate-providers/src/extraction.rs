// harvestgate-providers/src/extraction.rs
// ============================================================================
// Module: HTML extraction helpers
// Description: CSS-selector extraction and JSON-LD Person/entity extraction
//              shared by the http and browser adapters (spec §6 "Engine
//              adapter contract": "The browser adapter additionally attempts
//              a JSON-LD Person/entity extraction before falling back to the
//              selector map").
// ============================================================================

use harvestgate_core::interfaces::RawItem;

/// Runs every entry in `selector_map` against `html`, keeping only fields
/// whose selector actually matched non-empty text. An empty or unparseable
/// selector is skipped rather than treated as an error — the field pipeline
/// (C2) already treats an absent raw value as `required_missing` when
/// relevant.
#[must_use]
pub fn extract_via_selectors(html: &str, selector_map: &std::collections::BTreeMap<String, String>) -> RawItem {
    let document = scraper::Html::parse_document(html);
    let mut item = RawItem::new();
    for (field_name, selector_str) in selector_map {
        if selector_str.is_empty() {
            continue;
        }
        let Ok(selector) = scraper::Selector::parse(selector_str) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text: String = element.text().collect::<Vec<_>>().join(" ");
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                item.insert(field_name.clone(), trimmed.to_string());
            }
        }
    }
    item
}

/// Scans every `<script type="application/ld+json">` block in `html` for a
/// `schema.org` `Person` entity and returns its common fields as a
/// [`RawItem`], or `None` if no block parses as JSON or none describes a
/// `Person` (spec §6).
#[must_use]
pub fn extract_json_ld_person(html: &str) -> Option<RawItem> {
    let document = scraper::Html::parse_document(html);
    let selector = scraper::Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    for script in document.select(&selector) {
        let raw: String = script.text().collect();
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) else {
            continue;
        };
        if let Some(item) = person_from_json_ld(&value) {
            return Some(item);
        }
    }
    None
}

fn json_ld_candidates(value: &serde_json::Value) -> Vec<&serde_json::Value> {
    match value {
        serde_json::Value::Array(items) => items.iter().collect(),
        serde_json::Value::Object(map) => map.get("@graph").and_then(serde_json::Value::as_array).map_or_else(|| vec![value], |graph| graph.iter().collect()),
        other => vec![other],
    }
}

fn is_person_type(candidate: &serde_json::Value) -> bool {
    match candidate.get("@type") {
        Some(serde_json::Value::String(kind)) => kind == "Person",
        Some(serde_json::Value::Array(kinds)) => kinds.iter().any(|kind| kind.as_str() == Some("Person")),
        _ => false,
    }
}

fn string_field(candidate: &serde_json::Value, key: &str) -> Option<String> {
    candidate.get(key).and_then(serde_json::Value::as_str).map(str::to_string)
}

fn person_from_json_ld(value: &serde_json::Value) -> Option<RawItem> {
    for candidate in json_ld_candidates(value) {
        if !is_person_type(candidate) {
            continue;
        }
        let mut item = RawItem::new();
        if let Some(name) = string_field(candidate, "name") {
            item.insert("name".to_string(), name);
        }
        if let Some(job_title) = string_field(candidate, "jobTitle") {
            item.insert("job_title".to_string(), job_title);
        }
        if let Some(telephone) = string_field(candidate, "telephone") {
            item.insert("phone".to_string(), telephone);
        }
        if let Some(email) = string_field(candidate, "email") {
            item.insert("email".to_string(), email);
        }
        if let Some(address) = candidate.get("address") {
            if let Some(locality) = string_field(address, "addressLocality") {
                item.insert("city".to_string(), locality);
            }
            if let Some(region) = string_field(address, "addressRegion") {
                item.insert("state".to_string(), region);
            }
        }
        if item.is_empty() {
            continue;
        }
        return Some(item);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_for_matching_selectors() {
        let html = r#"<html><body><h1>Widget</h1><span class="price">$9.99</span></body></html>"#;
        let mut selectors = std::collections::BTreeMap::new();
        selectors.insert("title".to_string(), "h1".to_string());
        selectors.insert("price".to_string(), ".price".to_string());
        let item = extract_via_selectors(html, &selectors);
        assert_eq!(item.get("title").map(String::as_str), Some("Widget"));
        assert_eq!(item.get("price").map(String::as_str), Some("$9.99"));
    }

    #[test]
    fn skips_empty_and_nonmatching_selectors() {
        let html = "<html><body></body></html>";
        let mut selectors = std::collections::BTreeMap::new();
        selectors.insert("title".to_string(), String::new());
        selectors.insert("price".to_string(), ".missing".to_string());
        let item = extract_via_selectors(html, &selectors);
        assert!(item.is_empty());
    }

    #[test]
    fn extracts_person_from_json_ld_script() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@context":"https://schema.org","@type":"Person","name":"Jane Doe","jobTitle":"Engineer"}
        </script></head><body></body></html>"#;
        let item = extract_json_ld_person(html).expect("person found");
        assert_eq!(item.get("name").map(String::as_str), Some("Jane Doe"));
        assert_eq!(item.get("job_title").map(String::as_str), Some("Engineer"));
    }

    #[test]
    fn returns_none_with_no_ld_json_person() {
        let html = "<html><head></head><body><h1>Widget</h1></body></html>";
        assert!(extract_json_ld_person(html).is_none());
    }

    #[test]
    fn finds_person_inside_a_graph_array() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@context":"https://schema.org","@graph":[{"@type":"WebPage"},{"@type":"Person","name":"Sam Lee"}]}
        </script></head></html>"#;
        let item = extract_json_ld_person(html).expect("person found");
        assert_eq!(item.get("name").map(String::as_str), Some("Sam Lee"));
    }
}
