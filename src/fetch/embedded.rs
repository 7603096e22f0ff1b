// src/fetch/embedded.rs
//
// Embedded-JSON probe: fetch the subject's profile page and pull JSON out of
// its script tags with a set of named patterns, plus `data-city` attributes.
// Each pattern is an independently testable probe, not a best-effort scan.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;
use tokio::time::sleep;
use tracing::debug;

use super::{client, endpoints, is_usable};
use crate::config::ExtractorConfig;
use crate::subject::{strategy, RawPayload, Subject};

/// Scripts shorter than this are boilerplate (analytics snippets, loaders).
const MIN_SCRIPT_LEN: usize = 50;

static SCRIPT_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("initial_state", r"(?s)window\.__INITIAL_STATE__\s*=\s*(\{.*?\});"),
        ("window_data", r"(?s)window\.__DATA__\s*=\s*(\{.*?\});"),
        ("city_data", r"(?s)var\s+cityData\s*=\s*(\{.*?\});"),
        ("const_data", r"(?s)const\s+data\s*=\s*(\{.*?\});"),
        ("city_info", r#""city":\s*(\{[^}]*"name"[^}]*\})"#),
        ("industries", r#""industries":\s*(\[[^\]]*\])"#),
        ("clusters", r#""clusters":\s*(\[[^\]]*\])"#),
        ("employment", r#""employment":\s*(\[[^\]]*\])"#),
        ("chart_data", r#"data:\s*(\{[^}]*"labels"[^}]*\})"#),
    ]
    .into_iter()
    .map(|(name, pattern)| {
        (
            name,
            Regex::new(pattern).expect("script pattern should be a valid regex"),
        )
    })
    .collect()
});

/// Fetch the subject's page and extract every embedded JSON section.
pub async fn probe_embedded(
    client: &Client,
    cfg: &ExtractorConfig,
    subject: &Subject,
) -> Result<Vec<RawPayload>> {
    let url = endpoints::page_url(cfg, subject);
    let page = client::get_text(client, &url, cfg.max_retries).await?;
    sleep(cfg.rate_limit()).await;

    let Some(html) = page else {
        return Ok(Vec::new());
    };

    Ok(extract_embedded_json(&html)
        .into_iter()
        .map(|(name, value)| RawPayload::new(strategy::EMBEDDED, name, subject, value))
        .collect())
}

/// Apply the named patterns to every script tag in `html` and JSON-parse the
/// matches. Returns `(pattern name, value)` pairs; a pattern matching more
/// than once in a script gets `_1`, `_2`… suffixes on the later matches.
pub fn extract_embedded_json(html: &str) -> Vec<(String, Value)> {
    let document = Html::parse_document(html);
    let script_sel = Selector::parse("script").expect("selector should parse");
    let mut sections = Vec::new();

    for script in document.select(&script_sel) {
        let text: String = script.text().collect();
        let content = text.trim();
        if content.len() < MIN_SCRIPT_LEN {
            continue;
        }

        for (name, pattern) in SCRIPT_PATTERNS.iter() {
            for (idx, caps) in pattern.captures_iter(content).enumerate() {
                let Some(m) = caps.get(1) else { continue };
                let cleaned = m.as_str().trim().trim_end_matches(',');
                match serde_json::from_str::<Value>(cleaned) {
                    Ok(value) if is_usable(&value) => {
                        let key = if idx == 0 {
                            (*name).to_string()
                        } else {
                            format!("{name}_{idx}")
                        };
                        debug!(pattern = name, "extracted embedded JSON");
                        sections.push((key, value));
                    }
                    Ok(_) => {}
                    Err(err) => {
                        debug!(pattern = name, error = %err, "match is not valid JSON");
                    }
                }
            }
        }
    }

    // some frontends stash the profile in data attributes instead
    let data_sel = Selector::parse("[data-city]").expect("selector should parse");
    for element in document.select(&data_sel) {
        if let Some(raw) = element.value().attr("data-city") {
            if let Ok(value) = serde_json::from_str::<Value>(raw) {
                if is_usable(&value) {
                    sections.push(("data_city".to_string(), value));
                }
            }
        }
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(script: &str) -> String {
        format!("<html><head><script>{script}</script></head><body></body></html>")
    }

    #[test]
    fn extracts_initial_state_objects() {
        let html = page(
            r#"window.__INITIAL_STATE__ = {"city": {"name": "Bucharest", "population": 1800000}};"#,
        );
        let sections = extract_embedded_json(&html);
        let state = sections
            .iter()
            .find(|(name, _)| name == "initial_state")
            .map(|(_, v)| v)
            .expect("initial_state section");
        assert_eq!(
            state.pointer("/city/name"),
            Some(&json!("Bucharest"))
        );
        // the "city": {...} fragment inside also matches the city_info pattern
        assert!(sections.iter().any(|(name, _)| name == "city_info"));
    }

    #[test]
    fn extracts_named_list_sections() {
        let html = page(
            r#"var payload = {"industries": [{"id": 1, "name": "Textiles"}], "padding": "xxxxxxxxxxxx"};"#,
        );
        let sections = extract_embedded_json(&html);
        let (_, industries) = sections
            .iter()
            .find(|(name, _)| name == "industries")
            .expect("industries section");
        assert_eq!(industries, &json!([{"id": 1, "name": "Textiles"}]));
    }

    #[test]
    fn short_scripts_are_skipped() {
        let html = page(r#"const data = {"a": 1};"#);
        assert!(extract_embedded_json(&html).is_empty());
    }

    #[test]
    fn invalid_json_matches_are_dropped() {
        let html = page(
            r#"window.__DATA__ = {broken: unquoted}; /* enough padding to clear the length gate */"#,
        );
        assert!(extract_embedded_json(&html)
            .iter()
            .all(|(name, _)| name != "window_data"));
    }

    #[test]
    fn data_city_attributes_are_collected() {
        let html = r#"<html><body><div data-city='{"id": "3444", "name": "Bucharest"}'></div></body></html>"#;
        let sections = extract_embedded_json(html);
        assert_eq!(
            sections,
            vec![("data_city".to_string(), json!({"id": "3444", "name": "Bucharest"}))]
        );
    }

    #[test]
    fn repeated_matches_get_indexed_names() {
        let html = page(
            r#"a = {"clusters": [1, 2]}; b = {"clusters": [3]}; // padding padding padding"#,
        );
        let names: Vec<String> = extract_embedded_json(&html)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["clusters", "clusters_1"]);
    }
}
