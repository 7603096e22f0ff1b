// src/discover.rs
//
// The discovery cascade: run every named strategy for a subject, strictly in
// order, collecting each success with its own provenance. A failing probe is
// recorded as "no payload" and the cascade moves on; ending with nothing is a
// valid outcome the caller checks for, not an error.

use std::collections::BTreeMap;

use anyhow::Result;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::ExtractorConfig;
use crate::fetch::{embedded, endpoints, tables};
use crate::subject::{strategy, RawPayload, Subject};

/// One named probe in the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Direct calls to the portal's known API endpoints.
    DirectApi,
    /// Fallback endpoint patterns.
    AlternativePatterns,
    /// Search/autocomplete indexes scanned for the subject.
    SearchIndex,
    /// JSON embedded in the profile page's script tags.
    EmbeddedJson,
    /// HTML tables on the profile page.
    HtmlTables,
}

impl Strategy {
    /// Priority order used by the CLI.
    pub const DEFAULT_ORDER: [Strategy; 5] = [
        Strategy::DirectApi,
        Strategy::AlternativePatterns,
        Strategy::SearchIndex,
        Strategy::EmbeddedJson,
        Strategy::HtmlTables,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::DirectApi => strategy::API,
            Strategy::AlternativePatterns => strategy::ALT,
            Strategy::SearchIndex => strategy::SEARCH,
            Strategy::EmbeddedJson => strategy::EMBEDDED,
            Strategy::HtmlTables => strategy::HTML,
        }
    }

    async fn run(
        self,
        client: &Client,
        cfg: &ExtractorConfig,
        subject: &Subject,
    ) -> Result<Vec<RawPayload>> {
        match self {
            Strategy::DirectApi => endpoints::probe_api(client, cfg, subject).await,
            Strategy::AlternativePatterns => {
                endpoints::probe_alternatives(client, cfg, subject).await
            }
            Strategy::SearchIndex => endpoints::probe_search(client, cfg, subject).await,
            Strategy::EmbeddedJson => embedded::probe_embedded(client, cfg, subject).await,
            Strategy::HtmlTables => tables::probe_html(client, cfg, subject).await,
        }
    }
}

/// Everything discovery found for one subject: payloads grouped by strategy
/// name, with entries only for strategies that yielded at least one payload.
#[derive(Debug)]
pub struct DiscoveryResult {
    pub subject_id: String,
    pub payloads: BTreeMap<&'static str, Vec<RawPayload>>,
}

impl DiscoveryResult {
    pub fn successful_strategies(&self) -> usize {
        self.payloads.len()
    }

    pub fn payload_count(&self) -> usize {
        self.payloads.values().map(Vec::len).sum()
    }

    /// No strategy produced anything. A valid outcome, distinct from failure.
    pub fn is_exhausted(&self) -> bool {
        self.payloads.is_empty()
    }

    pub fn iter_payloads(&self) -> impl Iterator<Item = &RawPayload> {
        self.payloads.values().flatten()
    }
}

/// Run `strategies` for `subject`, one after another. Every strategy is
/// attempted regardless of earlier successes, and nothing is deduplicated:
/// downstream consumers decide relevance, each payload keeps its provenance.
pub async fn discover(
    client: &Client,
    cfg: &ExtractorConfig,
    subject: &Subject,
    strategies: &[Strategy],
) -> DiscoveryResult {
    let mut result = DiscoveryResult {
        subject_id: subject.id.clone(),
        payloads: BTreeMap::new(),
    };

    for &strat in strategies {
        debug!(subject = %subject.id, strategy = strat.name(), "probing");
        match strat.run(client, cfg, subject).await {
            Ok(found) if !found.is_empty() => {
                info!(
                    subject = %subject.id,
                    strategy = strat.name(),
                    payloads = found.len(),
                    "strategy yielded data"
                );
                result.payloads.entry(strat.name()).or_default().extend(found);
            }
            Ok(_) => debug!(subject = %subject.id, strategy = strat.name(), "no payloads"),
            Err(err) => {
                // a broken probe is recovered locally; the cascade continues
                warn!(
                    subject = %subject.id,
                    strategy = strat.name(),
                    error = %err,
                    "probe failed"
                );
            }
        }
    }

    if result.is_exhausted() {
        warn!(subject = %subject.id, "discovery exhausted: no strategy produced data");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_cfg(server: &MockServer) -> ExtractorConfig {
        ExtractorConfig {
            base_url: server.uri(),
            rate_limit_ms: 0,
            max_retries: 1,
            ..ExtractorConfig::default()
        }
    }

    async fn mount_json(server: &MockServer, at: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn entries_match_strategies_that_yielded_payloads() {
        let server = MockServer::start().await;
        mount_json(&server, "/api/city/3444", json!({"name": "Bucharest"})).await;
        mount_json(&server, "/api/v1/cities/3444", json!({"gdp": 42})).await;
        // everything else (including the profile page) answers 404

        let cfg = test_cfg(&server);
        let client = crate::fetch::client::build_client(&cfg).unwrap();
        let subject = Subject::new("3444");

        let result = discover(&client, &cfg, &subject, &Strategy::DEFAULT_ORDER).await;
        assert_eq!(result.successful_strategies(), 2);
        assert_eq!(result.payload_count(), 2);
        assert!(!result.is_exhausted());
        assert!(result.payloads.contains_key("api"));
        assert!(result.payloads.contains_key("alt"));
    }

    #[tokio::test]
    async fn later_strategies_run_despite_earlier_success() {
        let server = MockServer::start().await;
        mount_json(&server, "/api/city/3444", json!({"name": "Bucharest"})).await;
        let page = r#"<html><script>window.__INITIAL_STATE__ = {"city": {"name": "Bucharest", "rank": 1}};</script></html>"#;
        Mock::given(method("GET"))
            .and(path("/city/3444/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;

        let cfg = test_cfg(&server);
        let client = crate::fetch::client::build_client(&cfg).unwrap();
        let result = discover(&client, &cfg, &Subject::new("3444"), &Strategy::DEFAULT_ORDER).await;

        assert!(result.payloads.contains_key("api"));
        assert!(result.payloads.contains_key("embedded"));
    }

    #[tokio::test]
    async fn exhaustion_is_a_result_not_an_error() {
        let server = MockServer::start().await;
        let cfg = test_cfg(&server);
        let client = crate::fetch::client::build_client(&cfg).unwrap();

        let result = discover(&client, &cfg, &Subject::new("9999"), &Strategy::DEFAULT_ORDER).await;
        assert!(result.is_exhausted());
        assert_eq!(result.successful_strategies(), 0);
        assert_eq!(result.payload_count(), 0);
    }

    #[tokio::test]
    async fn server_errors_do_not_abort_the_cascade() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/city/3444"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_json(&server, "/api/v1/cities/3444", json!({"gdp": 42})).await;

        let cfg = test_cfg(&server);
        let client = crate::fetch::client::build_client(&cfg).unwrap();
        let result = discover(&client, &cfg, &Subject::new("3444"), &Strategy::DEFAULT_ORDER).await;

        assert_eq!(result.successful_strategies(), 1);
        assert!(result.payloads.contains_key("alt"));
    }

    #[test]
    fn strategy_names_are_stable() {
        let names: Vec<&str> = Strategy::DEFAULT_ORDER.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["api", "alt", "search", "embedded", "html"]);
    }
}
