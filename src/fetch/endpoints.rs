// src/fetch/endpoints.rs
//
// JSON endpoint probes: the portal's known API endpoints, the fallback
// patterns, and the search/autocomplete indexes. Every request is followed by
// the mandatory rate-limit pause; per-endpoint failures never abort a probe.

use anyhow::Result;
use reqwest::Client;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info};

use super::{client, is_usable};
use crate::config::ExtractorConfig;
use crate::subject::{strategy, RawPayload, Subject};

/// URL of the subject's profile page on the portal.
pub fn page_url(cfg: &ExtractorConfig, subject: &Subject) -> String {
    format!("{}/city/{}/", cfg.base_url.trim_end_matches('/'), subject.id)
}

fn endpoint_url(cfg: &ExtractorConfig, template: &str, subject: &Subject) -> String {
    format!(
        "{}{}",
        cfg.base_url.trim_end_matches('/'),
        template.replace("{city_id}", &subject.id)
    )
}

/// Check that the subject exists at all (its profile page answers 200).
///
/// This is a hard gate separate from the cascade: a transport failure here is
/// a real error, a non-200 means "no such subject".
pub async fn subject_exists(
    client: &Client,
    cfg: &ExtractorConfig,
    subject: &Subject,
) -> Result<bool> {
    let url = page_url(cfg, subject);
    let status = client::get_status(client, &url, cfg.max_retries).await?;
    Ok(status.is_success())
}

/// Probe the portal's known API endpoints for the subject.
pub async fn probe_api(
    client: &Client,
    cfg: &ExtractorConfig,
    subject: &Subject,
) -> Result<Vec<RawPayload>> {
    probe_templates(client, cfg, subject, &cfg.api_endpoints, strategy::API).await
}

/// Probe the alternative endpoint patterns.
pub async fn probe_alternatives(
    client: &Client,
    cfg: &ExtractorConfig,
    subject: &Subject,
) -> Result<Vec<RawPayload>> {
    probe_templates(client, cfg, subject, &cfg.alternative_patterns, strategy::ALT).await
}

async fn probe_templates(
    client: &Client,
    cfg: &ExtractorConfig,
    subject: &Subject,
    templates: &[String],
    strategy: &'static str,
) -> Result<Vec<RawPayload>> {
    let mut found = Vec::new();

    for template in templates {
        let url = endpoint_url(cfg, template, subject);
        match client::get_json(client, &url, cfg.max_retries).await {
            Ok(Some(value)) if is_usable(&value) => {
                info!(endpoint = %template, "endpoint returned data");
                found.push(RawPayload::new(strategy, template.clone(), subject, value));
            }
            Ok(_) => debug!(endpoint = %template, "no data"),
            Err(err) => debug!(endpoint = %template, error = %err, "request failed"),
        }
        sleep(cfg.rate_limit()).await;
    }

    Ok(found)
}

/// Scan the search/autocomplete indexes for an entry matching the subject.
///
/// An array response is searched for an element whose `id` equals the subject
/// id; an object response that mentions the id anywhere is kept whole.
pub async fn probe_search(
    client: &Client,
    cfg: &ExtractorConfig,
    subject: &Subject,
) -> Result<Vec<RawPayload>> {
    let mut found = Vec::new();

    for endpoint in &cfg.search_endpoints {
        let url = endpoint_url(cfg, endpoint, subject);
        match client::get_json(client, &url, cfg.max_retries).await {
            Ok(Some(value)) => {
                if let Some(hit) = match_subject(&value, &subject.id) {
                    info!(endpoint = %endpoint, "search index knows the subject");
                    found.push(RawPayload::new(
                        strategy::SEARCH,
                        endpoint.clone(),
                        subject,
                        hit,
                    ));
                }
            }
            Ok(None) => debug!(endpoint = %endpoint, "no data"),
            Err(err) => debug!(endpoint = %endpoint, error = %err, "request failed"),
        }
        sleep(cfg.rate_limit()).await;
    }

    Ok(found)
}

fn match_subject(value: &Value, subject_id: &str) -> Option<Value> {
    match value {
        Value::Array(items) => items
            .iter()
            .find(|item| {
                item.get("id")
                    .map_or(false, |id| id_matches(id, subject_id))
            })
            .cloned(),
        Value::Object(_) if value.to_string().contains(subject_id) => Some(value.clone()),
        _ => None,
    }
}

fn id_matches(id: &Value, subject_id: &str) -> bool {
    match id {
        Value::String(s) => s == subject_id,
        Value::Number(n) => n.to_string() == subject_id,
        _ => false,
    }
}
