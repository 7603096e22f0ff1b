// src/fetch/client.rs

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, REFERER, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::config::ExtractorConfig;

const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Build the shared HTTP client with the browser-like headers the portal
/// frontend sends, a cookie store, and the configured timeout.
pub fn build_client(cfg: &ExtractorConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
             Chrome/91.0.4472.124 Safari/537.36",
        ),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    let referer = format!("{}/", cfg.base_url.trim_end_matches('/'));
    headers.insert(
        REFERER,
        HeaderValue::from_str(&referer).context("building referer header")?,
    );

    Client::builder()
        .default_headers(headers)
        .timeout(cfg.timeout())
        .cookie_store(true)
        .build()
        .context("building HTTP client")
}

/// GET `url` expecting a JSON body.
///
/// `Ok(Some(value))` on a 2xx JSON response, `Ok(None)` when the server
/// answers with a non-success status or a body that is not JSON (both normal
/// during discovery), `Err` only when the transport keeps failing after
/// `max_retries` attempts.
pub async fn get_json(client: &Client, url: &str, max_retries: usize) -> Result<Option<Value>> {
    let resp = send_with_retries(client, url, max_retries).await?;
    if !resp.status().is_success() {
        debug!(url = %url, status = %resp.status(), "non-success status");
        return Ok(None);
    }
    match resp.json::<Value>().await {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            debug!(url = %url, error = %err, "body is not JSON");
            Ok(None)
        }
    }
}

/// GET `url` expecting text (an HTML page). Same outcome contract as
/// [`get_json`].
pub async fn get_text(client: &Client, url: &str, max_retries: usize) -> Result<Option<String>> {
    let resp = send_with_retries(client, url, max_retries).await?;
    if !resp.status().is_success() {
        debug!(url = %url, status = %resp.status(), "non-success status");
        return Ok(None);
    }
    let body = resp
        .text()
        .await
        .with_context(|| format!("reading body from {url}"))?;
    Ok(Some(body))
}

/// GET `url` and report only the status code.
pub async fn get_status(client: &Client, url: &str, max_retries: usize) -> Result<StatusCode> {
    let resp = send_with_retries(client, url, max_retries).await?;
    Ok(resp.status())
}

async fn send_with_retries(
    client: &Client,
    url: &str,
    max_retries: usize,
) -> Result<reqwest::Response> {
    let attempts = max_retries.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match client.get(url).send().await {
            Ok(resp) => return Ok(resp),
            Err(err) if attempt < attempts => {
                debug!(url = %url, attempt, error = %err, "request failed, retrying");
                sleep(RETRY_DELAY).await;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("GET {url}"));
            }
        }
    }
}
