// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

use crate::subject::Subject;

/// Explicit probe context for a pipeline invocation: portal location,
/// endpoint templates per strategy, pacing, and output toggles. Everything a
/// probe needs travels in here rather than in process-global session state.
///
/// All fields have defaults, so a YAML config file may override any subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub base_url: String,
    /// Portal API endpoint templates; `{city_id}` is replaced per subject.
    pub api_endpoints: Vec<String>,
    /// Fallback endpoint patterns probed by the `alt` strategy.
    pub alternative_patterns: Vec<String>,
    /// Search/autocomplete indexes scanned for the subject id.
    pub search_endpoints: Vec<String>,
    /// Mandatory pause after every request, milliseconds.
    pub rate_limit_ms: u64,
    /// Per-request timeout, seconds.
    pub timeout_secs: u64,
    /// Attempts per request before a transport error counts as a probe failure.
    pub max_retries: usize,
    /// Cities used by `--sample` runs.
    pub sample_subjects: Vec<Subject>,
    /// Write the raw payload audit artifact per subject.
    pub include_raw_json: bool,
    /// Write combined per-table CSVs when more than one subject is processed.
    pub combine_subjects: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            base_url: "https://metroverse.hks.harvard.edu".to_string(),
            api_endpoints: to_strings(&[
                "/api/city/{city_id}",
                "/api/city/{city_id}/economic-composition",
                "/api/city/{city_id}/good-at",
                "/api/city/{city_id}/industry-position",
                "/api/city/{city_id}/growth-opportunities",
                "/api/data/cities/{city_id}",
                "/api/data/cities/{city_id}/profile",
                "/api/data/cities/{city_id}/industries",
                "/api/data/cities/{city_id}/clusters",
                "/api/data/cities/{city_id}/complexity",
                "/api/data/cities/{city_id}/opportunities",
                "/api/data/cities/{city_id}/employment",
            ]),
            alternative_patterns: to_strings(&[
                "/api/city-data/{city_id}",
                "/api/v1/cities/{city_id}",
                "/api/v2/cities/{city_id}",
                "/data/cities/{city_id}.json",
                "/static/data/cities/{city_id}.json",
            ]),
            search_endpoints: to_strings(&[
                "/api/search/cities",
                "/api/cities/search",
                "/api/autocomplete/cities",
            ]),
            rate_limit_ms: 1500,
            timeout_secs: 30,
            max_retries: 3,
            sample_subjects: vec![
                Subject::with_label("3444", "Bucharest"),
                Subject::with_label("1840", "New York"),
                Subject::with_label("2643", "London"),
                Subject::with_label("1275", "Tokyo"),
                Subject::with_label("2077", "Berlin"),
            ],
            include_raw_json: true,
            combine_subjects: true,
        }
    }
}

impl ExtractorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_carries_portal_constants() {
        let cfg = ExtractorConfig::default();
        assert_eq!(cfg.base_url, "https://metroverse.hks.harvard.edu");
        assert!(cfg.api_endpoints.iter().any(|e| e.ends_with("/economic-composition")));
        assert_eq!(cfg.sample_subjects.len(), 5);
        assert_eq!(cfg.sample_subjects[0].id, "3444");
        assert_eq!(cfg.rate_limit_ms, 1500);
        assert_eq!(cfg.max_retries, 3);
    }

    #[test]
    fn yaml_overrides_are_partial() {
        let cfg: ExtractorConfig =
            serde_yaml::from_str("base_url: http://localhost:1234\nrate_limit_ms: 0\n").unwrap();
        assert_eq!(cfg.base_url, "http://localhost:1234");
        assert_eq!(cfg.rate_limit_ms, 0);
        // untouched fields keep their defaults
        assert_eq!(cfg.timeout_secs, 30);
        assert!(!cfg.search_endpoints.is_empty());
    }
}
