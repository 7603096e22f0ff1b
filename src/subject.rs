// src/subject.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Strategy names as they appear in provenance tags and audit artifacts.
pub mod strategy {
    pub const API: &str = "api";
    pub const ALT: &str = "alt";
    pub const SEARCH: &str = "search";
    pub const EMBEDDED: &str = "embedded";
    pub const HTML: &str = "html";
}

/// The entity being queried (e.g. a city), identified by an opaque portal id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Subject {
            id: id.into(),
            label: None,
        }
    }

    pub fn with_label(id: impl Into<String>, label: impl Into<String>) -> Self {
        Subject {
            id: id.into(),
            label: Some(label.into()),
        }
    }

    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

/// One raw JSON value as obtained by a single probe, tagged with where it
/// came from. Produced once per fetch attempt and discarded after flattening.
#[derive(Debug, Clone)]
pub struct RawPayload {
    /// Strategy that produced this payload (see [`strategy`]).
    pub strategy: &'static str,
    /// Endpoint template or pattern name the payload was extracted from.
    pub origin: String,
    pub subject_id: String,
    pub value: Value,
}

impl RawPayload {
    pub fn new(
        strategy: &'static str,
        origin: impl Into<String>,
        subject: &Subject,
        value: Value,
    ) -> Self {
        RawPayload {
            strategy,
            origin: origin.into(),
            subject_id: subject.id.clone(),
            value,
        }
    }

    /// Logical table name for this payload: `{strategy}_{leaf}` where leaf is
    /// the last meaningful segment of the origin (placeholder segments like
    /// `{city_id}` are skipped). Rows from payloads sharing a tag end up in
    /// the same table.
    pub fn table_tag(&self) -> String {
        sanitize_name(&format!("{}_{}", self.strategy, origin_leaf(&self.origin)))
    }
}

fn origin_leaf(origin: &str) -> &str {
    origin
        .trim_end_matches('/')
        .rsplit('/')
        .find(|seg| !seg.is_empty() && !seg.starts_with('{'))
        .map(|seg| seg.strip_suffix(".json").unwrap_or(seg))
        .unwrap_or("root")
}

/// Replace anything outside `[A-Za-z0-9._-]` so the name is safe as a file
/// name component on every platform we care about.
pub fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(strategy: &'static str, origin: &str) -> RawPayload {
        RawPayload::new(strategy, origin, &Subject::new("3444"), json!({}))
    }

    #[test]
    fn tag_uses_last_meaningful_segment() {
        assert_eq!(
            payload(strategy::API, "/api/city/{city_id}/economic-composition").table_tag(),
            "api_economic-composition"
        );
        assert_eq!(payload(strategy::API, "/api/city/{city_id}").table_tag(), "api_city");
        assert_eq!(
            payload(strategy::ALT, "/data/cities/{city_id}.json").table_tag(),
            "alt_cities"
        );
    }

    #[test]
    fn tag_passes_pattern_names_through() {
        assert_eq!(
            payload(strategy::EMBEDDED, "initial_state").table_tag(),
            "embedded_initial_state"
        );
        assert_eq!(payload(strategy::HTML, "table_3").table_tag(), "html_table_3");
    }

    #[test]
    fn tag_falls_back_to_root_and_sanitizes() {
        assert_eq!(payload(strategy::API, "/").table_tag(), "api_root");
        assert_eq!(payload(strategy::SEARCH, "api search!").table_tag(), "search_api_search_");
    }

    #[test]
    fn display_name_prefers_label() {
        assert_eq!(Subject::with_label("3444", "Bucharest").display_name(), "Bucharest");
        assert_eq!(Subject::new("3444").display_name(), "3444");
    }
}
