// src/fetch/tables.rs
//
// HTML-table probe: parse the subject's profile page and turn every <table>
// into an array of objects keyed by header text, ready for the row builder.

use anyhow::Result;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use tokio::time::sleep;

use super::{client, endpoints};
use crate::config::ExtractorConfig;
use crate::subject::{strategy, RawPayload, Subject};

/// Fetch the subject's page and extract its tables as `table_{i}` payloads.
pub async fn probe_html(
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

    Ok(extract_html_tables(&html)
        .into_iter()
        .enumerate()
        .map(|(i, value)| RawPayload::new(strategy::HTML, format!("table_{i}"), subject, value))
        .collect())
}

/// Parse every `<table>` in `html` into a JSON array of row objects.
///
/// Headers come from `<thead>` cells, or from the first row when there is no
/// `<thead>`; cells beyond the header list get `column_{j}` names. Rows with
/// no text at all are dropped, and tables that end up with no rows are
/// omitted entirely.
pub fn extract_html_tables(html: &str) -> Vec<Value> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table").expect("selector should parse");
    let thead_cell_sel = Selector::parse("thead th, thead td").expect("selector should parse");
    let tr_sel = Selector::parse("tr").expect("selector should parse");
    let tbody_tr_sel = Selector::parse("tbody tr").expect("selector should parse");
    let cell_sel = Selector::parse("td, th").expect("selector should parse");

    let mut tables = Vec::new();

    for table in document.select(&table_sel) {
        let mut headers: Vec<String> = table.select(&thead_cell_sel).map(cell_text).collect();
        let mut skip_first = false;
        if headers.is_empty() {
            if let Some(first_row) = table.select(&tr_sel).next() {
                headers = first_row.select(&cell_sel).map(cell_text).collect();
                skip_first = !headers.is_empty();
            }
        }

        // the HTML5 parser wraps bare rows in an implicit tbody
        let mut body_rows: Vec<ElementRef> = table.select(&tbody_tr_sel).collect();
        if body_rows.is_empty() {
            body_rows = table
                .select(&tr_sel)
                .filter(|row| !in_thead(row))
                .collect();
        }
        if skip_first && !body_rows.is_empty() {
            body_rows.remove(0);
        }

        let mut rows = Vec::new();
        for row in body_rows {
            let mut object = Map::new();
            let mut has_text = false;
            for (j, cell) in row.select(&cell_sel).enumerate() {
                let text = cell_text(cell);
                has_text |= !text.is_empty();
                let header = headers
                    .get(j)
                    .cloned()
                    .unwrap_or_else(|| format!("column_{j}"));
                object.insert(header, Value::String(text));
            }
            if has_text {
                rows.push(Value::Object(object));
            }
        }

        if !rows.is_empty() {
            tables.push(Value::Array(rows));
        }
    }

    tables
}

fn cell_text(cell: ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn in_thead(row: &ElementRef) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|el| el.value().name() == "thead")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn thead_cells_become_keys() {
        let html = r#"
            <table>
              <thead><tr><th>Industry</th><th>RCA</th></tr></thead>
              <tbody>
                <tr><td>Textiles</td><td>1.2</td></tr>
                <tr><td>IT</td><td>0.8</td></tr>
              </tbody>
            </table>"#;
        let tables = extract_html_tables(html);
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0],
            json!([
                {"Industry": "Textiles", "RCA": "1.2"},
                {"Industry": "IT", "RCA": "0.8"},
            ])
        );
    }

    #[test]
    fn first_row_serves_as_header_without_thead() {
        let html = r#"
            <table>
              <tr><td>Name</td><td>Value</td></tr>
              <tr><td>Population</td><td>1800000</td></tr>
            </table>"#;
        let tables = extract_html_tables(html);
        assert_eq!(
            tables[0],
            json!([{"Name": "Population", "Value": "1800000"}])
        );
    }

    #[test]
    fn extra_cells_get_positional_names() {
        let html = r#"
            <table>
              <thead><tr><th>A</th></tr></thead>
              <tbody><tr><td>1</td><td>2</td></tr></tbody>
            </table>"#;
        let tables = extract_html_tables(html);
        assert_eq!(tables[0], json!([{"A": "1", "column_1": "2"}]));
    }

    #[test]
    fn empty_rows_and_empty_tables_are_dropped() {
        let html = r#"
            <table>
              <thead><tr><th>A</th></tr></thead>
              <tbody><tr><td></td></tr><tr><td>  </td></tr></tbody>
            </table>
            <p>no tables here</p>"#;
        assert!(extract_html_tables(html).is_empty());
    }

    #[test]
    fn pages_without_tables_yield_nothing() {
        assert!(extract_html_tables("<html><body><p>hi</p></body></html>").is_empty());
    }

    #[test]
    fn nested_markup_inside_cells_is_flattened_to_text() {
        let html = r##"
            <table>
              <thead><tr><th>City</th></tr></thead>
              <tbody><tr><td><a href="#"><b>Bucharest</b></a></td></tr></tbody>
            </table>"##;
        let tables = extract_html_tables(html);
        assert_eq!(tables[0], json!([{"City": "Bucharest"}]));
    }
}
