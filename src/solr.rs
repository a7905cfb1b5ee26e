//! Solr extraction.
//!
//! Documents are fetched from a collection's `/select` handler in one
//! request; the result set is materialized in memory. Documents are kept
//! as opaque JSON values.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

/// Strip query arguments from a Solr URL, keeping everything up to and
/// including `/select`.
pub fn format_solr_url(raw_url: &str) -> Result<String> {
    match raw_url.find("/select") {
        Some(pos) => Ok(raw_url[..pos + "/select".len()].to_string()),
        None => bail!(
            "Solr url has wrong format. Url must contain '/select', e.g. \
             http://localhost:8983/solr/basis-collection/select?q=*:*"
        ),
    }
}

/// Base query, restricted to documents changed since `since` when given.
pub fn generate_query(base_query: &str, since_field: &str, since: Option<&str>) -> String {
    match since {
        Some(since) => format!("{} AND {}:[{} TO NOW]", base_query, since_field, since),
        None => base_query.to_string(),
    }
}

/// Read the extra field list: one name per line, blank lines ignored.
pub fn read_field_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read field list: {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// `id_field` first, then `extra` without duplicates.
pub fn field_list(id_field: &str, extra: &[String]) -> Vec<String> {
    let mut fields = vec![id_field.to_string()];
    for field in extra {
        if !fields.contains(field) {
            fields.push(field.clone());
        }
    }
    fields
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    response: SelectResult,
}

#[derive(Debug, Deserialize)]
struct SelectResult {
    #[serde(rename = "numFound")]
    num_found: u64,
    #[serde(default)]
    docs: Vec<Value>,
}

pub struct SolrClient {
    select_url: String,
    client: Client,
}

impl SolrClient {
    /// `timeout_secs = None` waits for Solr indefinitely.
    pub fn new(select_url: impl Into<String>, timeout_secs: Option<u64>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout_secs.map(Duration::from_secs))
            .build()?;
        Ok(Self {
            select_url: select_url.into(),
            client,
        })
    }

    /// Number of documents matching `query`.
    pub fn count(&self, query: &str) -> Result<u64> {
        Ok(self.select(&count_params(query))?.num_found)
    }

    /// All documents matching `query`, restricted to `fields`.
    pub fn fetch_docs(&self, query: &str, fields: &[String], rows: u64) -> Result<Vec<Value>> {
        Ok(self.select(&fetch_params(query, fields, rows))?.docs)
    }

    fn select(&self, params: &[(&str, String)]) -> Result<SelectResult> {
        let resp = self
            .client
            .get(&self.select_url)
            .query(params)
            .send()
            .with_context(|| format!("Failed to query solr at {}", self.select_url))?;

        if !resp.status().is_success() {
            let body = resp.text().unwrap_or_default();
            bail!("Error from solr: {}", body);
        }

        let body = resp.text()?;
        parse_select_response(&body)
    }
}

fn count_params(query: &str) -> Vec<(&'static str, String)> {
    vec![
        ("q", query.to_string()),
        ("rows", "0".to_string()),
        ("wt", "json".to_string()),
    ]
}

/// One `fl` parameter per field.
fn fetch_params(query: &str, fields: &[String], rows: u64) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("q", query.to_string()),
        ("wt", "json".to_string()),
        ("rows", rows.to_string()),
    ];
    params.extend(fields.iter().map(|f| ("fl", f.clone())));
    params
}

fn parse_select_response(body: &str) -> Result<SelectResult> {
    let parsed: SelectResponse =
        serde_json::from_str(body).with_context(|| "Invalid response from solr")?;
    Ok(parsed.response)
}
