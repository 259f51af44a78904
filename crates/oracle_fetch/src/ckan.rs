use async_trait::async_trait;
use oracle_core::config::SourceConfig;
use oracle_core::schema::{DatasetRecord, Jurisdiction};
use oracle_core::snapshot::{Payload, SourceKind};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::connector::{Connector, Fetched};
use crate::error::FetchError;
use crate::http;

pub struct CkanConnector {
    source: SourceConfig,
    keywords: Vec<String>,
    rows: u32,
    client: Client,
}

impl CkanConnector {
    pub fn new(source: SourceConfig, keywords: Vec<String>, rows: u32, client: Client) -> Self {
        Self {
            source,
            keywords,
            rows,
            client,
        }
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("q", or_query(&self.keywords)),
            ("rows", self.rows.to_string()),
            ("sort", "metadata_modified desc".to_string()),
        ]
    }
}

#[async_trait]
impl Connector for CkanConnector {
    fn name(&self) -> &str {
        &self.source.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Ckan
    }

    fn jurisdiction(&self) -> Jurisdiction {
        self.source.jurisdiction
    }

    fn endpoint(&self) -> &str {
        &self.source.url
    }

    async fn fetch(&self, fetched_at: &str) -> Result<Fetched, FetchError> {
        let body = http::get_text(&self.client, &self.source.url, &self.query()).await?;
        parse_package_search(&body, &self.source, fetched_at)
    }
}

/// `kw1 OR "two words" OR kw3`
pub fn or_query(keywords: &[String]) -> String {
    keywords
        .iter()
        .map(|kw| kw.trim())
        .filter(|kw| !kw.is_empty())
        .map(|kw| {
            if kw.contains(char::is_whitespace) {
                format!("\"{kw}\"")
            } else {
                kw.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: Option<bool>,
    result: Option<SearchResult>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    results: Vec<Package>,
}

#[derive(Debug, Deserialize)]
struct Package {
    id: Option<String>,
    name: Option<String>,
    title: Option<String>,
    notes: Option<String>,
    organization: Option<Organization>,
    metadata_modified: Option<String>,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct Organization {
    title: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: Option<String>,
    display_name: Option<String>,
}

pub fn parse_package_search(
    body: &str,
    source: &SourceConfig,
    fetched_at: &str,
) -> Result<Fetched, FetchError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    if envelope.success != Some(true) {
        let detail = envelope
            .error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "`success` is not true".to_string());
        return Err(FetchError::Malformed(detail));
    }
    let result = envelope
        .result
        .ok_or_else(|| FetchError::Malformed("missing `result`".to_string()))?;

    let portal = portal_base(&source.url);
    let verification_source = http::source_host(&source.url);

    let mut datasets = Vec::with_capacity(result.results.len());
    for package in result.results {
        let Some(id) = package.id.clone().or_else(|| package.name.clone()) else {
            debug!(source = %source.name, "skipping package without id or name");
            continue;
        };
        let slug = package.name.clone().unwrap_or_else(|| id.clone());
        let title = non_empty(package.title)
            .or_else(|| package.name.clone())
            .unwrap_or_else(|| id.clone());
        let organization = package
            .organization
            .and_then(|org| non_empty(org.title).or(org.name))
            .unwrap_or_else(|| source.name.clone());
        let tags = package
            .tags
            .into_iter()
            .filter_map(|tag| tag.display_name.or(tag.name))
            .collect();

        datasets.push(DatasetRecord {
            id,
            title,
            description: package.notes.unwrap_or_default().trim().to_string(),
            organization,
            url: format!("{portal}/dataset/{slug}"),
            last_updated: package.metadata_modified,
            tags,
            verified: true,
            verification_source: verification_source.clone(),
            jurisdiction: source.jurisdiction,
            province: source.province.clone(),
            city: source.city.clone(),
            fetched_at: fetched_at.to_string(),
        });
    }

    Ok(Fetched {
        total_count: result.count,
        payload: Payload::Datasets(datasets),
    })
}

/// Catalogue root: the endpoint with its `/api/...` suffix removed.
fn portal_base(endpoint: &str) -> String {
    match endpoint.find("/api/") {
        Some(idx) => endpoint[..idx].to_string(),
        None => http::origin(endpoint),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> SourceConfig {
        oracle_core::config::Config::from_toml(
            r#"
[[sources]]
name = "City of Toronto Open Data"
kind = "ckan"
jurisdiction = "municipal"
url = "https://ckan0.cf.opendata.inter.prod-toronto.ca/api/3/action/package_search"
province = "ON"
city = "Toronto"
"#,
        )
        .unwrap()
        .sources
        .remove(0)
    }

    #[test]
    fn or_query_quotes_phrases() {
        let keywords = vec![
            "WSIB".to_string(),
            "workers compensation".to_string(),
            " ".to_string(),
        ];
        assert_eq!(or_query(&keywords), "WSIB OR \"workers compensation\"");
    }

    #[test]
    fn maps_packages_to_dataset_records() {
        let body = json!({
            "success": true,
            "result": {
                "count": 42,
                "results": [{
                    "id": "abc-123",
                    "name": "shelter-occupancy",
                    "title": "Daily Shelter Occupancy",
                    "notes": "  Occupancy by site.  ",
                    "organization": {"title": "Shelter Support", "name": "ssha"},
                    "metadata_modified": "2026-10-01T08:00:00.000000",
                    "tags": [{"name": "housing", "display_name": "Housing"}]
                }]
            }
        })
        .to_string();

        let fetched = parse_package_search(&body, &source(), "2026-10-16T00:00:00Z").unwrap();
        assert_eq!(fetched.total_count, 42);
        let Payload::Datasets(datasets) = fetched.payload else {
            panic!("expected datasets");
        };
        let record = &datasets[0];
        assert_eq!(record.id, "abc-123");
        assert_eq!(record.description, "Occupancy by site.");
        assert_eq!(record.organization, "Shelter Support");
        assert_eq!(
            record.url,
            "https://ckan0.cf.opendata.inter.prod-toronto.ca/dataset/shelter-occupancy"
        );
        assert_eq!(record.tags, vec!["Housing"]);
        assert_eq!(record.verification_source, "ckan0.cf.opendata.inter.prod-toronto.ca");
        assert_eq!(record.city.as_deref(), Some("Toronto"));
        assert_eq!(record.jurisdiction, Jurisdiction::Municipal);
    }

    #[test]
    fn missing_title_falls_back_to_name() {
        let body = json!({
            "success": true,
            "result": {"count": 1, "results": [{"id": "x", "name": "slug", "title": ""}]}
        })
        .to_string();
        let fetched = parse_package_search(&body, &source(), "t").unwrap();
        let Payload::Datasets(datasets) = fetched.payload else {
            panic!("expected datasets");
        };
        assert_eq!(datasets[0].title, "slug");
        assert_eq!(datasets[0].organization, "City of Toronto Open Data");
    }

    #[test]
    fn unsuccessful_envelope_is_malformed() {
        let body = json!({"success": false, "error": {"message": "Search error"}}).to_string();
        let err = parse_package_search(&body, &source(), "t").unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));

        let body = json!({"success": true}).to_string();
        let err = parse_package_search(&body, &source(), "t").unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn non_json_body_is_parse_error() {
        let err = parse_package_search("<html>", &source(), "t").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
