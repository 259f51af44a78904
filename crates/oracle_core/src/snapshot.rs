use crate::schema::{BillRecord, DatasetRecord, Jurisdiction, NewsItem};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Ckan,
    Bills,
    Rss,
}

/// Records returned by one connector; serialized under the collection's own
/// key (`datasets`, `bills` or `items`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Payload {
    Datasets(Vec<DatasetRecord>),
    Bills(Vec<BillRecord>),
    Items(Vec<NewsItem>),
}

impl Payload {
    pub fn empty(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Ckan => Payload::Datasets(Vec::new()),
            SourceKind::Bills => Payload::Bills(Vec::new()),
            SourceKind::Rss => Payload::Items(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Datasets(v) => v.len(),
            Payload::Bills(v) => v.len(),
            Payload::Items(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorReport {
    pub success: bool,
    pub source: String,
    pub source_url: String,
    pub jurisdiction: Jurisdiction,
    pub total_count: u64,
    #[serde(flatten)]
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub fetched_at: String,
}

impl ConnectorReport {
    pub fn failed(
        source: impl Into<String>,
        source_url: impl Into<String>,
        jurisdiction: Jurisdiction,
        kind: SourceKind,
        error: impl Into<String>,
        fetched_at: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            source: source.into(),
            source_url: source_url.into(),
            jurisdiction,
            total_count: 0,
            payload: Payload::empty(kind),
            error: Some(error.into()),
            fetched_at: fetched_at.into(),
        }
    }

    pub fn datasets(&self) -> &[DatasetRecord] {
        match &self.payload {
            Payload::Datasets(v) => v,
            _ => &[],
        }
    }

    pub fn bills(&self) -> &[BillRecord] {
        match &self.payload {
            Payload::Bills(v) => v,
            _ => &[],
        }
    }

    pub fn items(&self) -> &[NewsItem] {
        match &self.payload {
            Payload::Items(v) => v,
            _ => &[],
        }
    }
}

/// Result of one aggregation pass over every configured connector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub federal: Vec<ConnectorReport>,
    pub provincial: Vec<ConnectorReport>,
    pub territorial: Vec<ConnectorReport>,
    pub municipal: Vec<ConnectorReport>,
    pub legislation: Vec<ConnectorReport>,
    pub news: Vec<ConnectorReport>,
    pub errors: Vec<String>,
    pub connector_count: usize,
    pub success_count: usize,
    pub fetched_at: String,
}

impl Snapshot {
    /// Reports in publication order: the four scopes, then bills, then news.
    pub fn reports(&self) -> impl Iterator<Item = &ConnectorReport> {
        self.federal
            .iter()
            .chain(&self.provincial)
            .chain(&self.territorial)
            .chain(&self.municipal)
            .chain(&self.legislation)
            .chain(&self.news)
    }

    pub fn datasets(&self) -> impl Iterator<Item = &DatasetRecord> {
        self.reports().flat_map(|report| report.datasets().iter())
    }

    pub fn failed_count(&self) -> usize {
        self.reports().filter(|report| !report.success).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_report_serializes_empty_collection_under_its_key() {
        let report = ConnectorReport::failed(
            "Open Government Canada",
            "https://open.canada.ca/data/api/3/action/package_search",
            Jurisdiction::Federal,
            SourceKind::Ckan,
            "HTTP 503",
            "2026-01-01T00:00:00Z",
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "HTTP 503");
        assert_eq!(json["datasets"], serde_json::json!([]));
        assert_eq!(json["sourceUrl"], "https://open.canada.ca/data/api/3/action/package_search");
    }

    #[test]
    fn news_report_uses_items_key() {
        let report = ConnectorReport::failed(
            "feed",
            "https://example.org/rss",
            Jurisdiction::Provincial,
            SourceKind::Rss,
            "boom",
            "2026-01-01T00:00:00Z",
        );
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("items").is_some());
        assert!(json.get("datasets").is_none());
    }
}
