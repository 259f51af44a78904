use async_trait::async_trait;
use oracle_core::config::{Config, SourceConfig};
use oracle_core::schema::Jurisdiction;
use oracle_core::snapshot::{ConnectorReport, Payload, SourceKind};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::bills::BillsConnector;
use crate::ckan::CkanConnector;
use crate::error::FetchError;
use crate::rss::RssConnector;

/// What a connector produced on success.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub total_count: u64,
    pub payload: Payload,
}

/// One outbound call to a single jurisdiction's catalogue or feed.
#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    fn jurisdiction(&self) -> Jurisdiction;

    fn endpoint(&self) -> &str;

    /// Performs the request. `fetched_at` is stamped onto every record.
    async fn fetch(&self, fetched_at: &str) -> Result<Fetched, FetchError>;
}

/// Runs `connector` under `timeout`. Always yields a report; errors become
/// `success: false` with an empty collection.
pub async fn run_connector(connector: &dyn Connector, timeout: Duration) -> ConnectorReport {
    let fetched_at = oracle_core::now_iso();
    let outcome = match tokio::time::timeout(timeout, connector.fetch(&fetched_at)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout),
    };

    match outcome {
        Ok(fetched) => {
            debug!(
                source = connector.name(),
                records = fetched.payload.len(),
                total = fetched.total_count,
                "connector succeeded"
            );
            ConnectorReport {
                success: true,
                source: connector.name().to_string(),
                source_url: connector.endpoint().to_string(),
                jurisdiction: connector.jurisdiction(),
                total_count: fetched.total_count,
                payload: fetched.payload,
                error: None,
                fetched_at,
            }
        }
        Err(e) => {
            warn!(source = connector.name(), url = connector.endpoint(), error = %e, "connector failed");
            ConnectorReport::failed(
                connector.name(),
                connector.endpoint(),
                connector.jurisdiction(),
                connector.kind(),
                e.to_string(),
                fetched_at,
            )
        }
    }
}

/// Builds the connector for one configured source.
pub fn connector_for(
    source: &SourceConfig,
    config: &Config,
    client: &Client,
) -> Box<dyn Connector> {
    let keywords = config.keywords_for(source).to_vec();
    match source.kind {
        SourceKind::Ckan => Box::new(CkanConnector::new(
            source.clone(),
            keywords,
            config.rows_for(source),
            client.clone(),
        )),
        SourceKind::Bills => Box::new(BillsConnector::new(source.clone(), keywords, client.clone())),
        // Feeds are only filtered by keywords set on the feed itself.
        SourceKind::Rss => Box::new(RssConnector::new(
            source.clone(),
            source.keywords.clone().unwrap_or_default(),
            client.clone(),
        )),
    }
}

/// Case-insensitive "any keyword occurs in any of `fields`". An empty keyword
/// list matches everything.
pub(crate) fn matches_keywords(keywords: &[String], fields: &[&str]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let haystack = fields.join(" ").to_lowercase();
    keywords
        .iter()
        .any(|kw| haystack.contains(kw.to_lowercase().as_str()))
}
