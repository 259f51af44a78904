use async_trait::async_trait;
use futures::future::join_all;
use oracle_core::config::Config;
use oracle_core::schema::Jurisdiction;
use oracle_core::snapshot::{ConnectorReport, Snapshot, SourceKind};
use std::time::Duration;
use tracing::info;

use crate::connector::{connector_for, run_connector, Connector};
use crate::error::FetchError;
use crate::http;

/// Anything that can produce a fresh snapshot. The cache is generic over this
/// so tests can count passes.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn collect(&self) -> Snapshot;
}

pub struct Aggregator {
    connectors: Vec<Box<dyn Connector>>,
    timeout: Duration,
}

impl Aggregator {
    pub fn new(connectors: Vec<Box<dyn Connector>>, timeout: Duration) -> Self {
        Self {
            connectors,
            timeout,
        }
    }

    /// One connector per effective source, all sharing one HTTP client.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let timeout = config.general.request_timeout();
        let client = http::build_client(&config.general.user_agent, timeout)?;
        let connectors = config
            .effective_sources()
            .iter()
            .map(|source| connector_for(source, config, &client))
            .collect();
        Ok(Self::new(connectors, timeout))
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    /// Fans out to every connector concurrently and waits for all of them.
    pub async fn run(&self) -> Snapshot {
        info!(connectors = self.connectors.len(), "starting aggregation pass");
        let reports = join_all(
            self.connectors
                .iter()
                .map(|connector| run_connector(connector.as_ref(), self.timeout)),
        )
        .await;

        let kinds: Vec<SourceKind> = self.connectors.iter().map(|c| c.kind()).collect();
        let snapshot = partition(kinds.into_iter().zip(reports), oracle_core::now_iso());
        info!(
            succeeded = snapshot.success_count,
            failed = snapshot.errors.len(),
            "aggregation pass finished"
        );
        snapshot
    }
}

#[async_trait]
impl SnapshotSource for Aggregator {
    async fn collect(&self) -> Snapshot {
        self.run().await
    }
}

/// Sorts reports into their scope buckets and records one error line per
/// failed report.
pub fn partition(
    reports: impl IntoIterator<Item = (SourceKind, ConnectorReport)>,
    fetched_at: String,
) -> Snapshot {
    let mut snapshot = Snapshot {
        fetched_at,
        ..Snapshot::default()
    };

    for (kind, report) in reports {
        snapshot.connector_count += 1;
        if report.success {
            snapshot.success_count += 1;
        } else {
            let reason = report.error.as_deref().unwrap_or("unknown error");
            snapshot.errors.push(format!("{}: {}", report.source, reason));
        }

        let bucket = match (kind, report.jurisdiction) {
            (SourceKind::Bills, _) => &mut snapshot.legislation,
            (SourceKind::Rss, _) => &mut snapshot.news,
            (SourceKind::Ckan, Jurisdiction::Federal) => &mut snapshot.federal,
            (SourceKind::Ckan, Jurisdiction::Provincial) => &mut snapshot.provincial,
            (SourceKind::Ckan, Jurisdiction::Territorial) => &mut snapshot.territorial,
            (SourceKind::Ckan, Jurisdiction::Municipal) => &mut snapshot.municipal,
        };
        bucket.push(report);
    }

    snapshot
}
