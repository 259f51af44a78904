use anyhow::Result;
use oracle_core::schema::{Severity, SourceLink, VerifiedIssue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::paths::DataPaths;
use crate::store;

pub const POST_PREFIX: &str = "verified-";
pub const ALERT_PREFIX: &str = "alert-verified-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub title: String,
    pub content: String,
    pub severity: Severity,
    pub date: String,
    pub province: Option<String>,
    pub source: SourceLink,
    pub source_verified: bool,
    pub verified: bool,
    pub action: String,
    pub last_verified: String,
    pub published_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub severity: Severity,
    pub category: String,
    pub title: String,
    pub message: String,
    pub province: Option<String>,
    pub date: String,
    pub source: SourceLink,
    pub action: String,
    pub active: bool,
}

pub fn post_for(issue: &VerifiedIssue, published_at: &str) -> Post {
    Post {
        id: format!("{POST_PREFIX}{}", issue.id),
        kind: "verified-issue".to_string(),
        category: issue.category.clone(),
        title: issue.title.clone(),
        content: issue.summary.clone(),
        severity: issue.severity,
        date: issue.date.clone(),
        province: issue.province.clone(),
        source: issue.source.clone(),
        source_verified: issue.source_verified,
        verified: issue.source_verified,
        action: issue.action.clone(),
        last_verified: issue.last_verified.clone(),
        published_at: published_at.to_string(),
    }
}

/// Only high and critical issues are raised as alerts.
pub fn alert_for(issue: &VerifiedIssue) -> Option<Alert> {
    if issue.severity < Severity::High {
        return None;
    }
    Some(Alert {
        id: format!("{ALERT_PREFIX}{}", issue.id),
        severity: issue.severity,
        category: issue.category.clone(),
        title: issue.title.clone(),
        message: issue.summary.clone(),
        province: issue.province.clone(),
        date: issue.date.clone(),
        source: issue.source.clone(),
        action: issue.action.clone(),
        active: true,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishSummary {
    pub posts_written: usize,
    pub posts_total: usize,
    pub alerts_written: usize,
    pub alerts_total: usize,
}

/// Rewrites the verified-issue portion of both stores. Entries that do not
/// carry our prefixes are left alone, and re-running never duplicates an id.
pub fn publish_issues(
    paths: &DataPaths,
    issues: &[VerifiedIssue],
    published_at: &str,
) -> Result<PublishSummary> {
    let posts = issues
        .iter()
        .map(|issue| serde_json::to_value(post_for(issue, published_at)))
        .collect::<Result<Vec<Value>, _>>()?;
    let alerts = issues
        .iter()
        .filter_map(alert_for)
        .map(serde_json::to_value)
        .collect::<Result<Vec<Value>, _>>()?;

    let posts_written = posts.len();
    let alerts_written = alerts.len();
    let posts_total = store::merge_store(&paths.posts, POST_PREFIX, posts)?;
    let alerts_total = store::merge_store(&paths.alerts, ALERT_PREFIX, alerts)?;

    info!(
        posts = posts_written,
        alerts = alerts_written,
        posts_total,
        alerts_total,
        "published verified issues"
    );

    Ok(PublishSummary {
        posts_written,
        posts_total,
        alerts_written,
        alerts_total,
    })
}
