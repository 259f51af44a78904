use anyhow::Result;
use oracle_core::schema::{Insight, Severity, SourceLink, VerifiedIssue};
use oracle_core::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use tracing::info;

use crate::paths::DataPaths;
use crate::store::{self, StoreLease, LEASE_TIMEOUT};

pub const HISTORY_LIMIT: usize = 30;
const TOP_ISSUES: usize = 5;
const HASHTAG: &str = "#InjuredWorkersUnite";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportIssue {
    pub id: String,
    pub title: String,
    pub category: String,
    pub severity: Severity,
    pub province: Option<String>,
    pub source: SourceLink,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub date: String,
    pub generated_at: String,
    pub headline: String,
    pub top_issues: Vec<ReportIssue>,
    pub category_counts: BTreeMap<String, usize>,
    pub new_datasets: usize,
    pub insight_count: usize,
    pub share_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub date: String,
    pub headline: String,
    pub insight_count: usize,
    pub new_datasets: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsExport {
    pub generated_at: String,
    pub fetched_at: String,
    pub errors: Vec<String>,
    pub insights: Vec<Insight>,
}

/// Most severe first, then most recent, then by id.
pub fn top_issues(issues: &[VerifiedIssue], limit: usize) -> Vec<ReportIssue> {
    let mut ranked: Vec<&VerifiedIssue> = issues.iter().collect();
    ranked.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.date.cmp(&a.date))
            .then_with(|| a.id.cmp(&b.id))
    });
    ranked
        .into_iter()
        .take(limit)
        .map(|issue| ReportIssue {
            id: issue.id.clone(),
            title: issue.title.clone(),
            category: issue.category.clone(),
            severity: issue.severity,
            province: issue.province.clone(),
            source: issue.source.clone(),
        })
        .collect()
}

pub fn category_counts(insights: &[Insight]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for insight in insights {
        *counts.entry(insight.category.clone()).or_insert(0) += 1;
    }
    counts
}

pub fn build_daily_report(
    issues: &[VerifiedIssue],
    insights: &[Insight],
    new_datasets: usize,
    now: OffsetDateTime,
) -> DailyReport {
    let top = top_issues(issues, TOP_ISSUES);
    let headline = match top.first() {
        Some(issue) => format!("Today's top verified issue: {}", issue.title),
        None => "No verified issues today".to_string(),
    };
    let share_text = format!(
        "{headline}. {} live government data points tracked, {new_datasets} new. {HASHTAG}",
        insights.len()
    );

    DailyReport {
        date: oracle_core::iso_date(now),
        generated_at: oracle_core::format_iso(now),
        headline,
        top_issues: top,
        category_counts: category_counts(insights),
        new_datasets,
        insight_count: insights.len(),
        share_text,
    }
}

/// Replaces any entry for the same date, keeps newest first, caps the length.
pub fn update_history(mut history: Vec<HistoryEntry>, entry: HistoryEntry) -> Vec<HistoryEntry> {
    history.retain(|existing| existing.date != entry.date);
    history.push(entry);
    history.sort_by(|a, b| b.date.cmp(&a.date));
    history.truncate(HISTORY_LIMIT);
    history
}

/// Writes today's report and folds it into the history file.
pub fn write_daily_report(paths: &DataPaths, report: &DailyReport) -> Result<usize> {
    store::write_json_atomic(&paths.daily_report, report)?;

    let _lease = StoreLease::acquire(&paths.report_history, LEASE_TIMEOUT)?;
    let history: Vec<HistoryEntry> = store::read_json_or_default(&paths.report_history)?;
    let history = update_history(
        history,
        HistoryEntry {
            date: report.date.clone(),
            headline: report.headline.clone(),
            insight_count: report.insight_count,
            new_datasets: report.new_datasets,
        },
    );
    store::write_json_atomic(&paths.report_history, &history)?;

    info!(date = %report.date, history = history.len(), "wrote daily report");
    Ok(history.len())
}

pub fn write_insights(
    paths: &DataPaths,
    snapshot: &Snapshot,
    insights: Vec<Insight>,
    generated_at: &str,
) -> Result<()> {
    let export = InsightsExport {
        generated_at: generated_at.to_string(),
        fetched_at: snapshot.fetched_at.clone(),
        errors: snapshot.errors.clone(),
        insights,
    };
    store::write_json_atomic(&paths.insights, &export)?;
    info!(insights = export.insights.len(), "wrote insights export");
    Ok(())
}
