use anyhow::Result;
use oracle_core::schema::Insight;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::paths::DataPaths;
use crate::store;

const HIGHLIGHTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunitySummary {
    pub category: String,
    pub insight_count: usize,
    pub provinces: Vec<String>,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunitiesFile {
    pub generated_at: String,
    pub communities: Vec<CommunitySummary>,
}

/// Groups insights by category, skipping `excluded` (the catch-all bucket).
/// Sorted by insight count, largest first, then by name.
pub fn summarize(insights: &[Insight], excluded: &str) -> Vec<CommunitySummary> {
    let mut groups: BTreeMap<&str, (usize, BTreeSet<String>, Vec<String>)> = BTreeMap::new();
    for insight in insights {
        if insight.category == excluded {
            continue;
        }
        let (count, provinces, highlights) = groups.entry(insight.category.as_str()).or_default();
        *count += 1;
        if let Some(province) = &insight.province {
            provinces.insert(province.clone());
        }
        if highlights.len() < HIGHLIGHTS && !highlights.contains(&insight.title) {
            highlights.push(insight.title.clone());
        }
    }

    let mut out: Vec<CommunitySummary> = groups
        .into_iter()
        .map(|(category, (insight_count, provinces, highlights))| CommunitySummary {
            category: category.to_string(),
            insight_count,
            provinces: provinces.into_iter().collect(),
            highlights,
        })
        .collect();
    out.sort_by(|a, b| {
        b.insight_count
            .cmp(&a.insight_count)
            .then_with(|| a.category.cmp(&b.category))
    });
    out
}

pub fn write_communities(
    paths: &DataPaths,
    insights: &[Insight],
    excluded: &str,
    generated_at: &str,
) -> Result<usize> {
    let communities = summarize(insights, excluded);
    let count = communities.len();
    store::write_json_atomic(
        &paths.communities,
        &CommunitiesFile {
            generated_at: generated_at.to_string(),
            communities,
        },
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_core::schema::{Jurisdiction, Severity};

    fn insight(category: &str, title: &str, province: Option<&str>) -> Insight {
        Insight {
            severity: Severity::Low,
            category: category.to_string(),
            title: title.to_string(),
            description: String::new(),
            action: String::new(),
            timestamp: String::new(),
            action_buttons: vec![],
            sources: vec![],
            verified: true,
            verification_badge: String::new(),
            scope: Jurisdiction::Provincial,
            province: province.map(str::to_string),
            city: None,
        }
    }

    #[test]
    fn groups_and_orders_categories() {
        let insights = vec![
            insight("housing", "Shelter use", Some("ON")),
            insight("workers", "WSIB claims", Some("ON")),
            insight("workers", "WSIB claims", Some("BC")),
            insight("workers", "Injury rates", None),
            insight("government", "Budget", None),
        ];
        let summary = summarize(&insights, "government");
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].category, "workers");
        assert_eq!(summary[0].insight_count, 3);
        assert_eq!(summary[0].provinces, vec!["BC", "ON"]);
        assert_eq!(summary[0].highlights, vec!["WSIB claims", "Injury rates"]);
        assert_eq!(summary[1].category, "housing");
    }
}
