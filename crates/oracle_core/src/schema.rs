use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Jurisdiction {
    Federal,
    Provincial,
    Territorial,
    Municipal,
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Jurisdiction::Federal => "federal",
            Jurisdiction::Provincial => "provincial",
            Jurisdiction::Territorial => "territorial",
            Jurisdiction::Municipal => "municipal",
        };
        write!(f, "{value}")
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{value}")
    }
}

/// One catalogue entry from a CKAN `package_search` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub organization: String,
    pub url: String,
    pub last_updated: Option<String>, // ISO-8601 as reported by the portal
    pub tags: Vec<String>,
    pub verified: bool,
    pub verification_source: String, // host of the portal that served the record
    pub jurisdiction: Jurisdiction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub fetched_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillRecord {
    pub bill_number: String,
    pub title: String,
    pub short_title: Option<String>,
    pub status: Option<String>,
    pub sponsor: Option<String>,
    pub parliament: Option<u32>,
    pub session: Option<u32>,
    pub url: String,
    pub last_updated: Option<String>,
    pub verified: bool,
    pub verification_source: String,
    pub fetched_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    pub url: String,
    pub description: String,
    pub published_at: Option<String>,
    pub source: String,
    pub category: Option<String>,
    pub jurisdiction: Jurisdiction,
    pub verified: bool,
    pub verification_source: String,
    pub fetched_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SourceLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActionButton {
    pub label: String,
    pub url: String,
}

/// Display-facing record handed to the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub severity: Severity,
    pub category: String,
    pub title: String,
    pub description: String,
    pub action: String,
    pub timestamp: String,
    pub action_buttons: Vec<ActionButton>,
    pub sources: Vec<SourceLink>,
    pub verified: bool,
    pub verification_badge: String,
    pub scope: Jurisdiction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// Hand-curated, source-cited claim shipped with the publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedIssue {
    pub id: String,
    pub category: String,
    pub title: String,
    pub summary: String,
    pub severity: Severity,
    pub date: String, // YYYY-MM-DD
    pub province: Option<String>,
    pub source: SourceLink,
    pub source_verified: bool,
    pub action: String,
    pub last_verified: String,
}
