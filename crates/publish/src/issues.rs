use anyhow::{anyhow, Result};
use oracle_core::schema::VerifiedIssue;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use time::macros::format_description;
use time::Date;

const BUNDLED: &str = include_str!("../data/verified_issues.yaml");

/// The curated list shipped with the binary.
pub fn bundled() -> Result<Vec<VerifiedIssue>> {
    parse(BUNDLED)
}

pub fn load(path: &Path) -> Result<Vec<VerifiedIssue>> {
    let raw = fs::read_to_string(path)?;
    parse(&raw)
}

/// Loads `path` when given, otherwise the bundled list.
pub fn load_or_bundled(path: Option<&Path>) -> Result<Vec<VerifiedIssue>> {
    match path {
        Some(path) => load(path),
        None => bundled(),
    }
}

pub fn parse(raw: &str) -> Result<Vec<VerifiedIssue>> {
    let issues: Vec<VerifiedIssue> = serde_yaml::from_str(raw)?;
    validate(&issues)?;
    Ok(issues)
}

fn validate(issues: &[VerifiedIssue]) -> Result<()> {
    let mut seen = HashSet::new();
    for issue in issues {
        if issue.id.trim().is_empty() {
            return Err(anyhow!("verified issue `{}` has an empty id", issue.title));
        }
        if !seen.insert(issue.id.as_str()) {
            return Err(anyhow!("duplicate verified issue id `{}`", issue.id));
        }
        if !issue.source.url.starts_with("https://") {
            return Err(anyhow!("issue `{}` must cite an https source", issue.id));
        }
        if !is_iso_date(&issue.date) || !is_iso_date(&issue.last_verified) {
            return Err(anyhow!("issue `{}` has a malformed date", issue.id));
        }
    }
    Ok(())
}

fn is_iso_date(value: &str) -> bool {
    Date::parse(value, format_description!("[year]-[month]-[day]")).is_ok()
}
