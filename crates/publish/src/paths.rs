use anyhow::Result;
use std::fs;
use std::path::PathBuf;

/// Files under the public data directory that the front end fetches.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub root: PathBuf,
    pub alerts: PathBuf,
    pub posts: PathBuf,
    pub communities: PathBuf,
    pub daily_report: PathBuf,
    pub report_history: PathBuf,
    pub insights: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            alerts: root.join("alerts.json"),
            posts: root.join("eye-oracle-posts.json"),
            communities: root.join("vulnerable-communities.json"),
            daily_report: root.join("daily-eye-viral-report.json"),
            report_history: root.join("eye-viral-report-history.json"),
            insights: root.join("eye-oracle-insights.json"),
            root,
        }
    }

    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}
