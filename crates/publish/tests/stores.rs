use publish::posts::{publish_issues, ALERT_PREFIX, POST_PREFIX};
use publish::report::{build_daily_report, write_daily_report, HistoryEntry};
use publish::{issues, DataPaths};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fs;
use time::macros::datetime;

fn read_array(path: &std::path::Path) -> Vec<Value> {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn ids(entries: &[Value]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|e| e["id"].as_str().map(str::to_string))
        .collect()
}

#[test]
fn repeated_publish_runs_never_duplicate_ids() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    paths.ensure().unwrap();
    fs::write(
        &paths.posts,
        serde_json::to_string(&vec![
            json!({"id": "community-42", "title": "Hand-written post"}),
            json!({"id": "verified-retired-issue", "title": "No longer curated"}),
        ])
        .unwrap(),
    )
    .unwrap();

    let issues = issues::bundled().unwrap();
    let first = publish_issues(&paths, &issues, "2026-10-16T00:00:00Z").unwrap();
    let second = publish_issues(&paths, &issues, "2026-10-17T00:00:00Z").unwrap();

    assert_eq!(first.posts_total, second.posts_total);
    assert_eq!(second.posts_total, issues.len() + 1);

    let posts = read_array(&paths.posts);
    let post_ids = ids(&posts);
    let unique: HashSet<_> = post_ids.iter().collect();
    assert_eq!(unique.len(), post_ids.len());
    assert!(post_ids.contains(&"community-42".to_string()));
    assert!(!post_ids.contains(&"verified-retired-issue".to_string()));
    assert_eq!(
        post_ids.iter().filter(|id| id.starts_with(POST_PREFIX)).count(),
        issues.len()
    );
    assert_eq!(posts.last().unwrap()["publishedAt"], "2026-10-17T00:00:00Z");

    let alerts = read_array(&paths.alerts);
    assert_eq!(alerts.len(), second.alerts_total);
    assert!(ids(&alerts).iter().all(|id| id.starts_with(ALERT_PREFIX)));
    assert!(alerts.iter().all(|a| a["severity"] == "high" || a["severity"] == "critical"));
}

#[test]
fn daily_report_updates_history_once_per_day() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path().join("public").join("data"));
    let issues = issues::bundled().unwrap();

    let report = build_daily_report(&issues, &[], 2, datetime!(2026-10-16 12:00 UTC));
    write_daily_report(&paths, &report).unwrap();
    let len = write_daily_report(&paths, &report).unwrap();
    assert_eq!(len, 1);

    let next = build_daily_report(&issues, &[], 0, datetime!(2026-10-17 12:00 UTC));
    assert_eq!(write_daily_report(&paths, &next).unwrap(), 2);

    let history: Vec<HistoryEntry> =
        serde_json::from_str(&fs::read_to_string(&paths.report_history).unwrap()).unwrap();
    assert_eq!(history[0].date, "2026-10-17");
    assert_eq!(history[1].new_datasets, 2);

    let daily: Value = serde_json::from_str(&fs::read_to_string(&paths.daily_report).unwrap()).unwrap();
    assert_eq!(daily["date"], "2026-10-17");
    assert_eq!(daily["topIssues"][0]["severity"], "critical");
}

#[cfg(target_os = "linux")]
#[test]
fn publish_recovers_from_lock_left_by_killed_run() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    paths.ensure().unwrap();
    let lock = dir.path().join(".eye-oracle-posts.json.lock");
    fs::write(&lock, "4000000000\n").unwrap();

    let issues = issues::bundled().unwrap();
    let summary = publish_issues(&paths, &issues, "2026-10-16T00:00:00Z").unwrap();
    assert_eq!(summary.posts_total, issues.len());
    assert!(!lock.exists());
}
