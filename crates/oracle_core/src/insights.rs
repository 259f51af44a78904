use crate::classify::Classifier;
use crate::schema::{
    ActionButton, BillRecord, DatasetRecord, Insight, Jurisdiction, NewsItem, Severity, SourceLink,
};
use crate::snapshot::{ConnectorReport, Snapshot};

/// Flattens every successful record in `snapshot` into display insights.
///
/// Pure: the same snapshot and classifier always produce the same list.
pub fn to_insights(snapshot: &Snapshot, classifier: &Classifier) -> Vec<Insight> {
    let mut out = Vec::new();
    for report in snapshot.reports() {
        append_report(report, classifier, &mut out);
    }
    out
}

fn append_report(report: &ConnectorReport, classifier: &Classifier, out: &mut Vec<Insight>) {
    for dataset in report.datasets() {
        out.push(dataset_insight(dataset, &report.source, classifier));
    }
    for bill in report.bills() {
        out.push(bill_insight(bill, &report.source, classifier));
    }
    for item in report.items() {
        out.push(news_insight(item, classifier));
    }
}

pub fn verification_badge(verified: bool, source: &str) -> String {
    if verified {
        format!("Verified: {source}")
    } else {
        "Unverified".to_string()
    }
}

fn dataset_insight(dataset: &DatasetRecord, source: &str, classifier: &Classifier) -> Insight {
    let category = classifier
        .classify(&dataset.title, &dataset.description)
        .to_string();
    Insight {
        severity: Severity::Low,
        category,
        title: dataset.title.clone(),
        description: summarize(&dataset.description, &dataset.organization),
        action: "Review the dataset and share what it shows".to_string(),
        timestamp: dataset
            .last_updated
            .clone()
            .unwrap_or_else(|| dataset.fetched_at.clone()),
        action_buttons: vec![ActionButton {
            label: "View data".to_string(),
            url: dataset.url.clone(),
        }],
        sources: vec![SourceLink {
            name: source.to_string(),
            url: dataset.url.clone(),
        }],
        verified: dataset.verified,
        verification_badge: verification_badge(dataset.verified, &dataset.verification_source),
        scope: dataset.jurisdiction,
        province: dataset.province.clone(),
        city: dataset.city.clone(),
    }
}

fn bill_insight(bill: &BillRecord, source: &str, classifier: &Classifier) -> Insight {
    let text = bill.short_title.as_deref().unwrap_or_default();
    let category = classifier.classify(&bill.title, text).to_string();
    let severity = match category.as_str() {
        "workers" | "disabilities" => Severity::High,
        _ => Severity::Medium,
    };

    let mut description = format!("Bill {}", bill.bill_number);
    if let Some(status) = &bill.status {
        description.push_str(&format!(" is at stage: {status}"));
    }
    if let Some(sponsor) = &bill.sponsor {
        description.push_str(&format!(". Sponsor: {sponsor}"));
    }

    Insight {
        severity,
        category,
        title: bill.title.clone(),
        description,
        action: "Contact your MP about this bill".to_string(),
        timestamp: bill
            .last_updated
            .clone()
            .unwrap_or_else(|| bill.fetched_at.clone()),
        action_buttons: vec![
            ActionButton {
                label: "Read the bill".to_string(),
                url: bill.url.clone(),
            },
            ActionButton {
                label: "Find your MP".to_string(),
                url: "https://www.ourcommons.ca/members/en".to_string(),
            },
        ],
        sources: vec![SourceLink {
            name: source.to_string(),
            url: bill.url.clone(),
        }],
        verified: bill.verified,
        verification_badge: verification_badge(bill.verified, &bill.verification_source),
        scope: Jurisdiction::Federal,
        province: None,
        city: None,
    }
}

fn news_insight(item: &NewsItem, classifier: &Classifier) -> Insight {
    // Feed-supplied categories only fill in when no rule matched.
    let classified = classifier.classify(&item.title, &item.description);
    let category = match &item.category {
        Some(feed) if classified == classifier.fallback() => feed.clone(),
        _ => classified.to_string(),
    };
    Insight {
        severity: Severity::Medium,
        category,
        title: item.title.clone(),
        description: item.description.clone(),
        action: "Read the announcement".to_string(),
        timestamp: item
            .published_at
            .clone()
            .unwrap_or_else(|| item.fetched_at.clone()),
        action_buttons: vec![ActionButton {
            label: "Read more".to_string(),
            url: item.url.clone(),
        }],
        sources: vec![SourceLink {
            name: item.source.clone(),
            url: item.url.clone(),
        }],
        verified: item.verified,
        verification_badge: verification_badge(item.verified, &item.verification_source),
        scope: item.jurisdiction,
        province: None,
        city: None,
    }
}

fn summarize(description: &str, organization: &str) -> String {
    const MAX_CHARS: usize = 280;
    let trimmed = description.trim();
    if trimmed.is_empty() {
        format!("Published by {organization}.")
    } else if trimmed.chars().count() > MAX_CHARS {
        let cut: String = trimmed.chars().take(MAX_CHARS).collect();
        format!("{}…", cut.trim_end())
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Payload;

    fn dataset(id: &str, title: &str) -> DatasetRecord {
        DatasetRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            organization: "Employment and Social Development Canada".to_string(),
            url: format!("https://open.canada.ca/data/en/dataset/{id}"),
            last_updated: Some("2026-03-01T12:00:00".to_string()),
            tags: vec![],
            verified: true,
            verification_source: "open.canada.ca".to_string(),
            jurisdiction: Jurisdiction::Federal,
            province: None,
            city: None,
            fetched_at: "2026-10-16T00:00:00Z".to_string(),
        }
    }

    fn federal_snapshot(datasets: Vec<DatasetRecord>) -> Snapshot {
        Snapshot {
            federal: vec![ConnectorReport {
                success: true,
                source: "Open Government Canada".to_string(),
                source_url: "https://open.canada.ca/data/api/3/action/package_search".to_string(),
                jurisdiction: Jurisdiction::Federal,
                total_count: datasets.len() as u64,
                payload: Payload::Datasets(datasets),
                error: None,
                fetched_at: "2026-10-16T00:00:00Z".to_string(),
            }],
            connector_count: 1,
            success_count: 1,
            ..Snapshot::default()
        }
    }

    #[test]
    fn classifies_and_badges_federal_datasets() {
        let snapshot = federal_snapshot(vec![
            dataset("a", "WSIB Claims Data"),
            dataset("b", "Accessibility Grants"),
        ]);
        let insights = to_insights(&snapshot, &Classifier::default());

        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].category, "workers");
        assert_eq!(insights[1].category, "disabilities");
        for insight in &insights {
            assert!(insight.verified);
            assert!(insight.verification_badge.contains("open.canada.ca"));
            assert_eq!(insight.scope, Jurisdiction::Federal);
        }
    }

    #[test]
    fn conversion_is_idempotent() {
        let snapshot = federal_snapshot(vec![dataset("a", "WSIB Claims Data")]);
        let classifier = Classifier::default();
        assert_eq!(
            to_insights(&snapshot, &classifier),
            to_insights(&snapshot, &classifier)
        );
    }

    #[test]
    fn empty_description_falls_back_to_organization() {
        let snapshot = federal_snapshot(vec![dataset("a", "Tables")]);
        let insights = to_insights(&snapshot, &Classifier::default());
        assert_eq!(
            insights[0].description,
            "Published by Employment and Social Development Canada."
        );
        assert_eq!(insights[0].timestamp, "2026-03-01T12:00:00");
    }

    #[test]
    fn workers_bill_is_high_severity() {
        let bill = BillRecord {
            bill_number: "C-123".to_string(),
            title: "An Act to amend the Canada Labour Code".to_string(),
            short_title: None,
            status: Some("Second reading".to_string()),
            sponsor: None,
            parliament: Some(45),
            session: Some(1),
            url: "https://www.parl.ca/legisinfo/en/bill/45-1/c-123".to_string(),
            last_updated: None,
            verified: true,
            verification_source: "parl.ca".to_string(),
            fetched_at: "2026-10-16T00:00:00Z".to_string(),
        };
        let snapshot = Snapshot {
            legislation: vec![ConnectorReport {
                success: true,
                source: "LEGISinfo".to_string(),
                source_url: "https://www.parl.ca/legisinfo/en/bills/json".to_string(),
                jurisdiction: Jurisdiction::Federal,
                total_count: 1,
                payload: Payload::Bills(vec![bill]),
                error: None,
                fetched_at: "2026-10-16T00:00:00Z".to_string(),
            }],
            ..Snapshot::default()
        };
        let insights = to_insights(&snapshot, &Classifier::default());
        assert_eq!(insights[0].severity, Severity::High);
        assert_eq!(insights[0].category, "workers");
        assert_eq!(insights[0].timestamp, "2026-10-16T00:00:00Z");
        assert_eq!(insights[0].description, "Bill C-123 is at stage: Second reading");
    }

    #[test]
    fn news_prefers_rule_match_over_feed_category() {
        let item = |title: &str| NewsItem {
            title: title.to_string(),
            url: "https://www.canada.ca/en/news/1".to_string(),
            description: String::new(),
            published_at: None,
            source: "Government of Canada News".to_string(),
            category: Some("news releases".to_string()),
            jurisdiction: Jurisdiction::Federal,
            verified: true,
            verification_source: "canada.ca".to_string(),
            fetched_at: "2026-10-16T00:00:00Z".to_string(),
        };
        let classifier = Classifier::default();

        let matched = news_insight(&item("New supports for injured workers"), &classifier);
        assert_eq!(matched.category, "workers");
        assert_eq!(matched.severity, Severity::Medium);
        assert_eq!(matched.timestamp, "2026-10-16T00:00:00Z");

        let unmatched = news_insight(&item("Minister announces travel"), &classifier);
        assert_eq!(unmatched.category, "news releases");
    }

    #[test]
    fn failed_reports_contribute_nothing() {
        let mut snapshot = federal_snapshot(vec![]);
        snapshot.federal[0].success = false;
        assert!(to_insights(&snapshot, &Classifier::default()).is_empty());
    }
}
