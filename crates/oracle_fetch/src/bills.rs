use async_trait::async_trait;
use oracle_core::config::SourceConfig;
use oracle_core::schema::{BillRecord, Jurisdiction};
use oracle_core::snapshot::{Payload, SourceKind};
use reqwest::Client;
use serde::Deserialize;

use crate::connector::{matches_keywords, Connector, Fetched};
use crate::error::FetchError;
use crate::http;

pub struct BillsConnector {
    source: SourceConfig,
    keywords: Vec<String>,
    client: Client,
}

impl BillsConnector {
    pub fn new(source: SourceConfig, keywords: Vec<String>, client: Client) -> Self {
        Self {
            source,
            keywords,
            client,
        }
    }
}

#[async_trait]
impl Connector for BillsConnector {
    fn name(&self) -> &str {
        &self.source.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Bills
    }

    fn jurisdiction(&self) -> Jurisdiction {
        self.source.jurisdiction
    }

    fn endpoint(&self) -> &str {
        &self.source.url
    }

    async fn fetch(&self, fetched_at: &str) -> Result<Fetched, FetchError> {
        let body = http::get_text(&self.client, &self.source.url, &[]).await?;
        parse_bills(&body, &self.source.url, &self.keywords, fetched_at)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LegisBill {
    bill_number_formatted: Option<String>,
    long_title_en: Option<String>,
    short_title_en: Option<String>,
    current_status_en: Option<String>,
    sponsor_en: Option<String>,
    parliament_number: Option<u32>,
    session_number: Option<u32>,
    parl_session_code: Option<String>,
    latest_activity_date_time: Option<String>,
}

pub fn parse_bills(
    body: &str,
    endpoint: &str,
    keywords: &[String],
    fetched_at: &str,
) -> Result<Fetched, FetchError> {
    let bills: Vec<LegisBill> = serde_json::from_str(body)?;
    let origin = http::origin(endpoint);
    let verification_source = http::source_host(endpoint);

    let mut out = Vec::new();
    for bill in bills {
        let (Some(number), Some(title)) = (bill.bill_number_formatted, bill.long_title_en) else {
            continue;
        };
        let short_title = bill.short_title_en.filter(|t| !t.trim().is_empty());
        if !matches_keywords(keywords, &[title.as_str(), short_title.as_deref().unwrap_or_default()]) {
            continue;
        }

        let session_code = bill.parl_session_code.or_else(|| {
            match (bill.parliament_number, bill.session_number) {
                (Some(p), Some(s)) => Some(format!("{p}-{s}")),
                _ => None,
            }
        });
        let url = match &session_code {
            Some(code) => format!(
                "{origin}/legisinfo/en/bill/{code}/{}",
                number.to_lowercase()
            ),
            None => format!("{origin}/legisinfo/en/bills"),
        };

        out.push(BillRecord {
            bill_number: number,
            title,
            short_title,
            status: bill.current_status_en,
            sponsor: bill.sponsor_en,
            parliament: bill.parliament_number,
            session: bill.session_number,
            url,
            last_updated: bill.latest_activity_date_time,
            verified: true,
            verification_source: verification_source.clone(),
            fetched_at: fetched_at.to_string(),
        });
    }

    Ok(Fetched {
        total_count: out.len() as u64,
        payload: Payload::Bills(out),
    })
}
