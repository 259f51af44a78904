use async_trait::async_trait;
use oracle_core::config::SourceConfig;
use oracle_core::schema::{Jurisdiction, NewsItem};
use oracle_core::snapshot::{Payload, SourceKind};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;
use tracing::debug;

use crate::connector::{matches_keywords, Connector, Fetched};
use crate::error::FetchError;
use crate::http;

pub struct RssConnector {
    source: SourceConfig,
    keywords: Vec<String>,
    client: Client,
}

impl RssConnector {
    pub fn new(source: SourceConfig, keywords: Vec<String>, client: Client) -> Self {
        Self {
            source,
            keywords,
            client,
        }
    }
}

#[async_trait]
impl Connector for RssConnector {
    fn name(&self) -> &str {
        &self.source.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Rss
    }

    fn jurisdiction(&self) -> Jurisdiction {
        self.source.jurisdiction
    }

    fn endpoint(&self) -> &str {
        &self.source.url
    }

    async fn fetch(&self, fetched_at: &str) -> Result<Fetched, FetchError> {
        let body = http::get_text(&self.client, &self.source.url, &[]).await?;
        let feed = parse_feed(&body)?;
        if feed.skipped > 0 {
            debug!(source = %self.source.name, skipped = feed.skipped, "dropped incomplete feed items");
        }

        let verification_source = http::source_host(&self.source.url);
        let items: Vec<NewsItem> = feed
            .items
            .into_iter()
            .filter(|item| matches_keywords(&self.keywords, &[item.title.as_str(), item.description.as_str()]))
            .map(|item| NewsItem {
                title: item.title,
                url: item.link,
                description: item.description,
                published_at: item.pub_date.map(|raw| normalize_date(&raw)),
                source: self.source.name.clone(),
                category: item.category,
                jurisdiction: self.source.jurisdiction,
                verified: true,
                verification_source: verification_source.clone(),
                fetched_at: fetched_at.to_string(),
            })
            .collect();

        Ok(Fetched {
            total_count: items.len() as u64,
            payload: Payload::Items(items),
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub items: Vec<FeedItem>,
    /// Items dropped for lacking a title or link.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    PubDate,
    Category,
}

fn field_for(local_name: &[u8]) -> Option<Field> {
    match local_name {
        b"title" => Some(Field::Title),
        b"link" => Some(Field::Link),
        b"description" => Some(Field::Description),
        b"pubDate" | b"date" => Some(Field::PubDate),
        b"category" => Some(Field::Category),
        _ => None,
    }
}

/// Parses an RSS 2.0 document. A document that is not well-formed XML, or
/// has no `<rss>`/`<channel>` element, is an error.
pub fn parse_feed(xml: &str) -> Result<ParsedFeed, FetchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = ParsedFeed::default();
    let mut saw_channel = false;
    let mut current: Option<FeedItem> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"rss" | b"channel" => saw_channel = true,
                    b"item" => current = Some(FeedItem::default()),
                    other if current.is_some() => {
                        field = field_for(other);
                        text.clear();
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                if field.is_some() {
                    let unescaped = e
                        .unescape()
                        .map_err(|err| FetchError::Parse(err.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(e) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(e) => {
                let name = e.local_name();
                if name.as_ref() == b"item" {
                    if let Some(item) = current.take() {
                        if item.title.is_empty() || item.link.is_empty() {
                            feed.skipped += 1;
                        } else {
                            feed.items.push(item);
                        }
                    }
                    field = None;
                } else if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    if field_for(name.as_ref()) == Some(f) {
                        assign(item, f, text.trim());
                        field = None;
                        text.clear();
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if current.is_some() {
        return Err(FetchError::Parse("unterminated <item>".to_string()));
    }
    if !saw_channel {
        return Err(FetchError::Parse("not an RSS document".to_string()));
    }
    Ok(feed)
}

fn assign(item: &mut FeedItem, field: Field, value: &str) {
    match field {
        Field::Title => item.title = value.to_string(),
        Field::Link => item.link = value.to_string(),
        Field::Description => item.description = strip_markup(value),
        Field::PubDate => item.pub_date = Some(value.to_string()).filter(|v| !v.is_empty()),
        Field::Category => {
            if item.category.is_none() && !value.is_empty() {
                item.category = Some(value.to_lowercase());
            }
        }
    }
}

/// Drops HTML tags from item descriptions and collapses whitespace.
pub fn strip_markup(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_tag = false;
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            // A bare `<` in text ("income < $30,000") is not a tag.
            '<' if !in_tag
                && chars
                    .peek()
                    .is_some_and(|next| *next == '/' || *next == '!' || next.is_ascii_alphabetic()) =>
            {
                in_tag = true
            }
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// RFC 2822 feed dates become RFC 3339; anything else is kept verbatim.
fn normalize_date(raw: &str) -> String {
    OffsetDateTime::parse(raw, &Rfc2822)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Ontario Newsroom</title>
    <link>https://news.ontario.ca</link>
    <item>
      <title>Ontario Expanding &amp; Improving WSIB Supports</title>
      <link>https://news.ontario.ca/en/release/1001</link>
      <description><![CDATA[<p>New <b>benefits</b> for injured workers.</p>]]></description>
      <pubDate>Wed, 14 Oct 2026 09:30:00 -0400</pubDate>
      <category>Labour</category>
    </item>
    <item>
      <title>No link here</title>
    </item>
    <item>
      <title>Parks reopening</title>
      <link>https://news.ontario.ca/en/release/1002</link>
      <dc:date>2026-10-13</dc:date>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_and_skips_incomplete_ones() {
        let feed = parse_feed(FEED).unwrap();
        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.skipped, 1);

        let first = &feed.items[0];
        assert_eq!(first.title, "Ontario Expanding & Improving WSIB Supports");
        assert_eq!(first.description, "New benefits for injured workers.");
        assert_eq!(first.category.as_deref(), Some("labour"));
        assert_eq!(first.pub_date.as_deref(), Some("Wed, 14 Oct 2026 09:30:00 -0400"));
        assert_eq!(feed.items[1].pub_date.as_deref(), Some("2026-10-13"));
    }

    #[test]
    fn channel_title_is_not_an_item_field() {
        let feed = parse_feed(FEED).unwrap();
        assert!(feed.items.iter().all(|item| item.title != "Ontario Newsroom"));
    }

    #[test]
    fn mismatched_tags_are_errors() {
        let err = parse_feed("<rss><channel><item><title>x</link></item></channel></rss>")
            .unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn html_page_is_not_a_feed() {
        let err = parse_feed("<html><body>Service unavailable</body></html>").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn normalizes_rfc2822_dates() {
        assert_eq!(
            normalize_date("Wed, 14 Oct 2026 09:30:00 -0400"),
            "2026-10-14T09:30:00-04:00"
        );
        assert_eq!(normalize_date("yesterday"), "yesterday");
    }

    #[test]
    fn strip_markup_collapses_whitespace() {
        assert_eq!(strip_markup("<p>a</p>\n<p>b  c</p>"), "a b c");
    }

    #[test]
    fn bare_less_than_in_cdata_keeps_the_rest_of_the_text() {
        let feed = parse_feed(
            r#"<rss><channel><item>
<title>Benefit</title>
<link>https://news.ontario.ca/en/release/1003</link>
<description><![CDATA[Households earning < $30,000 qualify for the new benefit starting in May.]]></description>
</item></channel></rss>"#,
        )
        .unwrap();
        assert_eq!(
            feed.items[0].description,
            "Households earning < $30,000 qualify for the new benefit starting in May."
        );
        assert_eq!(strip_markup("a <b>bold</b> 3<4 <!-- note -->"), "a bold 3<4");
    }
}
