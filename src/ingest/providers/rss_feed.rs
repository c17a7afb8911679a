// src/ingest/providers/rss_feed.rs
use std::borrow::Cow;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use feed_rs::model::Entry;
use metrics::histogram;
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::{Captures, Regex};

use crate::ingest::providers::{read_body_capped, DEFAULT_MAX_BODY_BYTES};
use crate::ingest::types::{FeedEntry, FeedFetcher};

static RE_NAMED_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]{1,31});").expect("static regex"));

const XML_ENTITIES: &[&str] = &["lt", "gt", "amp", "quot", "apos"];

fn entry_from_feed(entry: Entry) -> FeedEntry {
    // Prefer the page link; atom:link extras (self, amphtml, ...) come last.
    let link = entry
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| entry.links.first())
        .map(|l| l.href.trim().to_string());
    FeedEntry {
        title: entry.title.map(|t| t.content),
        summary: entry
            .summary
            .map(|t| t.content)
            .or_else(|| entry.content.and_then(|c| c.body)),
        link,
    }
}

/// Parse an RSS 2.0, RSS 1.0 (RDF) or Atom document into entries, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let xml_clean = decode_html_entities_for_xml(xml.trim_start_matches('\u{feff}'));
    let root = root_element_name(&xml_clean)?;
    if !matches!(root.as_str(), "rss" | "RDF" | "feed") {
        bail!("document is not an RSS or Atom feed (root element <{root}>)");
    }

    let feed = feed_rs::parser::parse(xml_clean.as_bytes())
        .with_context(|| format!("parsing <{root}> feed document"))?;
    Ok(feed.entries.into_iter().map(entry_from_feed).collect())
}

fn root_element_name(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => bail!("feed document is empty"),
            Ok(_) => continue,
            Err(e) => {
                return Err(anyhow!(
                    "malformed feed xml at byte {}: {e}",
                    reader.buffer_position()
                ))
            }
        }
    }
}

/// Fetches feeds over HTTP with a per-request timeout and a body size cap.
pub struct HttpFeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_body_bytes: usize,
}

impl HttpFeedFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch_entries(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("feed http get {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("feed {url} responded with HTTP {status}");
        }
        let body = read_body_capped(resp, self.max_body_bytes)
            .await
            .with_context(|| format!("feed {url}"))?;
        let entries = parse_feed(&String::from_utf8_lossy(&body))?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("headlines_feed_fetch_ms").record(ms);
        tracing::debug!(%url, entries = entries.len(), ms, "feed parsed");
        Ok(entries)
    }

    fn name(&self) -> &'static str {
        "http-feed"
    }
}

/// Feeds routinely carry HTML named entities (`&eacute;`, `&pound;`) that XML
/// does not define. Rewrite them as literal characters, keeping the five XML
/// entities as they are and escaping unknown names as text.
fn decode_html_entities_for_xml(s: &str) -> String {
    let s = scrub_html_entities_for_xml(s);
    RE_NAMED_ENTITY
        .replace_all(&s, |caps: &Captures<'_>| -> String {
            let whole = &caps[0];
            if XML_ENTITIES.contains(&&caps[1]) {
                return whole.to_string();
            }
            let decoded = html_escape::decode_html_entities(whole);
            if decoded.as_ref() == whole {
                return format!("&amp;{}", &whole[1..]);
            }
            match html_escape::encode_text(decoded.as_ref()) {
                Cow::Borrowed(b) => b.to_string(),
                Cow::Owned(o) => o,
            }
        })
        .into_owned()
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
