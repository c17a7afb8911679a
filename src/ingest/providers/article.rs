// src/ingest/providers/article.rs
//! Article body extraction: fetch the page, drop navigation and other boilerplate,
//! and keep the densest block of paragraphs.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::ingest::providers::{read_body_capped, DEFAULT_MAX_BODY_BYTES};
use crate::ingest::types::{ArticleExtractor, ExtractError};

static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("static selector"));

const BOILERPLATE_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "noscript", "form", "figure", "menu",
    "button", "template",
];

const PAGE_WRAPPERS: &[&str] = &["html", "body", "main", "article"];

const BOILERPLATE_MARKERS: &[&str] = &[
    "nav",
    "menu",
    "footer",
    "comment",
    "share",
    "promo",
    "related",
    "cookie",
    "newsletter",
    "sidebar",
];

pub struct HttpArticleExtractor {
    client: reqwest::Client,
    timeout: Duration,
    max_body_bytes: usize,
}

impl HttpArticleExtractor {
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
impl ArticleExtractor for HttpArticleExtractor {
    async fn extract(&self, url: &str) -> Result<String, ExtractError> {
        let parsed = Url::parse(url.trim()).map_err(|_| ExtractError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ExtractError::InvalidUrl(url.to_string()));
        }

        let resp = self
            .client
            .get(parsed)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExtractError::Status(status.as_u16()));
        }
        if let Some(ct) = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !ct.to_ascii_lowercase().contains("html") {
                return Err(ExtractError::NotHtml(ct.to_string()));
            }
        }

        let body = read_body_capped(resp, self.max_body_bytes).await?;
        let text =
            tokio::task::spawn_blocking(move || extract_main_text(&String::from_utf8_lossy(&body)))
                .await
                .map_err(|e| ExtractError::Internal(anyhow::Error::new(e)))?;

        let text = text.ok_or(ExtractError::NoContent)?;
        tracing::debug!(%url, chars = text.chars().count(), "article text extracted");
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "http-article"
    }
}

/// Main article text of an HTML page, paragraphs separated by blank lines.
/// `None` when no content paragraphs survive the boilerplate filter.
pub fn extract_main_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    let candidates: Vec<(ElementRef<'_>, String)> = doc
        .select(&PARAGRAPHS)
        .filter(|p| !in_boilerplate(p))
        .filter_map(|p| {
            let text = collapse_ws(&p.text().collect::<String>());
            (!text.is_empty()).then_some((p, text))
        })
        .collect();
    if candidates.is_empty() {
        return None;
    }

    // Parent gets the full paragraph length, grandparent half of it.
    // Kept in first-seen order so ties go to the earliest block.
    let mut scores: Vec<(_, usize)> = Vec::new();
    for (p, text) in &candidates {
        let len = text.chars().count();
        let mut up = p.ancestors();
        for share in [len, len / 2] {
            let Some(node) = up.next() else { break };
            let id = node.id();
            match scores.iter_mut().find(|(seen, _)| id == *seen) {
                Some((_, score)) => *score += share,
                None => scores.push((id, share)),
            }
        }
    }
    let mut best: Option<(_, usize)> = None;
    for &(id, score) in &scores {
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((id, score));
        }
    }
    let (best, _) = best?;

    let paragraphs: Vec<&str> = candidates
        .iter()
        .filter(|(p, _)| p.ancestors().any(|a| a.id() == best))
        .map(|(_, text)| text.as_str())
        .collect();
    if paragraphs.is_empty() {
        return None;
    }
    Some(paragraphs.join("\n\n"))
}

fn in_boilerplate(p: &ElementRef<'_>) -> bool {
    p.ancestors()
        .filter_map(|n| n.value().as_element())
        .any(|el| {
            if BOILERPLATE_TAGS.contains(&el.name()) {
                return true;
            }
            // Page-level wrappers often carry state classes like "nav-open".
            !PAGE_WRAPPERS.contains(&el.name())
                && el.id().into_iter().chain(el.classes()).any(|mark| {
                    let mark = mark.to_ascii_lowercase();
                    BOILERPLATE_MARKERS.iter().any(|b| mark.contains(b))
                })
        })
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
