// src/ingest/types.rs
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::ingest::providers::BodyError;

/// One entry parsed from a feed document. Fields the document omits stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub link: Option<String>,
}

/// Output record per feed entry, as served by `/api/headlines`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Headline {
    pub title: String,
    pub summary: String,
    pub url: String,
    /// Extracted article body, or empty when extraction failed.
    pub text: String,
}

impl Headline {
    pub fn from_entry(entry: FeedEntry, text: String) -> Self {
        Self {
            title: entry.title.unwrap_or_default(),
            summary: entry.summary.unwrap_or_default(),
            url: entry.link.unwrap_or_default(),
            text,
        }
    }
}

/// Fetches and parses the feed document behind a URL.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch_entries(&self, url: &str) -> Result<Vec<FeedEntry>>;
    fn name(&self) -> &'static str;
}

/// Best-effort full-text extraction for a single article page.
#[async_trait::async_trait]
pub trait ArticleExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<String, ExtractError>;
    fn name(&self) -> &'static str;
}

#[derive(Debug)]
pub enum ExtractError {
    /// Empty, unparsable or non-http(s) link.
    InvalidUrl(String),
    Http(reqwest::Error),
    Status(u16),
    NotHtml(String),
    /// Body larger than the configured cap.
    TooLarge(usize),
    NoContent,
    Internal(anyhow::Error),
}

impl ExtractError {
    /// Network and parse failures are routine; everything else deserves a warning.
    pub fn is_expected(&self) -> bool {
        !matches!(self, ExtractError::Internal(_))
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::InvalidUrl(u) => write!(f, "invalid article url '{u}'"),
            ExtractError::Http(e) => write!(f, "article request failed: {e}"),
            ExtractError::Status(code) => write!(f, "article responded with HTTP {code}"),
            ExtractError::NotHtml(ct) => write!(f, "article content-type '{ct}' is not html"),
            ExtractError::TooLarge(limit) => write!(f, "article body exceeds {limit} bytes"),
            ExtractError::NoContent => write!(f, "no article text found"),
            ExtractError::Internal(e) => write!(f, "internal extraction error: {e:#}"),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BodyError> for ExtractError {
    fn from(e: BodyError) -> Self {
        match e {
            BodyError::TooLarge { limit } => ExtractError::TooLarge(limit),
            BodyError::Http(e) => ExtractError::Http(e),
        }
    }
}

impl From<reqwest::Error> for ExtractError {
    fn from(e: reqwest::Error) -> Self {
        ExtractError::Http(e)
    }
}
