pub mod article;
pub mod rss_feed;

pub use article::HttpArticleExtractor;
pub use rss_feed::HttpFeedFetcher;

use std::fmt;

/// Default cap on feed and article response bodies.
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug)]
pub enum BodyError {
    TooLarge { limit: usize },
    Http(reqwest::Error),
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyError::TooLarge { limit } => write!(f, "response body exceeds {limit} bytes"),
            BodyError::Http(e) => write!(f, "reading response body: {e}"),
        }
    }
}

impl std::error::Error for BodyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BodyError::Http(e) => Some(e),
            BodyError::TooLarge { .. } => None,
        }
    }
}

/// Read a response body, giving up as soon as it grows past `limit` bytes.
pub(crate) async fn read_body_capped(
    mut resp: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, BodyError> {
    if resp.content_length().is_some_and(|len| len > limit as u64) {
        return Err(BodyError::TooLarge { limit });
    }
    let mut body = Vec::new();
    while let Some(chunk) = resp.chunk().await.map_err(BodyError::Http)? {
        if body.len() + chunk.len() > limit {
            return Err(BodyError::TooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
