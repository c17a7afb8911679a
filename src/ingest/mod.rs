// src/ingest/mod.rs
pub mod providers;
pub mod registry;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;

use crate::ingest::registry::SourceRegistry;
use crate::ingest::types::{ArticleExtractor, ExtractError, FeedEntry, FeedFetcher, Headline};

/// Upper bound on headlines returned per request.
pub const HEADLINE_CAP: usize = 3;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "headlines_requests_total",
            "Aggregation requests, labelled by resolved source."
        );
        describe_counter!(
            "headlines_feed_errors_total",
            "Feed fetch/parse failures (request failed)."
        );
        describe_counter!(
            "headlines_articles_total",
            "Articles for which extraction was attempted."
        );
        describe_counter!(
            "headlines_article_failures_total",
            "Article extractions absorbed into empty text."
        );
        describe_histogram!(
            "headlines_feed_fetch_ms",
            "Feed fetch + parse time in milliseconds."
        );
    });
}

/// Feed → first `HEADLINE_CAP` entries → per-entry article text.
pub struct Aggregator {
    registry: Arc<SourceRegistry>,
    feeds: Arc<dyn FeedFetcher>,
    articles: Arc<dyn ArticleExtractor>,
}

impl Aggregator {
    pub fn new(
        registry: Arc<SourceRegistry>,
        feeds: Arc<dyn FeedFetcher>,
        articles: Arc<dyn ArticleExtractor>,
    ) -> Self {
        Self {
            registry,
            feeds,
            articles,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Fetch the feed for `source_key` and enrich its first entries with article text.
    ///
    /// Only a feed failure is an error. Article failures leave `text` empty and never
    /// affect the other entries; results keep the feed's order.
    pub async fn aggregate(&self, source_key: &str) -> Result<Vec<Headline>> {
        ensure_metrics_described();

        let source = self.registry.resolve_key(source_key);
        let feed_url = self.registry.resolve(source_key);
        counter!("headlines_requests_total", "source" => source.to_string()).increment(1);

        let entries = match self.feeds.fetch_entries(feed_url).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), source, feed = self.feeds.name(), "feed error");
                counter!("headlines_feed_errors_total").increment(1);
                return Err(e).with_context(|| format!("fetching {source} feed"));
            }
        };

        let selected: Vec<FeedEntry> = entries.into_iter().take(HEADLINE_CAP).collect();
        counter!("headlines_articles_total").increment(selected.len() as u64);

        // The set is owned by this future: dropping the request aborts pending fetches.
        let mut tasks = JoinSet::new();
        for (idx, entry) in selected.iter().enumerate() {
            let articles = Arc::clone(&self.articles);
            let link = entry.link.clone().unwrap_or_default();
            tasks.spawn(async move {
                let outcome = articles.extract(&link).await;
                (idx, absorb(&link, outcome))
            });
        }

        // Slots are filled by index, so completion order never reorders the feed.
        let mut texts = vec![String::new(); selected.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, text)) => texts[idx] = text,
                Err(join) => {
                    tracing::warn!(error = %join, "article extraction task aborted");
                    counter!("headlines_article_failures_total").increment(1);
                }
            }
        }

        let headlines: Vec<Headline> = selected
            .into_iter()
            .zip(texts)
            .map(|(entry, text)| Headline::from_entry(entry, text))
            .collect();

        tracing::info!(
            source,
            headlines = headlines.len(),
            with_text = headlines.iter().filter(|h| !h.text.is_empty()).count(),
            "aggregated headlines"
        );
        Ok(headlines)
    }
}

/// Collapse an extraction outcome into article text; failures become "".
fn absorb(link: &str, outcome: Result<String, ExtractError>) -> String {
    match outcome {
        Ok(text) => return text,
        Err(e) if e.is_expected() => {
            tracing::debug!(error = %e, %link, "article extraction failed");
        }
        Err(e) => {
            tracing::warn!(error = %e, %link, "unexpected article extraction failure");
        }
    }
    counter!("headlines_article_failures_total").increment(1);
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_passes_text_through() {
        assert_eq!(absorb("http://a.test", Ok("body".into())), "body");
    }

    #[test]
    fn absorb_turns_every_error_into_empty_text() {
        assert_eq!(absorb("", Err(ExtractError::InvalidUrl(String::new()))), "");
        assert_eq!(absorb("http://a.test", Err(ExtractError::Status(404))), "");
        assert_eq!(absorb("http://a.test", Err(ExtractError::TooLarge(1024))), "");
        assert_eq!(
            absorb(
                "http://a.test",
                Err(ExtractError::Internal(anyhow::anyhow!("boom")))
            ),
            ""
        );
    }

    #[test]
    fn headline_defaults_missing_fields_to_empty() {
        let h = Headline::from_entry(FeedEntry::default(), String::new());
        assert_eq!(h, Headline::default());
    }
}
