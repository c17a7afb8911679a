// tests/http_providers.rs
//
// HTTP feed + article providers against a local axum server on 127.0.0.1:0.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use headline_digest::ingest::providers::{HttpArticleExtractor, HttpFeedFetcher};
use headline_digest::ingest::types::{ArticleExtractor, ExtractError, FeedFetcher};

const BBC_XML: &str = include_str!("fixtures/bbc_world.xml");
const ARTICLE_HTML: &str = include_str!("fixtures/article.html");

async fn serve_fixtures() -> SocketAddr {
    let app = Router::new()
        .route(
            "/rss.xml",
            get(|| async { ([(header::CONTENT_TYPE, "application/rss+xml")], BBC_XML) }),
        )
        .route(
            "/article",
            get(|| async { ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], ARTICLE_HTML) }),
        )
        .route(
            "/report.pdf",
            get(|| async { ([(header::CONTENT_TYPE, "application/pdf")], "%PDF-1.4") }),
        )
        .route(
            "/gone",
            get(|| async { (StatusCode::NOT_FOUND, "gone").into_response() }),
        )
        .route(
            "/stream",
            get(|| async {
                // Chunked, so no Content-Length is announced.
                let chunks = (0..8).map(|_| Ok::<_, std::io::Error>(Bytes::from(vec![b'a'; 1024])));
                (
                    [(header::CONTENT_TYPE, "text/html")],
                    Body::from_stream(futures::stream::iter(chunks)),
                )
            }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "late"
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn feeds(timeout_ms: u64) -> HttpFeedFetcher {
    HttpFeedFetcher::new(reqwest::Client::new(), Duration::from_millis(timeout_ms))
}

fn articles(timeout_ms: u64) -> HttpArticleExtractor {
    HttpArticleExtractor::new(reqwest::Client::new(), Duration::from_millis(timeout_ms))
}

#[tokio::test]
async fn feed_is_fetched_and_parsed() {
    let addr = serve_fixtures().await;
    let entries = feeds(2_000)
        .fetch_entries(&format!("http://{addr}/rss.xml"))
        .await
        .expect("feed ok");
    assert_eq!(entries.len(), 5);
    assert_eq!(
        entries[0].title.as_deref(),
        Some("Leaders gather for climate summit")
    );
}

#[tokio::test]
async fn feed_errors_cover_status_content_and_network() {
    let addr = serve_fixtures().await;
    let f = feeds(500);

    let err = f
        .fetch_entries(&format!("http://{addr}/gone"))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("404"), "{err:#}");

    let err = f
        .fetch_entries(&format!("http://{addr}/article"))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("not an RSS or Atom feed"), "{err:#}");

    assert!(f.fetch_entries(&format!("http://{addr}/slow")).await.is_err());

    // Nothing listens on port 9 locally.
    assert!(f.fetch_entries("http://127.0.0.1:9/rss.xml").await.is_err());
}

#[tokio::test]
async fn article_text_is_extracted_over_http() {
    let addr = serve_fixtures().await;
    let text = articles(2_000)
        .extract(&format!("http://{addr}/article"))
        .await
        .expect("article ok");
    assert!(text.starts_with("Delegates from 190 countries"));
    assert!(!text.contains("Copyright"));
}

#[tokio::test]
async fn article_failures_are_classified() {
    let addr = serve_fixtures().await;
    let a = articles(500);

    assert!(matches!(
        a.extract("").await,
        Err(ExtractError::InvalidUrl(_))
    ));
    assert!(matches!(
        a.extract("not a url").await,
        Err(ExtractError::InvalidUrl(_))
    ));
    assert!(matches!(
        a.extract("ftp://example.test/file").await,
        Err(ExtractError::InvalidUrl(_))
    ));
    assert!(matches!(
        a.extract(&format!("http://{addr}/gone")).await,
        Err(ExtractError::Status(404))
    ));
    assert!(matches!(
        a.extract(&format!("http://{addr}/report.pdf")).await,
        Err(ExtractError::NotHtml(_))
    ));
    assert!(matches!(
        a.extract(&format!("http://{addr}/rss.xml")).await,
        Err(ExtractError::NotHtml(_))
    ));

    let slow = a.extract(&format!("http://{addr}/slow")).await;
    assert!(matches!(slow, Err(ExtractError::Http(ref e)) if e.is_timeout()));
    assert!(slow.unwrap_err().is_expected());
}

#[tokio::test]
async fn oversized_bodies_are_refused() {
    let addr = serve_fixtures().await;

    // Announced length above the cap.
    let err = feeds(2_000)
        .with_max_body_bytes(512)
        .fetch_entries(&format!("http://{addr}/rss.xml"))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("exceeds 512 bytes"), "{err:#}");

    let a = articles(2_000).with_max_body_bytes(1024);
    assert!(matches!(
        a.extract(&format!("http://{addr}/article")).await,
        Err(ExtractError::TooLarge(1024))
    ));

    // Streamed body that only grows past the cap while reading.
    let streamed = articles(2_000).with_max_body_bytes(4096);
    let outcome = streamed.extract(&format!("http://{addr}/stream")).await;
    assert!(matches!(outcome, Err(ExtractError::TooLarge(4096))));
    assert!(outcome.unwrap_err().is_expected());

    // Under the cap the same page reads fine (and has no paragraphs).
    let roomy = articles(2_000).with_max_body_bytes(64 * 1024);
    assert!(matches!(
        roomy.extract(&format!("http://{addr}/stream")).await,
        Err(ExtractError::NoContent)
    ));
}
