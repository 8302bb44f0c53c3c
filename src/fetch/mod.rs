mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use tracing::debug;

use crate::parser::{RawPayload, parse_payload};

/// Paris open-data endpoint for real-time Vélib availability.
pub const DEFAULT_FEED_URL: &str = "https://opendata.paris.fr/api/records/1.0/search/?dataset=velib-disponibilite-en-temps-reel&q=&rows=10000&start=0&facet=name&facet=is_installed&facet=is_renting&facet=is_returning&facet=nom_arrondissement_communes";

/// Page size requested when none is configured.
pub const DEFAULT_ROWS: u32 = 10_000;

/// Issues a GET against `url` and returns the body of a 2xx response.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// Rewrites the `rows` query parameter of `url` to request a page of `rows` records.
pub fn with_rows(url: &str, rows: u32) -> Result<reqwest::Url> {
    let mut url: reqwest::Url = url
        .parse()
        .with_context(|| format!("invalid feed url '{url}'"))?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "rows")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("rows", &rows.to_string());

    Ok(url)
}

/// Fetches one snapshot of the availability feed per call.
///
/// No retry at this layer: any transport error, non-2xx status or
/// undecodable body is returned to the caller.
pub struct FeedFetcher<C> {
    client: C,
    url: String,
}

impl<C: HttpClient> FeedFetcher<C> {
    pub fn new(client: C, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    #[tracing::instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch(&self) -> Result<RawPayload> {
        let bytes = fetch_bytes(&self.client, &self.url).await?;
        debug!(bytes = bytes.len(), "Feed bytes received, parsing");

        let payload = parse_payload(&bytes)?;
        debug!(records = payload.records.len(), nhits = ?payload.nhits, "Feed parsed");
        Ok(payload)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every request with the same status and body, recording the urls asked for.
    /// The first `failures` requests get a 503 instead.
    pub(crate) struct CannedClient {
        pub status: u16,
        pub body: String,
        pub failures: AtomicUsize,
        pub requests: Mutex<Vec<String>>,
    }

    impl CannedClient {
        pub(crate) fn ok(body: impl Into<String>) -> Self {
            Self::with_status(200, body)
        }

        pub(crate) fn with_status(status: u16, body: impl Into<String>) -> Self {
            Self {
                status,
                body: body.into(),
                failures: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing_first(failures: usize, body: impl Into<String>) -> Self {
            let client = Self::ok(body);
            client.failures.store(failures, Ordering::SeqCst);
            client
        }
    }

    #[async_trait]
    impl HttpClient for CannedClient {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            self.requests.lock().unwrap().push(req.url().to_string());
            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            let resp = http::Response::builder()
                .status(if failing { 503 } else { self.status })
                .body(self.body.clone())
                .unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }

    #[tokio::test]
    async fn test_fetch_decodes_payload() {
        let client = CannedClient::ok(r#"{"nhits": 1, "records": [{"recordid": "A"}]}"#);
        let fetcher = FeedFetcher::new(client, "http://feed.test/api");

        let payload = fetcher.fetch().await.unwrap();
        assert_eq!(payload.records.len(), 1);
        assert_eq!(fetcher.client.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status() {
        let client = CannedClient::with_status(503, r#"{"records": []}"#);
        let fetcher = FeedFetcher::new(client, "http://feed.test/api");

        assert!(fetcher.fetch().await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_rejects_malformed_body() {
        let client = CannedClient::ok("<html>maintenance</html>");
        let fetcher = FeedFetcher::new(client, "http://feed.test/api");

        assert!(fetcher.fetch().await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_url() {
        let fetcher = FeedFetcher::new(CannedClient::ok("{}"), "not a url");
        assert!(fetcher.fetch().await.is_err());
    }

    #[test]
    fn test_with_rows_replaces_page_size() {
        let url = with_rows(DEFAULT_FEED_URL, 500).unwrap();
        let rows: Vec<_> = url
            .query_pairs()
            .filter(|(k, _)| k == "rows")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(rows, vec!["500"]);
        assert!(url.query_pairs().any(|(k, v)| k == "dataset" && v == "velib-disponibilite-en-temps-reel"));
    }

    #[test]
    fn test_with_rows_adds_missing_param() {
        let url = with_rows("http://feed.test/api", 10).unwrap();
        assert_eq!(url.query(), Some("rows=10"));
    }
}
