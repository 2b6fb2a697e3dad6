use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{ArchiveError, Result};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// Desktop Firefox navigation headers. The archive serves stripped-down or
// blocked responses to clients that look like bots.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "user-agent",
        "Mozilla/5.0 (X11; Linux x86_64; rv:142.0) Gecko/20100101 Firefox/142.0",
    ),
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.5"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "same-origin"),
    ("priority", "u=0, i"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

/// A single GET against a snapshot URL. Implementations never retry.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in BROWSER_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Self::from_builder(Client::builder(), timeout)
    }

    pub fn from_builder(builder: ClientBuilder, timeout: Duration) -> Result<Self> {
        let client = builder
            .default_headers(browser_headers())
            .timeout(timeout)
            .build()
            .map_err(|e| ArchiveError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ArchiveError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(ArchiveError::HttpStatus { status });
        }

        // Decodes with the declared charset, falling back to UTF-8.
        let body = response
            .text()
            .map_err(|e| ArchiveError::Network(format!("failed to read body: {}", e)))?;

        Ok(FetchedPage { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_mimic_a_browser() {
        let headers = browser_headers();
        assert_eq!(headers.len(), BROWSER_HEADERS.len());
        assert!(headers["user-agent"]
            .to_str()
            .unwrap()
            .starts_with("Mozilla/5.0"));
        assert_eq!(headers["sec-fetch-mode"], "navigate");
        assert_eq!(headers["priority"], "u=0, i");
    }
}
