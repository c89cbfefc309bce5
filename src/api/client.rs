//! Config API client
//!
//! Combines the REST transport with the resolved credentials and the bounded
//! ring of consistency tokens (bookmarks). Write responses may return a
//! bookmark; every subsequent request carries the stored bookmarks so the
//! eventually-consistent backend serves read-your-writes.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::credentials::Credentials;
use super::http::{ApiError, RestTransport};

/// How many bookmarks to retain. Should reflect host parallelism: this many
/// resources may be applied concurrently, and the API caps how many tokens a
/// request may carry.
const PARALLELISM: usize = 10;

pub struct ConfigClient {
    transport: RestTransport,
    bookmarks: Mutex<VecDeque<String>>,
}

impl ConfigClient {
    pub fn new(credentials: &Credentials) -> anyhow::Result<Self> {
        Ok(Self {
            transport: RestTransport::new(&credentials.base_url, &credentials.token)?,
            bookmarks: Mutex::new(VecDeque::with_capacity(PARALLELISM)),
        })
    }

    /// Client against an explicit base URL. Intended for tests, where the
    /// token is a dummy and the URL points at a mock server.
    pub fn with_base_url(base_url: &str, token: &str) -> anyhow::Result<Self> {
        Ok(Self {
            transport: RestTransport::new(base_url, token)?,
            bookmarks: Mutex::new(VecDeque::with_capacity(PARALLELISM)),
        })
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    /// Store a consistency token returned by a write. Old tokens roll off
    /// once the ring is full.
    pub fn record_bookmark(&self, bookmark: Option<&str>) {
        let Some(bookmark) = bookmark.filter(|b| !b.is_empty()) else {
            return;
        };
        let mut ring = self.bookmarks.lock().expect("bookmark ring poisoned");
        if ring.len() == PARALLELISM {
            ring.pop_front();
        }
        ring.push_back(bookmark.to_string());
    }

    /// Snapshot of the stored consistency tokens.
    pub fn bookmarks(&self) -> Vec<String> {
        self.bookmarks
            .lock()
            .expect("bookmark ring poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let body = self
            .transport
            .send::<()>(Method::GET, path, None, &self.bookmarks(), timeout)
            .await?;
        serde_json::from_str(&body).map_err(ApiError::Decode)
    }

    pub async fn post<B, T>(&self, path: &str, body: &B, timeout: Duration) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .transport
            .send(Method::POST, path, Some(body), &self.bookmarks(), timeout)
            .await?;
        serde_json::from_str(&body).map_err(ApiError::Decode)
    }

    pub async fn put<B, T>(&self, path: &str, body: &B, timeout: Duration) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .transport
            .send(Method::PUT, path, Some(body), &self.bookmarks(), timeout)
            .await?;
        serde_json::from_str(&body).map_err(ApiError::Decode)
    }

    pub async fn delete(&self, path: &str, timeout: Duration) -> Result<(), ApiError> {
        self.transport
            .send::<()>(Method::DELETE, path, None, &self.bookmarks(), timeout)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bookmark_ring_is_bounded() {
        let client = ConfigClient::with_base_url("http://localhost:1", "t").unwrap();
        for i in 0..(PARALLELISM + 5) {
            client.record_bookmark(Some(&format!("bm-{i}")));
        }
        let bookmarks = client.bookmarks();
        assert_eq!(bookmarks.len(), PARALLELISM);
        // Oldest entries rolled off.
        assert_eq!(bookmarks.first().map(String::as_str), Some("bm-5"));
    }

    #[test]
    fn test_empty_bookmarks_are_ignored() {
        let client = ConfigClient::with_base_url("http://localhost:1", "t").unwrap();
        client.record_bookmark(None);
        client.record_bookmark(Some(""));
        assert!(client.bookmarks().is_empty());
    }
}
