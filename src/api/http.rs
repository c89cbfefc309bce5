//! REST transport for the Stratos Config API
//!
//! Thin wrapper over reqwest: JSON in/out, bearer auth, caller-supplied
//! per-request deadlines, and classification of failures into the not-found /
//! service-error / generic taxonomy the CRUD handlers act on.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use thiserror::Error;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Classified failure from the Config API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response, carrying the literal upstream message.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection, TLS, or deadline failure before a response arrived.
    #[error("request to Stratos API failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered 2xx with a body this build cannot decode.
    #[error("failed to decode API response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// Soft failure: the resource is gone and local state should follow.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApiError::Status { status, .. } if *status == StatusCode::NOT_FOUND.as_u16()
        )
    }

    /// Server-side (5xx) failure, worth retrying later.
    pub fn is_service_error(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if *status >= 500)
    }
}

/// Sanitize response body for logging.
/// Truncates long responses and strips non-printable characters.
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        format!(
            "{}... [truncated, {} bytes total]",
            &body[..MAX_LOG_BODY_LENGTH],
            body.len()
        )
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for Config API calls.
#[derive(Clone)]
pub struct RestTransport {
    client: Client,
    base_url: String,
    token: String,
}

impl RestTransport {
    pub fn new(base_url: &str, token: &str) -> anyhow::Result<Self> {
        use anyhow::Context as _;

        url::Url::parse(base_url).context("Invalid Stratos API base URL")?;

        let client = Client::builder()
            .user_agent(concat!("stratoform/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute a request and return the raw response body. Bookmarks are
    /// attached as repeated headers so the backend can honor read-your-writes
    /// ordering against prior mutations.
    pub(crate) async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        bookmarks: &[String],
        timeout: Duration,
    ) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .timeout(timeout);

        for bookmark in bookmarks {
            request = request.header("X-Bookmark", bookmark);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;

        let status = response.status();
        let response_body = response.text().await?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: response_body,
            });
        }

        Ok(response_body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let not_found = ApiError::Status {
            status: 404,
            message: "no such resource".into(),
        };
        assert!(not_found.is_not_found());
        assert!(!not_found.is_service_error());

        let unavailable = ApiError::Status {
            status: 503,
            message: "try later".into(),
        };
        assert!(unavailable.is_service_error());
        assert!(!unavailable.is_not_found());

        let conflict = ApiError::Status {
            status: 409,
            message: "exists".into(),
        };
        assert!(!conflict.is_not_found());
        assert!(!conflict.is_service_error());
    }

    #[test]
    fn test_sanitize_truncates_and_strips() {
        let long = "x".repeat(300);
        let out = sanitize_for_log(&long);
        assert!(out.contains("truncated"));

        let out = sanitize_for_log("ok\u{7}\n body");
        assert_eq!(out, "ok body");
    }

    #[test]
    fn test_transport_rejects_bad_base_url() {
        assert!(RestTransport::new("not a url", "t").is_err());
    }
}
