//! Authenticated HTTP session shared with the browser.
//!
//! The [`HttpSession`] carries the portal's session cookie, copied once from
//! the browsing session at startup, so plain HTTP requests are authorised as
//! the logged-in user. The cookie is assumed not to rotate during a run.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use tracing::{debug, info, instrument};
use url::Url;
use url::form_urlencoded;

use super::error::DownloadError;
use crate::user_agent;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large archives).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Connect/read timeouts for the session client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Connect timeout in seconds.
    pub connect_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: CONNECT_TIMEOUT_SECS,
            read_secs: READ_TIMEOUT_SECS,
        }
    }
}

/// Name and value of the portal's session cookie.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    /// Cookie name (e.g. `MoodleSessionegela`).
    pub name: String,
    /// Opaque session identifier.
    pub value: String,
}

impl SessionCookie {
    /// Creates a session cookie.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// The value is a bearer credential; keep it out of logs.
impl std::fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The requested URL.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Raw `Content-Disposition` header value, if any.
    pub content_disposition: Option<String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// True when the server answered with an attachment rather than a page.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.content_disposition.is_some()
    }
}

/// HTTP client whose cookie store is seeded with the browser's session cookie.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
    jar: Arc<Jar>,
    origin: Url,
    cookie_name: String,
}

impl HttpSession {
    /// Builds a session for `origin` carrying `cookie`.
    ///
    /// # Errors
    ///
    /// [`DownloadError::InvalidUrl`] for a malformed origin,
    /// [`DownloadError::Client`] if the client cannot be built.
    #[instrument(level = "debug", skip(cookie), fields(cookie = %cookie.name))]
    pub fn new(
        origin: &str,
        cookie: &SessionCookie,
        timeouts: HttpTimeouts,
    ) -> Result<Self, DownloadError> {
        let origin = Url::parse(origin).map_err(|_| DownloadError::invalid_url(origin))?;
        let jar = Arc::new(Jar::default());
        jar.add_cookie_str(&format!("{}={}; Path=/", cookie.name, cookie.value), &origin);

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.read_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|source| DownloadError::Client { source })?;

        info!(origin = %origin, "HTTP session seeded from browser cookie");
        Ok(Self {
            client,
            jar,
            origin,
            cookie_name: cookie.name.clone(),
        })
    }

    /// The origin the session cookie is scoped to.
    #[must_use]
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Issues a GET and reads the whole body.
    ///
    /// # Errors
    ///
    /// Invalid URL, transport failure, timeout, or a non-2xx status.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str) -> Result<FetchResponse, DownloadError> {
        let parsed = parse_url(url)?;
        self.send(url, self.client.get(parsed)).await
    }

    /// Issues a form-encoded POST with exactly `fields`, in order.
    ///
    /// # Errors
    ///
    /// Invalid URL, transport failure, timeout, or a non-2xx status.
    #[instrument(skip(self, fields), fields(url = %url, fields = fields.len()))]
    pub async fn post_form(
        &self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<FetchResponse, DownloadError> {
        let parsed = parse_url(url)?;
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = self
            .client
            .post(parsed)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);
        self.send(url, request).await
    }

    async fn send(
        &self,
        url: &str,
        request: RequestBuilder,
    ) -> Result<FetchResponse, DownloadError> {
        let response = request
            .send()
            .await
            .map_err(|e| DownloadError::from_transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let content_disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| DownloadError::from_transport(url, e))?
            .to_vec();

        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            attachment = content_disposition.is_some(),
            "response received"
        );
        Ok(FetchResponse {
            url: url.to_string(),
            status: status.as_u16(),
            content_disposition,
            body,
        })
    }

    /// Expires the session cookie in the client's store.
    pub fn clear_cookies(&self) {
        self.jar.add_cookie_str(
            &format!("{}=; Max-Age=0; Path=/", self.cookie_name),
            &self.origin,
        );
        debug!(cookie = %self.cookie_name, "expired HTTP session cookie");
    }
}

fn parse_url(url: &str) -> Result<Url, DownloadError> {
    Url::parse(url).map_err(|_| DownloadError::invalid_url(url))
}
