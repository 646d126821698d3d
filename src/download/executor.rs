//! Download executor: fetch through the session, resolve the filename,
//! persist the body.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use super::allowlist::FileTypeAllowlist;
use super::client::{FetchResponse, HttpSession};
use super::error::DownloadError;
use super::filename::{self, SanitizePolicy};

/// What to request for one download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTarget {
    /// Plain GET of a URL.
    Url(String),
    /// POST of a form's fields to its action URL.
    Form {
        /// Form submission URL.
        action: String,
        /// Field name/value pairs, in document order.
        fields: Vec<(String, String)>,
    },
}

impl DownloadTarget {
    /// URL the request goes to.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Form { action, .. } => action,
        }
    }
}

/// A file written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    /// Absolute or root-relative path of the written file.
    pub path: PathBuf,
    /// Number of bytes written.
    pub bytes: u64,
}

/// Fetches download targets and saves accepted responses.
#[derive(Debug, Clone)]
pub struct Downloader {
    session: HttpSession,
    allowlist: FileTypeAllowlist,
    policy: SanitizePolicy,
}

impl Downloader {
    /// Creates an executor over an authenticated session.
    #[must_use]
    pub fn new(session: HttpSession, allowlist: FileTypeAllowlist, policy: SanitizePolicy) -> Self {
        Self {
            session,
            allowlist,
            policy,
        }
    }

    /// The shared HTTP session.
    #[must_use]
    pub fn session(&self) -> &HttpSession {
        &self.session
    }

    /// Punctuation policy used for file and directory names.
    #[must_use]
    pub fn policy(&self) -> &SanitizePolicy {
        &self.policy
    }

    /// Issues the request for `target` without persisting anything.
    ///
    /// # Errors
    ///
    /// Propagates [`HttpSession`] failures.
    pub async fn request(&self, target: &DownloadTarget) -> Result<FetchResponse, DownloadError> {
        match target {
            DownloadTarget::Url(url) => self.session.get(url).await,
            DownloadTarget::Form { action, fields } => {
                self.session.post_form(action, fields).await
            }
        }
    }

    /// Writes `response` to `dir` if its filename is accepted.
    ///
    /// Returns `None` (and writes nothing) when the response has no
    /// Content-Disposition filename or its extension is not allowed. An
    /// existing file with the same name is overwritten.
    ///
    /// # Errors
    ///
    /// [`DownloadError::Io`] if the file cannot be written.
    pub async fn persist(
        &self,
        response: &FetchResponse,
        dir: &Path,
    ) -> Result<Option<FetchedFile>, DownloadError> {
        let Some(header) = response.content_disposition.as_deref() else {
            debug!(url = %response.url, "response is not an attachment; nothing saved");
            return Ok(None);
        };
        let Some(name) = filename::resolve(header, &self.allowlist, &self.policy) else {
            return Ok(None);
        };

        let path = dir.join(&name);
        tokio::fs::write(&path, &response.body)
            .await
            .map_err(|e| DownloadError::io(path.clone(), e))?;

        let bytes = response.body.len() as u64;
        info!(path = %path.display(), bytes, "saved file");
        Ok(Some(FetchedFile { path, bytes }))
    }

    /// Requests `target` and persists the response into `dir`.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request) and [`persist`](Self::persist).
    #[instrument(skip(self, target, dir), fields(url = %target.url()))]
    pub async fn fetch(
        &self,
        target: &DownloadTarget,
        dir: &Path,
    ) -> Result<Option<FetchedFile>, DownloadError> {
        let response = self.request(target).await?;
        self.persist(&response, dir).await
    }
}
