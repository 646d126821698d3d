//! Error taxonomy of the crawl-and-dispatch engine.
//!
//! "Nothing to save here" (no filename, rejected extension, unknown activity)
//! is not an error anywhere in the crate; it is an empty `Option` or a zero
//! byte count.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::browser::{BrowserError, ContextHandle};
use crate::download::DownloadError;

/// Errors that abort the current activity and propagate to the enclosing
/// section and course.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// A wait for a new browsing context or a page marker ran out.
    #[error("timed out after {timeout:?} waiting for {waiting_for}")]
    NavigationTimeout {
        /// What was being waited for.
        waiting_for: String,
        /// The bound that was exceeded.
        timeout: Duration,
    },

    /// A context handle did not name an open browsing context.
    #[error("browsing context {handle} is not open")]
    ContextNotFound {
        /// The stale handle.
        handle: ContextHandle,
    },

    /// An attempt to close the root context of the stack.
    #[error("no secondary browsing context is open")]
    EmptyContextStack,

    /// An element reference went stale while it was being used.
    #[error("element reference went stale")]
    StaleReference,

    /// Any other rendering-engine failure.
    #[error(transparent)]
    Browser(BrowserError),

    /// HTTP or persistence failure while fetching a file.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Failed to create a course or section directory.
    #[error("IO error creating {path}: {source}")]
    Io {
        /// Directory being created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl CrawlError {
    /// Creates a navigation timeout error.
    pub fn navigation_timeout(waiting_for: impl Into<String>, timeout: Duration) -> Self {
        Self::NavigationTimeout {
            waiting_for: waiting_for.into(),
            timeout,
        }
    }

    /// Creates a directory creation error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for the one condition the assignment strategy retries.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleReference)
    }
}

impl From<BrowserError> for CrawlError {
    fn from(error: BrowserError) -> Self {
        match error {
            BrowserError::StaleReference => Self::StaleReference,
            BrowserError::NoSuchContext { handle } => Self::ContextNotFound { handle },
            other @ BrowserError::Driver { .. } => Self::Browser(other),
        }
    }
}
