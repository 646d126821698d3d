//! Error types for the rendering-engine capability.

use thiserror::Error;

use super::ContextHandle;

/// Errors reported by a [`Browser`](super::Browser) implementation.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// An element reference no longer belongs to the rendered document.
    #[error("stale element reference")]
    StaleReference,

    /// A context handle does not name an open browsing context.
    #[error("no such browsing context: {handle}")]
    NoSuchContext {
        /// The handle that was used.
        handle: ContextHandle,
    },

    /// Any other failure reported by the driver.
    #[error("browser driver error: {message}")]
    Driver {
        /// Driver-supplied description.
        message: String,
    },
}

impl BrowserError {
    /// Creates a driver error from any displayable failure.
    pub fn driver(message: impl ToString) -> Self {
        Self::Driver {
            message: message.to_string(),
        }
    }

    /// Creates an unknown-context error.
    pub fn no_such_context(handle: ContextHandle) -> Self {
        Self::NoSuchContext { handle }
    }
}
