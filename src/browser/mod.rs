//! Rendering-engine capability consumed by the crawler.
//!
//! The portal renders its course tree with JavaScript, so every document query
//! goes through a remote-controlled browser. This module defines the narrow
//! surface the crawler needs from it:
//!
//! - [`Browser`] - async trait over element queries, simulated user actions,
//!   browsing-context (tab) enumeration and switching, and cookies
//! - [`Locator`] - how an element is looked up (class, tag, CSS selector, id)
//! - [`ContextHandle`] - opaque identifier of one browsing context
//! - [`WebDriverBrowser`] - implementation over a W3C WebDriver session
//!
//! Waiting for conditions is not part of the trait; callers poll with
//! [`crate::navigation::wait_for_elements`].

mod error;
mod webdriver;

pub use error::BrowserError;
pub use webdriver::WebDriverBrowser;

use std::fmt;

use async_trait::async_trait;

/// Element lookup strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// Elements carrying the given class token.
    Class(&'static str),
    /// Elements with the given tag name.
    Tag(&'static str),
    /// Elements matching a CSS selector (may be a selector list).
    Css(&'static str),
    /// The element with the given id.
    Id(&'static str),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(name) => write!(f, ".{name}"),
            Self::Tag(name) => write!(f, "{name}"),
            Self::Css(selector) => write!(f, "{selector}"),
            Self::Id(id) => write!(f, "#{id}"),
        }
    }
}

/// Opaque handle of one browsing context (tab or window).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextHandle(String);

impl ContextHandle {
    /// Wraps a driver-issued handle identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability interface of the rendering engine.
///
/// All document queries run against the *active* browsing context. Element
/// values are live references into that context's document and may go stale
/// when the page re-renders; implementations report that as
/// [`BrowserError::StaleReference`].
#[async_trait]
pub trait Browser: Send + Sync {
    /// Reference to an element of a rendered document.
    type Element: Clone + Send + Sync + fmt::Debug;

    /// Navigates the active context to `url`.
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// Returns every element matching `locator` inside `scope` (or the whole
    /// document when `scope` is `None`). No match is an empty vector.
    async fn find_all(
        &self,
        scope: Option<&Self::Element>,
        locator: Locator,
    ) -> Result<Vec<Self::Element>, BrowserError>;

    /// Returns the first element matching `locator`, if any.
    async fn find_first(
        &self,
        scope: Option<&Self::Element>,
        locator: Locator,
    ) -> Result<Option<Self::Element>, BrowserError> {
        Ok(self.find_all(scope, locator).await?.into_iter().next())
    }

    /// Rendered text of an element.
    async fn text(&self, element: &Self::Element) -> Result<String, BrowserError>;

    /// Attribute value of an element, `None` if the attribute is absent.
    async fn attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, BrowserError>;

    /// Types text into an input element.
    async fn send_keys(&self, element: &Self::Element, text: &str) -> Result<(), BrowserError>;

    /// Clicks an element.
    async fn click(&self, element: &Self::Element) -> Result<(), BrowserError>;

    /// Performs the "open in new context" user action on a link element.
    ///
    /// Returns once the action was dispatched; the new context may appear
    /// asynchronously.
    async fn open_in_new_context(&self, element: &Self::Element) -> Result<(), BrowserError>;

    /// Enumerates the handles of every open browsing context.
    async fn context_handles(&self) -> Result<Vec<ContextHandle>, BrowserError>;

    /// Handle of the active browsing context.
    async fn active_context(&self) -> Result<ContextHandle, BrowserError>;

    /// Makes `handle` the active context for all subsequent queries.
    async fn switch_to(&self, handle: &ContextHandle) -> Result<(), BrowserError>;

    /// Closes the active context. No context is active afterwards until the
    /// caller switches explicitly.
    async fn close_active(&self) -> Result<(), BrowserError>;

    /// Value of the named cookie of the browsing session.
    async fn cookie(&self, name: &str) -> Result<Option<String>, BrowserError>;

    /// Deletes every cookie of the browsing session.
    async fn clear_cookies(&self) -> Result<(), BrowserError>;

    /// Ends the browsing session.
    async fn quit(&self) -> Result<(), BrowserError>;
}
