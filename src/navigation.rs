//! Browsing-context lifecycle: opening, switching and closing tabs in strict
//! LIFO order, plus the bounded waits the crawler blocks on.
//!
//! The root context (the portal's course list) is recorded when the stack is
//! attached and is never closed by the stack. Every secondary context opened
//! through [`ContextStack::open`] is pushed; closing always pops the newest
//! one and restores its parent as the active context.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::browser::{Browser, ContextHandle, Locator};
use crate::error::CrawlError;

/// Default bound for every wait (seconds).
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 10;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Stack of open browsing contexts on one traversal path.
#[derive(Debug)]
pub struct ContextStack {
    root: ContextHandle,
    secondary: Vec<ContextHandle>,
    timeout: Duration,
}

impl ContextStack {
    /// Records the browser's active context as the root of a new stack.
    ///
    /// # Errors
    ///
    /// Propagates rendering-engine failures.
    pub async fn attach<B: Browser + ?Sized>(
        browser: &B,
        timeout: Duration,
    ) -> Result<Self, CrawlError> {
        let root = browser.active_context().await?;
        debug!(root = %root, "attached context stack");
        Ok(Self {
            root,
            secondary: Vec::new(),
            timeout,
        })
    }

    /// Number of secondary contexts currently open on this path.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.secondary.len()
    }

    /// The context that should be active.
    #[must_use]
    pub fn current(&self) -> &ContextHandle {
        self.secondary.last().unwrap_or(&self.root)
    }

    /// Bound applied to every wait on this path.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Opens `trigger` in a new context, waits until the set of contexts has
    /// grown by exactly one, and makes the newcomer active.
    ///
    /// # Errors
    ///
    /// [`CrawlError::NavigationTimeout`] if no new context materialised in
    /// time; the stack is unchanged in that case. If the new context appeared
    /// but could not be activated, it is already on the stack and
    /// [`unwind_to`](Self::unwind_to) closes it.
    pub async fn open<B: Browser + ?Sized>(
        &mut self,
        browser: &B,
        trigger: &B::Element,
    ) -> Result<ContextHandle, CrawlError> {
        let before = browser.context_handles().await?;
        browser.open_in_new_context(trigger).await?;

        let deadline = Instant::now() + self.timeout;
        let opened = loop {
            let after = browser.context_handles().await?;
            if after.len() == before.len() + 1
                && let Some(handle) = after.into_iter().find(|h| !before.contains(h))
            {
                break handle;
            }
            if Instant::now() >= deadline {
                return Err(CrawlError::navigation_timeout(
                    "new browsing context",
                    self.timeout,
                ));
            }
            sleep(POLL_INTERVAL).await;
        };

        // Tracked before switching so a failed switch cannot leak the tab.
        self.secondary.push(opened.clone());
        browser.switch_to(&opened).await?;
        debug!(handle = %opened, depth = self.depth(), "opened secondary context");
        Ok(opened)
    }

    /// Makes `handle` active after checking that it is still open.
    ///
    /// # Errors
    ///
    /// [`CrawlError::ContextNotFound`] for a stale handle.
    pub async fn switch_to<B: Browser + ?Sized>(
        &self,
        browser: &B,
        handle: &ContextHandle,
    ) -> Result<(), CrawlError> {
        let open = browser.context_handles().await?;
        if !open.contains(handle) {
            return Err(CrawlError::ContextNotFound {
                handle: handle.clone(),
            });
        }
        browser.switch_to(handle).await?;
        Ok(())
    }

    /// Closes the newest secondary context. The caller must [`restore`]
    /// afterwards; nothing is active until then.
    ///
    /// [`restore`]: Self::restore
    ///
    /// # Errors
    ///
    /// [`CrawlError::EmptyContextStack`] when only the root is open.
    pub async fn close<B: Browser + ?Sized>(&mut self, browser: &B) -> Result<(), CrawlError> {
        let Some(top) = self.secondary.last().cloned() else {
            return Err(CrawlError::EmptyContextStack);
        };
        self.switch_to(browser, &top).await?;
        browser.close_active().await?;
        self.secondary.pop();
        debug!(handle = %top, depth = self.depth(), "closed secondary context");
        Ok(())
    }

    /// Re-activates the context on top of the stack.
    ///
    /// # Errors
    ///
    /// [`CrawlError::ContextNotFound`] if that context was closed behind the
    /// stack's back.
    pub async fn restore<B: Browser + ?Sized>(&self, browser: &B) -> Result<(), CrawlError> {
        let current = self.current().clone();
        self.switch_to(browser, &current).await
    }

    /// [`close`](Self::close) followed by [`restore`](Self::restore).
    ///
    /// # Errors
    ///
    /// See [`close`](Self::close) and [`restore`](Self::restore).
    pub async fn close_and_restore<B: Browser + ?Sized>(
        &mut self,
        browser: &B,
    ) -> Result<(), CrawlError> {
        self.close(browser).await?;
        self.restore(browser).await
    }

    /// Closes secondary contexts until `depth` remain, restoring the parent
    /// each time. Used to recover a path after an aborted course.
    ///
    /// # Errors
    ///
    /// Propagates the first close/restore failure.
    pub async fn unwind_to<B: Browser + ?Sized>(
        &mut self,
        browser: &B,
        depth: usize,
    ) -> Result<(), CrawlError> {
        if self.depth() > depth {
            warn!(from = self.depth(), to = depth, "unwinding leaked browsing contexts");
        }
        while self.depth() > depth {
            self.close_and_restore(browser).await?;
        }
        Ok(())
    }
}

/// Polls until at least one element matches `locator` inside `scope`.
///
/// # Errors
///
/// [`CrawlError::NavigationTimeout`] once `timeout` has elapsed.
pub async fn wait_for_elements<B: Browser + ?Sized>(
    browser: &B,
    scope: Option<&B::Element>,
    locator: Locator,
    timeout: Duration,
) -> Result<Vec<B::Element>, CrawlError> {
    let deadline = Instant::now() + timeout;
    loop {
        let found = browser.find_all(scope, locator).await?;
        if !found.is_empty() {
            return Ok(found);
        }
        if Instant::now() >= deadline {
            return Err(CrawlError::navigation_timeout(locator.to_string(), timeout));
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Polls until no element matches `locator` in the active document.
///
/// # Errors
///
/// [`CrawlError::NavigationTimeout`] once `timeout` has elapsed.
pub async fn wait_for_absence<B: Browser + ?Sized>(
    browser: &B,
    locator: Locator,
    timeout: Duration,
) -> Result<(), CrawlError> {
    let deadline = Instant::now() + timeout;
    loop {
        if browser.find_all(None, locator).await?.is_empty() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(CrawlError::navigation_timeout(
                format!("{locator} to disappear"),
                timeout,
            ));
        }
        sleep(POLL_INTERVAL).await;
    }
}
