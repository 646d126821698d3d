//! Activity classification and per-type download strategies.
//!
//! # Architecture
//!
//! - [`ActivityKind`] - closed set of activity types the crawler knows
//! - [`classify`] - reads a list item's class tokens into an [`ActivityKind`]
//! - [`dispatch`] - routes an activity to its strategy
//! - [`resource`], [`folder`], [`assignment`] - one strategy per kind
//!
//! Every strategy returns the bytes it saved. A strategy that opens a
//! secondary browsing context closes it, and restores the previous one,
//! before it returns, on success and on error alike.

pub mod assignment;
pub mod folder;
pub mod resource;

use std::path::Path;

use tracing::debug;

use crate::browser::{Browser, Locator};
use crate::error::CrawlError;
use crate::report::SizeAccumulator;
use crate::traversal::Harvester;

/// Type of a listed activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    /// A single file, served directly or behind a landing page.
    Resource,
    /// A folder downloadable as one archive.
    Folder,
    /// An assignment with submission/feedback files.
    Assignment,
    /// Anything else (labels, forums, quizzes, ...). Skipped.
    Unknown,
}

impl ActivityKind {
    /// Classifies from the value of an element's `class` attribute.
    ///
    /// Markers are tested as whole class tokens in the order resource,
    /// assignment, folder.
    #[must_use]
    pub fn from_class_attr(class_attr: &str) -> Self {
        let has = |marker: &str| class_attr.split_ascii_whitespace().any(|token| token == marker);
        if has("resource") {
            Self::Resource
        } else if has("assign") {
            Self::Assignment
        } else if has("folder") {
            Self::Folder
        } else {
            Self::Unknown
        }
    }
}

/// Classifies an activity list item.
///
/// # Errors
///
/// Propagates rendering-engine failures (including staleness).
pub async fn classify<B: Browser + ?Sized>(
    browser: &B,
    node: &B::Element,
) -> Result<ActivityKind, CrawlError> {
    let class_attr = browser.attribute(node, "class").await?.unwrap_or_default();
    Ok(ActivityKind::from_class_attr(&class_attr))
}

/// Classifies `node` and runs the matching strategy, saving into `dir`.
///
/// Every file saved is recorded in `size` as soon as it is written, so a
/// strategy that fails part-way still accounts for what it saved.
///
/// # Errors
///
/// Whatever the strategy propagates.
pub async fn dispatch<B: Browser + ?Sized>(
    cx: &mut Harvester<'_, B>,
    node: &B::Element,
    dir: &Path,
    size: &mut SizeAccumulator,
) -> Result<(), CrawlError> {
    let kind = classify(cx.browser, node).await?;
    debug!(?kind, "dispatching activity");
    match kind {
        ActivityKind::Resource => resource::harvest(cx, node, dir, size).await,
        ActivityKind::Folder => folder::harvest(cx, node, dir, size).await,
        ActivityKind::Assignment => assignment::harvest(cx, node, dir, size).await,
        ActivityKind::Unknown => Ok(()),
    }
}

/// The link inside an activity's `.activityinstance` block, if present.
pub(crate) async fn instance_link<B: Browser + ?Sized>(
    browser: &B,
    node: &B::Element,
) -> Result<Option<B::Element>, CrawlError> {
    let Some(instance) = browser
        .find_first(Some(node), Locator::Class("activityinstance"))
        .await?
    else {
        return Ok(None);
    };
    Ok(browser.find_first(Some(&instance), Locator::Tag("a")).await?)
}
