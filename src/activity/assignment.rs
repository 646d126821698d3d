//! Assignment activities: every submission or feedback file linked from the
//! assignment page's result tables.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::activity::instance_link;
use crate::browser::{Browser, Locator};
use crate::download::DownloadTarget;
use crate::error::CrawlError;
use crate::report::SizeAccumulator;
use crate::traversal::Harvester;

/// Attempts per assignment when its element reference goes stale.
pub const MAX_ATTEMPTS: usize = 2;

/// File areas of submission and feedback attachments.
#[allow(clippy::expect_used)]
static ASSIGNMENT_FILE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(submission|feedback)_files").expect("assignment regex is valid") // Static pattern, safe to panic
});

/// Returns true if `url` points at a submission or feedback file.
#[must_use]
pub fn is_assignment_file(url: &str) -> bool {
    ASSIGNMENT_FILE_PATTERN.is_match(url)
}

/// Downloads every submission/feedback file of the assignment behind `node`.
///
/// If the node goes stale mid-way (the section page re-rendered), the whole
/// strategy restarts with the same node, up to [`MAX_ATTEMPTS`] runs. Only
/// the last run's files are recorded in `size`, including those it saved
/// before failing; a retried run rewrites the same paths.
///
/// # Errors
///
/// [`CrawlError::StaleReference`] once attempts are exhausted, plus
/// navigation timeouts, rendering-engine and HTTP failures.
pub async fn harvest<B: Browser + ?Sized>(
    cx: &mut Harvester<'_, B>,
    node: &B::Element,
    dir: &Path,
    size: &mut SizeAccumulator,
) -> Result<(), CrawlError> {
    let mut attempt = 1;
    loop {
        let mut run = SizeAccumulator::default();
        match harvest_once(cx, node, dir, &mut run).await {
            Err(error) if error.is_stale() && attempt < MAX_ATTEMPTS => {
                warn!(attempt, "assignment reference went stale; retrying");
                attempt += 1;
            }
            outcome => {
                size.merge(run);
                return outcome;
            }
        }
    }
}

async fn harvest_once<B: Browser + ?Sized>(
    cx: &mut Harvester<'_, B>,
    node: &B::Element,
    dir: &Path,
    size: &mut SizeAccumulator,
) -> Result<(), CrawlError> {
    let Some(link) = instance_link(cx.browser, node).await? else {
        debug!("assignment without link; skipped");
        return Ok(());
    };

    cx.open_secondary(&link).await?;
    let outcome = download_table_files(cx, dir, size).await;
    let restored = cx.close_secondary().await;
    outcome?;
    restored
}

async fn download_table_files<B: Browser + ?Sized>(
    cx: &Harvester<'_, B>,
    dir: &Path,
    size: &mut SizeAccumulator,
) -> Result<(), CrawlError> {
    for table in cx.wait_for(None, Locator::Class("generaltable")).await? {
        for anchor in cx.browser.find_all(Some(&table), Locator::Tag("a")).await? {
            let Some(href) = cx.browser.attribute(&anchor, "href").await? else {
                continue;
            };
            if !is_assignment_file(&href) {
                continue;
            }
            size.record(cx.downloader.fetch(&DownloadTarget::Url(href), dir).await?.as_ref());
        }
    }
    Ok(())
}
