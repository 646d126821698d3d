//! Folder activities: the folder page's "download folder" form is posted
//! through the session and the response saved as one archive.

use std::path::Path;

use tracing::debug;

use crate::activity::instance_link;
use crate::browser::{Browser, Locator};
use crate::download::DownloadTarget;
use crate::error::CrawlError;
use crate::report::SizeAccumulator;
use crate::traversal::Harvester;

/// Downloads the folder behind `node` into `dir` as a single archive.
///
/// # Errors
///
/// Navigation timeouts, rendering-engine and HTTP failures.
pub async fn harvest<B: Browser + ?Sized>(
    cx: &mut Harvester<'_, B>,
    node: &B::Element,
    dir: &Path,
    size: &mut SizeAccumulator,
) -> Result<(), CrawlError> {
    let Some(link) = instance_link(cx.browser, node).await? else {
        debug!("folder without link; skipped");
        return Ok(());
    };

    cx.open_secondary(&link).await?;
    let outcome = download_archive(cx, dir, size).await;
    let restored = cx.close_secondary().await;
    outcome?;
    restored
}

async fn download_archive<B: Browser + ?Sized>(
    cx: &Harvester<'_, B>,
    dir: &Path,
    size: &mut SizeAccumulator,
) -> Result<(), CrawlError> {
    let buttons = cx.wait_for(None, Locator::Class("singlebutton")).await?;
    let Some(button) = buttons.first() else {
        return Ok(());
    };
    let Some(target) = download_form(cx.browser, button).await? else {
        debug!("folder page without download form");
        return Ok(());
    };
    size.record(cx.downloader.fetch(&target, dir).await?.as_ref());
    Ok(())
}

/// Reads the form inside `container`: its action URL and every named input.
pub(crate) async fn download_form<B: Browser + ?Sized>(
    browser: &B,
    container: &B::Element,
) -> Result<Option<DownloadTarget>, CrawlError> {
    let Some(form) = browser.find_first(Some(container), Locator::Tag("form")).await? else {
        return Ok(None);
    };
    let Some(action) = browser.attribute(&form, "action").await? else {
        return Ok(None);
    };

    let mut fields = Vec::new();
    for input in browser.find_all(Some(container), Locator::Tag("input")).await? {
        let Some(name) = browser.attribute(&input, "name").await?.filter(|n| !n.is_empty())
        else {
            continue;
        };
        let value = browser.attribute(&input, "value").await?.unwrap_or_default();
        fields.push((name, value));
    }
    debug!(action = %action, fields = fields.len(), "collected download form");
    Ok(Some(DownloadTarget::Form { action, fields }))
}
