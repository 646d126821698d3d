//! Resource activities: one file, served either as a direct attachment or
//! behind a landing page that wraps the real link.

use std::path::Path;

use tracing::debug;

use crate::browser::{Browser, Locator};
use crate::download::DownloadTarget;
use crate::error::CrawlError;
use crate::report::SizeAccumulator;
use crate::traversal::Harvester;

/// Marker of either kind of landing page.
const LANDING_MARKER: Locator = Locator::Css(".resourceworkaround, .resourceimage");

/// Fetches the resource behind `node` into `dir`, recording it in `size`.
///
/// The activity link is fetched through the session first. An attachment
/// response is saved as is. Otherwise the link is opened in a secondary
/// context and the file URL is taken from the page's download-workaround
/// link, or failing that from its inline image.
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
    let Some(link) = cx.browser.find_first(Some(node), Locator::Tag("a")).await? else {
        debug!("resource without link; skipped");
        return Ok(());
    };
    let Some(href) = non_empty(cx.browser.attribute(&link, "href").await?) else {
        debug!("resource link without href; skipped");
        return Ok(());
    };

    let response = cx.downloader.request(&DownloadTarget::Url(href.clone())).await?;
    if response.is_attachment() {
        size.record(cx.downloader.persist(&response, dir).await?.as_ref());
        return Ok(());
    }

    debug!(url = %href, "resource served a landing page; opening it");
    cx.open_secondary(&link).await?;
    let outcome = fetch_from_landing_page(cx, dir, size).await;
    let restored = cx.close_secondary().await;
    outcome?;
    restored
}

async fn fetch_from_landing_page<B: Browser + ?Sized>(
    cx: &Harvester<'_, B>,
    dir: &Path,
    size: &mut SizeAccumulator,
) -> Result<(), CrawlError> {
    cx.wait_for(None, LANDING_MARKER).await?;
    let Some(url) = embedded_file_url(cx.browser).await? else {
        debug!("landing page without downloadable link");
        return Ok(());
    };
    let fetched = cx.downloader.fetch(&DownloadTarget::Url(url), dir).await?;
    size.record(fetched.as_ref());
    Ok(())
}

async fn embedded_file_url<B: Browser + ?Sized>(browser: &B) -> Result<Option<String>, CrawlError> {
    if let Some(workaround) = browser
        .find_first(None, Locator::Class("resourceworkaround"))
        .await?
        && let Some(anchor) = browser.find_first(Some(&workaround), Locator::Tag("a")).await?
    {
        return Ok(non_empty(browser.attribute(&anchor, "href").await?));
    }
    if let Some(image) = browser.find_first(None, Locator::Class("resourceimage")).await? {
        return Ok(non_empty(browser.attribute(&image, "src").await?));
    }
    Ok(None)
}

/// Drivers report a missing `href`/`src` property as an empty string.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
