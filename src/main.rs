//! CLI entry point for the harvester tool.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use harvester_core::auth::{self, Credentials};
use harvester_core::config::{Settings, load_default_file_config};
use harvester_core::{
    Browser, ContextStack, Downloader, FileTypeAllowlist, HarvestReport, Harvester, HttpSession,
    WebDriverBrowser, format_bytes,
};
use tracing::{debug, info, warn};

mod cli;
mod terminal;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    terminal::init_tracing(args.default_log_level(), terminal::is_no_color_requested(&args));
    debug!(?args, "CLI arguments parsed");

    let loaded = load_default_file_config()?;
    if let Some(path) = loaded.path.as_deref()
        && loaded.config.is_some()
    {
        debug!(path = %path.display(), "loaded config file");
    }
    let settings = Settings::resolve(args.overrides(), loaded.config.as_ref())?;

    let allowlist = FileTypeAllowlist::load(&settings.file_types)
        .with_context(|| format!("Failed to load file types from '{}'", settings.file_types.display()))?;
    if allowlist.is_empty() {
        warn!(path = %settings.file_types.display(), "allow-list is empty; nothing will be saved");
    }
    tokio::fs::create_dir_all(&settings.output_dir)
        .await
        .with_context(|| format!("Failed to create output directory '{}'", settings.output_dir.display()))?;

    info!(portal = %settings.portal_url, output = %settings.output_dir.display(), "Harvester starting");
    let browser = WebDriverBrowser::connect(&settings.webdriver_url, settings.headless)
        .await
        .with_context(|| format!("Failed to start a browser session at {}", settings.webdriver_url))?;

    let outcome = run(&browser, &args, &settings, allowlist).await;

    // Shut down the browser on every path, failed runs included.
    if let Err(e) = browser.clear_cookies().await {
        warn!(error = %e, "failed to clear browser cookies");
    }
    if let Err(e) = browser.quit().await {
        warn!(error = %e, "failed to close browser session");
    }

    let report = outcome?;
    print_summary(&report, &settings.output_dir);
    Ok(())
}

async fn run(
    browser: &WebDriverBrowser,
    args: &Args,
    settings: &Settings,
    allowlist: FileTypeAllowlist,
) -> Result<HarvestReport> {
    browser
        .goto(&settings.portal_url)
        .await
        .with_context(|| format!("Failed to open {}", settings.portal_url))?;

    if auth::needs_login(browser).await? {
        let credentials = Credentials::resolve(args.credentials.as_deref(), args.username.clone())?;
        auth::login(browser, &credentials, settings.navigation_timeout).await?;
    }
    let cookie = auth::session_cookie(browser, &settings.session_cookie).await?;

    let session = HttpSession::new(&settings.portal_url, &cookie, settings.http_timeouts)?;
    let downloader = Downloader::new(session, allowlist, settings.sanitize.clone());
    let contexts = ContextStack::attach(browser, settings.navigation_timeout).await?;
    let mut harvester = Harvester::new(browser, &downloader, contexts);

    let report = harvester.harvest_courses(&settings.output_dir).await;
    downloader.session().clear_cookies();
    Ok(report?)
}

fn print_summary(report: &HarvestReport, output: &Path) {
    for course in &report.courses {
        match &course.error {
            None => println!(
                "{}: {} in {} files",
                course.name,
                format_bytes(course.bytes()),
                course.files()
            ),
            Some(error) => println!("{}: FAILED ({error})", course.name),
        }
    }
    println!(
        "Total: {} in {} files saved to {}",
        format_bytes(report.total_bytes()),
        report.total_files(),
        output.display()
    );
    let failed = report.failed_courses().count();
    if failed > 0 {
        println!("{failed} course(s) failed; see the log for details");
    }
}
