//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use harvester_core::config::Overrides;

/// Archive every course of a learning-management portal to disk.
///
/// Harvester logs into the portal through a WebDriver-controlled browser,
/// walks every course and section, and saves each resource, folder and
/// assignment file whose extension is allow-listed.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Directory where course folders are created
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Newline-separated list of allowed file extensions
    #[arg(long, value_name = "PATH")]
    pub file_types: Option<PathBuf>,

    /// Portal front page
    #[arg(long, value_name = "URL")]
    pub portal_url: Option<String>,

    /// WebDriver server (geckodriver) URL
    #[arg(long, value_name = "URL")]
    pub webdriver_url: Option<String>,

    /// Portal username (the password is still prompted for)
    #[arg(short, long)]
    pub username: Option<String>,

    /// JSON file with {"username": ..., "password": ...}
    #[arg(long, value_name = "PATH")]
    pub credentials: Option<PathBuf>,

    /// Bound on every page and tab wait, in seconds (1-600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=600))]
    pub nav_timeout: Option<u64>,

    /// Strip `-`, `.` and `_` from names too
    #[arg(long)]
    pub strip_separators: bool,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    /// Log level used when `RUST_LOG` is not set.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Settings the command line overrides.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            output_dir: self.output.clone(),
            portal_url: self.portal_url.clone(),
            webdriver_url: self.webdriver_url.clone(),
            file_types: self.file_types.clone(),
            navigation_timeout_secs: self.nav_timeout,
            strip_separators: self.strip_separators,
            headless: self.headless,
        }
    }
}
