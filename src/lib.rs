//! Harvester Core Library
//!
//! This library provides the crawl-and-dispatch engine of the harvester
//! tool, which mirrors every course of a learning-management portal into a
//! local directory tree (course / section / files).
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`browser`] - Rendering-engine capability trait and its WebDriver implementation
//! - [`navigation`] - LIFO stack of browsing contexts and bounded waits
//! - [`download`] - Authenticated HTTP session, filename policy, file persistence
//! - [`activity`] - Activity classification and per-type strategies
//! - [`traversal`] - Course and section traversal
//! - [`report`] - Size accounting and the end-of-run report
//! - [`auth`] - Portal login and session-cookie hand-off
//! - [`config`] - File configuration and resolved settings

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod activity;
pub mod auth;
pub mod browser;
pub mod config;
pub mod download;
pub mod error;
pub mod navigation;
pub mod report;
pub mod traversal;
mod user_agent;

// Re-export commonly used types
pub use activity::{ActivityKind, classify, dispatch};
pub use browser::{Browser, BrowserError, ContextHandle, Locator, WebDriverBrowser};
pub use download::{
    DownloadError, DownloadTarget, Downloader, FetchResponse, FetchedFile, FileTypeAllowlist,
    HttpSession, HttpTimeouts, SanitizePolicy, SessionCookie,
};
pub use error::CrawlError;
pub use navigation::{ContextStack, DEFAULT_NAVIGATION_TIMEOUT_SECS};
pub use report::{CourseReport, HarvestReport, SectionReport, SizeAccumulator, format_bytes};
pub use traversal::Harvester;
