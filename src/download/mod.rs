//! HTTP fetch and persistence of portal files.
//!
//! This module turns a link or form found in the rendered portal into a file
//! on disk, through the HTTP session that shares the browser's cookie.
//!
//! # Features
//!
//! - Cookie-authenticated GET and form POST ([`HttpSession`])
//! - Filename taken from the Content-Disposition header only ([`filename`])
//! - Extension allow-list loaded from a text file ([`FileTypeAllowlist`])
//! - Configurable punctuation stripping ([`SanitizePolicy`])
//! - Structured error types with URL/path context ([`DownloadError`])
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::download::{
//!     DownloadTarget, Downloader, FileTypeAllowlist, HttpSession, HttpTimeouts,
//!     SanitizePolicy, SessionCookie,
//! };
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cookie = SessionCookie::new("MoodleSessionegela", "value-from-browser");
//! let session = HttpSession::new("https://egela.ehu.eus", &cookie, HttpTimeouts::default())?;
//! let downloader = Downloader::new(
//!     session,
//!     FileTypeAllowlist::from_extensions(["pdf"]),
//!     SanitizePolicy::default(),
//! );
//! let target = DownloadTarget::Url("https://egela.ehu.eus/mod/resource/view.php?id=1".into());
//! if let Some(file) = downloader.fetch(&target, Path::new("./out")).await? {
//!     println!("{} ({} bytes)", file.path.display(), file.bytes);
//! }
//! # Ok(())
//! # }
//! ```

mod allowlist;
mod client;
mod error;
mod executor;
pub mod filename;

pub use allowlist::FileTypeAllowlist;
pub use client::{
    CONNECT_TIMEOUT_SECS, FetchResponse, HttpSession, HttpTimeouts, READ_TIMEOUT_SECS,
    SessionCookie,
};
pub use error::DownloadError;
pub use executor::{DownloadTarget, Downloader, FetchedFile};
pub use filename::SanitizePolicy;

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
