//! Shared fixtures for integration tests: a scripted browser, portal page
//! builders and a downloader pointed at a mock file server.

#![allow(dead_code)]

pub mod fake_browser;
pub mod portal;

use std::time::Duration;

use harvester_core::{
    Downloader, FileTypeAllowlist, HttpSession, HttpTimeouts, SanitizePolicy, SessionCookie,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Short bound so timeout paths finish quickly.
pub const TEST_TIMEOUT: Duration = Duration::from_millis(300);

pub const SESSION_COOKIE: &str = "MoodleSessionegela";

/// Downloader with the session cookie seeded for `server`.
pub fn downloader_for(server: &MockServer) -> Downloader {
    let session = HttpSession::new(
        &server.uri(),
        &SessionCookie::new(SESSION_COOKIE, "abc123"),
        HttpTimeouts::default(),
    )
    .expect("session for mock server");
    Downloader::new(
        session,
        FileTypeAllowlist::from_extensions(["pdf", "zip", "png", "txt"]),
        SanitizePolicy::default(),
    )
}

pub fn attachment(filename: &str, body: &[u8]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header(
            "Content-Disposition",
            format!(r#"attachment; filename="{filename}""#),
        )
        .set_body_bytes(body.to_vec())
}

/// Serves `body` as an attachment named `filename` at GET `route`.
pub async fn serve_file(server: &MockServer, route: &str, filename: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(attachment(filename, body))
        .mount(server)
        .await;
}

/// Serves an HTML page without a disposition header at GET `route`.
pub async fn serve_html(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/html")
                .set_body_string("<html><body>landing</body></html>"),
        )
        .mount(server)
        .await;
}
