//! User-Agent string for portal HTTP requests.

/// Default User-Agent for session requests (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("harvester/{version} (course-archive-tool)")
}
