//! Filename policy: Content-Disposition extraction, punctuation stripping and
//! extension allow-listing.
//!
//! The server-suggested filename is the only name a download is ever saved
//! under. [`resolve`] chains the steps; a `None` anywhere means "nothing to
//! save", which is a normal outcome and not an error.

use tracing::debug;

use super::allowlist::FileTypeAllowlist;

/// Separators kept by [`SanitizePolicy::retain_separators`].
pub const DEFAULT_RETAINED_SEPARATORS: [char; 3] = ['-', '.', '_'];

/// Which ASCII punctuation characters survive sanitization.
///
/// Path separators are never retained, whatever the configuration says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizePolicy {
    retained: Vec<char>,
}

impl Default for SanitizePolicy {
    fn default() -> Self {
        Self::retain_separators()
    }
}

impl SanitizePolicy {
    /// Keeps the given punctuation characters and strips every other one.
    #[must_use]
    pub fn new(retained: impl IntoIterator<Item = char>) -> Self {
        let retained = retained
            .into_iter()
            .filter(|c| c.is_ascii_punctuation() && !matches!(c, '/' | '\\'))
            .collect();
        Self { retained }
    }

    /// Keeps hyphen, period and underscore.
    #[must_use]
    pub fn retain_separators() -> Self {
        Self::new(DEFAULT_RETAINED_SEPARATORS)
    }

    /// Strips all punctuation, separators included.
    #[must_use]
    pub fn strip_all() -> Self {
        Self::new([])
    }

    /// Characters kept by this policy.
    #[must_use]
    pub fn retained(&self) -> &[char] {
        &self.retained
    }

    /// Removes ASCII punctuation (except the retained set) and control
    /// characters. Idempotent.
    #[must_use]
    pub fn sanitize(&self, name: &str) -> String {
        name.chars()
            .filter(|c| !c.is_control())
            .filter(|c| !c.is_ascii_punctuation() || self.retained.contains(c))
            .collect()
    }
}

/// Extracts the filename from a Content-Disposition header value.
///
/// Handles:
/// - `attachment; filename="example.pdf"`
/// - `attachment; filename=example.pdf`
/// - `attachment; filename*=UTF-8''example.pdf` (RFC 5987, preferred)
#[must_use]
pub fn extract(header: &str) -> Option<String> {
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + 10..].trim();
        // Format: charset'language'encoded_value
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            if let Ok(decoded) = urlencoding::decode(encoded[..end].trim())
                && !decoded.is_empty()
            {
                return Some(decoded.into_owned());
            }
        }
    }

    let pos = header.find("filename=")?;
    let value = header[pos + 9..].trim();
    let name = if let Some(stripped) = value.strip_prefix('"') {
        let end = stripped.find('"')?;
        &stripped[..end]
    } else {
        let end = value.find(';').unwrap_or(value.len());
        value[..end].trim()
    };
    (!name.is_empty()).then(|| name.to_string())
}

/// Returns true if the extension (text after the last `.`) is allowed.
/// A name without a period, or with nothing after it, is rejected.
#[must_use]
pub fn accept(filename: &str, allowlist: &FileTypeAllowlist) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| !ext.is_empty() && allowlist.contains(ext))
}

/// Extracts, validates and sanitizes the name to save a response under.
///
/// Only the part before the last period is sanitized; the extension is kept
/// byte-for-byte so the saved name still passes [`accept`].
#[must_use]
pub fn resolve(
    header: &str,
    allowlist: &FileTypeAllowlist,
    policy: &SanitizePolicy,
) -> Option<String> {
    let Some(filename) = extract(header) else {
        debug!(header, "no filename in content-disposition");
        return None;
    };
    if !accept(&filename, allowlist) {
        debug!(%filename, "extension not in allow-list");
        return None;
    }
    let (stem, ext) = filename.rsplit_once('.')?;
    let stem = policy.sanitize(stem);
    let stem = if stem.is_empty() { "_" } else { stem.as_str() };
    Some(format!("{stem}.{ext}"))
}
