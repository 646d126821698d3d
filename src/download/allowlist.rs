//! File-type allow-list: the extensions eligible for download.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use super::error::DownloadError;

/// Immutable set of accepted file extensions.
///
/// Loaded once before traversal from a newline-delimited file: one extension
/// per line, blank lines and lines starting with `#` ignored. A leading `.`
/// is tolerated (`.pdf` and `pdf` are the same entry). Membership is
/// case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTypeAllowlist {
    extensions: HashSet<String>,
}

impl FileTypeAllowlist {
    /// Builds an allow-list from explicit extensions.
    #[must_use]
    pub fn from_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .filter_map(|ext| normalize_entry(ext.as_ref()))
            .collect();
        Self { extensions }
    }

    /// Parses allow-list file contents.
    #[must_use]
    pub fn parse(contents: &str) -> Self {
        Self::from_extensions(contents.lines())
    }

    /// Reads and parses the allow-list file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self, DownloadError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| DownloadError::io(path, e))?;
        let allowlist = Self::parse(&contents);
        debug!(
            path = %path.display(),
            extensions = allowlist.len(),
            "loaded file-type allow-list"
        );
        Ok(allowlist)
    }

    /// Returns true if `extension` is allowed.
    #[must_use]
    pub fn contains(&self, extension: &str) -> bool {
        self.extensions.contains(extension)
    }

    /// Number of allowed extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// True when nothing is allowed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

fn normalize_entry(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let ext = trimmed.strip_prefix('.').unwrap_or(trimmed);
    (!ext.is_empty()).then(|| ext.to_string())
}
