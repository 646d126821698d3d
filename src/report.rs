//! Size accounting and the end-of-run report.

use std::path::PathBuf;

use crate::download::FetchedFile;

const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Formats a byte count with binary prefixes (B, KiB, MiB, GiB, TiB).
///
/// The unit is picked by `floor(log1024(bytes))`; the value is printed with
/// at most two decimals and no trailing zeros.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let index = (bytes.ilog(1024) as usize).min(UNITS.len() - 1);
    if index == 0 {
        return format!("{bytes} B");
    }
    let value = bytes as f64 / 1024_f64.powi(index as i32);
    let rendered = format!("{value:.2}");
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{rendered} {}", UNITS[index])
}

/// Running byte/file totals of one section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeAccumulator {
    bytes: u64,
    files: usize,
}

impl SizeAccumulator {
    /// Adds one download result; `None` contributes nothing.
    pub fn record(&mut self, fetched: Option<&FetchedFile>) {
        if let Some(file) = fetched {
            self.bytes += file.bytes;
            self.files += 1;
        }
    }

    /// Folds in another accumulator (an activity's several files).
    pub fn merge(&mut self, other: SizeAccumulator) {
        self.bytes += other.bytes;
        self.files += other.files;
    }

    /// Total bytes recorded.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Number of files recorded.
    #[must_use]
    pub fn files(&self) -> usize {
        self.files
    }
}

/// What one section produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionReport {
    /// Section name as used for its directory.
    pub name: String,
    /// Directory the section's files went to.
    pub path: PathBuf,
    /// Bytes and files saved.
    pub size: SizeAccumulator,
}

/// What one course produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CourseReport {
    /// Course name as used for its directory.
    pub name: String,
    /// Sections visited, in traversal order. A section cut short by an
    /// error keeps the files it saved before the error.
    pub sections: Vec<SectionReport>,
    /// Why the course was aborted, if it was.
    pub error: Option<String>,
}

impl CourseReport {
    /// Sum over the course's sections.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.sections.iter().map(|s| s.size.bytes()).sum()
    }

    /// Number of files over the course's sections.
    #[must_use]
    pub fn files(&self) -> usize {
        self.sections.iter().map(|s| s.size.files()).sum()
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarvestReport {
    /// Courses in traversal order, failed ones included.
    pub courses: Vec<CourseReport>,
}

impl HarvestReport {
    /// Grand total over every course.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.courses.iter().map(CourseReport::bytes).sum()
    }

    /// Number of files over every course.
    #[must_use]
    pub fn total_files(&self) -> usize {
        self.courses.iter().map(CourseReport::files).sum()
    }

    /// Courses that aborted with an error.
    pub fn failed_courses(&self) -> impl Iterator<Item = &CourseReport> {
        self.courses.iter().filter(|c| c.error.is_some())
    }
}
