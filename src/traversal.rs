//! Course and section traversal.
//!
//! [`Harvester`] walks the portal's course list from the root context. Each
//! course is opened in its own secondary context; its sections are either
//! read inline from the course page (unique-portal layout) or each opened in
//! a further nested context (multiple-portals layout, recognised by the
//! presence of "go to section" links). Directories are created before any
//! file lands in them and byte totals roll up section, course and run.

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::activity;
use crate::browser::{Browser, Locator};
use crate::download::Downloader;
use crate::error::CrawlError;
use crate::navigation::{ContextStack, wait_for_elements};
use crate::report::{CourseReport, HarvestReport, SectionReport, SizeAccumulator, format_bytes};

/// Everything one traversal path needs: the rendering engine, the
/// authenticated downloader and the stack of contexts opened so far.
pub struct Harvester<'a, B: Browser + ?Sized> {
    pub(crate) browser: &'a B,
    pub(crate) downloader: &'a Downloader,
    pub(crate) contexts: ContextStack,
}

impl<'a, B: Browser + ?Sized> Harvester<'a, B> {
    /// Creates a harvester over an already attached context stack.
    pub fn new(browser: &'a B, downloader: &'a Downloader, contexts: ContextStack) -> Self {
        Self {
            browser,
            downloader,
            contexts,
        }
    }

    /// Context stack of this path.
    #[must_use]
    pub fn contexts(&self) -> &ContextStack {
        &self.contexts
    }

    /// Opens `link` in a new context and makes it active.
    pub(crate) async fn open_secondary(&mut self, link: &B::Element) -> Result<(), CrawlError> {
        self.contexts.open(self.browser, link).await?;
        Ok(())
    }

    /// Closes the newest context and re-activates its parent.
    pub(crate) async fn close_secondary(&mut self) -> Result<(), CrawlError> {
        self.contexts.close_and_restore(self.browser).await
    }

    /// Waits, bounded by the path's timeout, for `locator` under `scope`.
    pub(crate) async fn wait_for(
        &self,
        scope: Option<&B::Element>,
        locator: Locator,
    ) -> Result<Vec<B::Element>, CrawlError> {
        wait_for_elements(self.browser, scope, locator, self.contexts.timeout()).await
    }

    /// Harvests every course listed in the active (root) context into
    /// `output_root`.
    ///
    /// A course that fails is recorded with its error, its contexts are
    /// closed, and traversal continues with the next course.
    ///
    /// # Errors
    ///
    /// Only failures that leave the root context unusable: listing the
    /// courses, or unwinding after a failed course.
    #[instrument(skip(self), fields(output = %output_root.display()))]
    pub async fn harvest_courses(&mut self, output_root: &Path) -> Result<HarvestReport, CrawlError> {
        let mut report = HarvestReport::default();
        let courses = self.browser.find_all(None, Locator::Class("coursebox")).await?;
        info!(courses = courses.len(), "found courses");

        for (index, coursebox) in courses.iter().enumerate() {
            let Some(link) = self.browser.find_first(Some(coursebox), Locator::Tag("a")).await?
            else {
                debug!(index, "course box without link; skipped");
                continue;
            };
            let name = course_dir_name(&self.browser.text(&link).await?, index);
            let course_dir = output_root.join(&name);
            info!(course = %name, "harvesting course");

            let mut course = CourseReport {
                name,
                ..CourseReport::default()
            };
            if let Err(error) = self.harvest_course(&link, &course_dir, &mut course).await {
                warn!(course = %course.name, error = %error, "course aborted");
                course.error = Some(error.to_string());
                self.contexts.unwind_to(self.browser, 0).await?;
            }
            info!(
                course = %course.name,
                total = %format_bytes(course.bytes()),
                files = course.files(),
                "course done"
            );
            report.courses.push(course);
        }

        info!(
            total = %format_bytes(report.total_bytes()),
            files = report.total_files(),
            "harvest done"
        );
        Ok(report)
    }

    async fn harvest_course(
        &mut self,
        link: &B::Element,
        course_dir: &Path,
        course: &mut CourseReport,
    ) -> Result<(), CrawlError> {
        create_dir(course_dir).await?;
        self.open_secondary(link).await?;
        let outcome = self.harvest_course_page(course_dir, course).await;
        let restored = self.close_secondary().await;
        outcome?;
        restored
    }

    async fn harvest_course_page(
        &mut self,
        course_dir: &Path,
        course: &mut CourseReport,
    ) -> Result<(), CrawlError> {
        let topics = self.wait_for(None, Locator::Class("topics")).await?;
        let section_links = self
            .browser
            .find_all(None, Locator::Class("section-go-link"))
            .await?;

        if section_links.is_empty() {
            info!(course = %course.name, "section layout: unique portal");
            let Some(topics) = topics.first() else {
                return Ok(());
            };
            let sections = self.browser.find_all(Some(topics), Locator::Class("main")).await?;
            for (index, section) in sections.iter().enumerate() {
                self.harvest_inline_section(section, index, course_dir, course).await?;
            }
        } else {
            info!(course = %course.name, sections = section_links.len(), "section layout: multiple portals");
            for (index, link) in section_links.iter().enumerate() {
                self.open_secondary(link).await?;
                let outcome = self.harvest_section_page(index, course_dir, course).await;
                let restored = self.close_secondary().await;
                outcome?;
                restored?;
            }
        }
        Ok(())
    }

    async fn harvest_inline_section(
        &mut self,
        section: &B::Element,
        index: usize,
        course_dir: &Path,
        course: &mut CourseReport,
    ) -> Result<(), CrawlError> {
        self.wait_for(None, Locator::Class("sectionname")).await?;
        let title = match self.browser.find_first(Some(section), Locator::Class("content")).await? {
            Some(content) => match self.browser.find_first(Some(&content), Locator::Tag("a")).await? {
                Some(anchor) => self.browser.text(&anchor).await?,
                None => String::new(),
            },
            None => String::new(),
        };
        self.harvest_section(section, &title, index, course_dir, course).await
    }

    async fn harvest_section_page(
        &mut self,
        index: usize,
        course_dir: &Path,
        course: &mut CourseReport,
    ) -> Result<(), CrawlError> {
        let pages = self.wait_for(None, Locator::Class("single-section")).await?;
        let Some(page) = pages.first() else {
            return Err(CrawlError::navigation_timeout(
                Locator::Class("single-section").to_string(),
                self.contexts.timeout(),
            ));
        };
        let title = match self.browser.find_first(Some(page), Locator::Class("sectionname")).await? {
            Some(heading) => self.browser.text(&heading).await?,
            None => String::new(),
        };
        self.harvest_section(page, &title, index, course_dir, course).await
    }

    /// Creates the section directory and dispatches each activity under the
    /// section's `.img-text` list. A section without that list yields zero.
    ///
    /// The section is added to `course` even when an activity fails, with
    /// the files saved up to that point.
    async fn harvest_section(
        &mut self,
        section: &B::Element,
        title: &str,
        index: usize,
        course_dir: &Path,
        course: &mut CourseReport,
    ) -> Result<(), CrawlError> {
        let name = self.section_dir_name(title, index);
        let path = course_dir.join(&name);
        create_dir(&path).await?;
        info!(section = %name, "harvesting section");

        let mut size = SizeAccumulator::default();
        let outcome = self.harvest_activities(section, &path, &mut size).await;

        info!(
            section = %name,
            total = %format_bytes(size.bytes()),
            files = size.files(),
            "section done"
        );
        course.sections.push(SectionReport { name, path, size });
        outcome
    }

    async fn harvest_activities(
        &mut self,
        section: &B::Element,
        dir: &Path,
        size: &mut SizeAccumulator,
    ) -> Result<(), CrawlError> {
        let Some(list) = self.browser.find_first(Some(section), Locator::Class("img-text")).await?
        else {
            return Ok(());
        };
        for activity in self.browser.find_all(Some(&list), Locator::Tag("li")).await? {
            activity::dispatch(self, &activity, dir, size).await?;
        }
        Ok(())
    }

    fn section_dir_name(&self, title: &str, index: usize) -> String {
        let name = self.downloader.policy().sanitize(title.trim());
        let name = name.trim();
        if name.is_empty() || name == "." || name == ".." {
            format!("section-{}", index + 1)
        } else {
            name.to_string()
        }
    }
}

/// Directory name for a course: its link text with `/` replaced by `-`.
#[must_use]
pub fn course_dir_name(text: &str, index: usize) -> String {
    let name = text.trim().replace(['/', '\\'], "-");
    if name.is_empty() || name == "." || name == ".." {
        format!("course-{}", index + 1)
    } else {
        name
    }
}

async fn create_dir(path: &Path) -> Result<(), CrawlError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| CrawlError::io(path, e))
}
