//! File-backed resume state
//!
//! The resume file holds the decimal text of the last page whose records were
//! accepted, with no trailing newline. It is replaced wholesale on every write.

use crate::{HarvestError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Page numbers are 1-based
pub type PageNumber = u32;

/// Durable slot holding the last completed page
///
/// Single writer, single process. Two runs pointed at the same file race.
#[derive(Debug, Clone)]
pub struct ResumeStore {
    path: PathBuf,
}

impl ResumeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored page, or `None` if the file is missing, unreadable,
    /// or does not hold a positive integer
    pub fn load(&self) -> Option<PageNumber> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("No usable resume state at {}: {}", self.path.display(), e);
                return None;
            }
        };

        match content.trim().parse::<PageNumber>() {
            Ok(page) if page > 0 => Some(page),
            _ => {
                tracing::warn!(
                    "Ignoring unparseable resume state {:?} in {}",
                    content.trim(),
                    self.path.display()
                );
                None
            }
        }
    }

    /// Returns the last completed page, defaulting to 1
    pub fn read(&self) -> PageNumber {
        self.load().unwrap_or(1)
    }

    /// The page a resumed crawl should fetch first
    ///
    /// `Some(1)` when nothing is stored. `None` when the stored page is the
    /// largest representable one and no page can follow it.
    pub fn next_page(&self) -> Option<PageNumber> {
        match self.load() {
            Some(page) => page.checked_add(1),
            None => Some(1),
        }
    }

    /// Overwrites the stored page
    ///
    /// The value is written to a sibling temp file and renamed into place, so a
    /// crash mid-write leaves either the old or the new value.
    pub fn write(&self, page: PageNumber) -> Result<()> {
        let tmp = self.tmp_path();
        fs::write(&tmp, page.to_string()).map_err(|source| self.error(source))?;
        fs::rename(&tmp, &self.path).map_err(|source| self.error(source))?;
        tracing::debug!("Saved resume state: page {}", page);
        Ok(())
    }

    /// Forgets any stored progress
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.error(source)),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn error(&self, source: std::io::Error) -> HarvestError {
        HarvestError::ResumeState {
            path: self.path.clone(),
            source,
        }
    }
}
