//! Durable progress record and the on-disk layout of one OCR run.
//!
//! The progress record is the heart of the resume contract: after every
//! successfully extracted page it is rewritten, so a crash at any point
//! leaves a record describing a consistent prefix of completed work. On the
//! next run, pages present in the record are skipped — but only after their
//! result file has been re-read successfully. The record is a hint; the
//! result file is the truth.
//!
//! Loading is deliberately forgiving: an absent or malformed record file
//! yields an empty record with a warning, never an error. The worst case of
//! a lost record is re-paying for pages already extracted; the worst case of
//! a fatal parse error would be a run that can never be resumed at all.
//!
//! On-disk layout of a run directory (see [`Workspace`]):
//!
//! ```text
//! <output_dir>/
//!   images/page_1.png …     rendered page artifacts
//!   page_1.json …           per-page extraction results (.txt in text mode)
//!   progress.json           the progress record
//!   final_output.json       aggregate (final_output.txt in text mode)
//! ```

use crate::config::OutputFormat;
use crate::error::PagecastError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the progress record file inside the run directory.
pub const CHECKPOINT_FILE: &str = "progress.json";

/// Name of the page-image subdirectory inside the run directory.
pub const IMAGES_DIR: &str = "images";

/// Mapping from completed page index to its result file.
///
/// Keys are 1-based page numbers serialised as strings — the record is a
/// plain JSON object (`{"processed_pages": {"3": "…/page_3.json"}}`) so it
/// stays greppable and hand-editable. Entries are only ever added during a
/// run; clearing the record is an explicit user action
/// ([`Workspace::clear_checkpoint`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default)]
    pub processed_pages: BTreeMap<String, PathBuf>,
}

impl Checkpoint {
    /// Load the record from `path`.
    ///
    /// Absent file ⇒ empty record. Malformed file ⇒ empty record with a
    /// warning. Neither is fatal: the affected pages are simply treated as
    /// not yet done.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No progress record at {}; starting fresh", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!(
                    "Progress record {} unreadable ({}); treating as empty",
                    path.display(),
                    e
                );
                return Self::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                warn!(
                    "Progress record {} malformed ({}); treating as empty",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Persist the record atomically (temp file + rename in-place).
    ///
    /// Called after every successful page so an interruption at any point
    /// leaves either the previous record or the new one on disk, never a
    /// torn write.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let body = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, path)
    }

    /// Record `page` as done, with its result at `result`.
    pub fn record(&mut self, page: usize, result: &Path) {
        self.processed_pages
            .insert(page.to_string(), result.to_path_buf());
    }

    /// Result path recorded for `page`, if any.
    pub fn result_for(&self, page: usize) -> Option<&Path> {
        self.processed_pages
            .get(&page.to_string())
            .map(PathBuf::as_path)
    }

    /// Number of pages recorded as done.
    pub fn len(&self) -> usize {
        self.processed_pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed_pages.is_empty()
    }
}

/// Path conventions for one run's output directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open (creating if needed) the run directory and its image
    /// subdirectory. Creation is idempotent; an unwritable location is a
    /// fatal configuration error surfaced before any processing begins.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PagecastError> {
        let root = root.into();
        let images = root.join(IMAGES_DIR);
        std::fs::create_dir_all(&images).map_err(|source| PagecastError::OutputDirUnwritable {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.root.join(CHECKPOINT_FILE)
    }

    /// Rendered artifact for a 1-based page number.
    pub fn page_image_path(&self, page: usize) -> PathBuf {
        self.root.join(IMAGES_DIR).join(format!("page_{page}.png"))
    }

    /// Extraction result file for a 1-based page number.
    pub fn page_result_path(&self, page: usize, format: OutputFormat) -> PathBuf {
        let ext = match format {
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
        };
        self.root.join(format!("page_{page}.{ext}"))
    }

    /// Final aggregate output file.
    pub fn aggregate_path(&self, format: OutputFormat) -> PathBuf {
        match format {
            OutputFormat::Json => self.root.join("final_output.json"),
            OutputFormat::Text => self.root.join("final_output.txt"),
        }
    }

    /// Delete the progress record, forcing the next run to reprocess every
    /// page. This is the only way the record is ever removed.
    pub fn clear_checkpoint(&self) -> io::Result<()> {
        match std::fs::remove_file(self.checkpoint_path()) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_record_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint::load(&dir.path().join(CHECKPOINT_FILE));
        assert!(checkpoint.is_empty());
    }

    #[test]
    fn malformed_record_is_empty_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHECKPOINT_FILE);
        std::fs::write(&path, "{not json at all").unwrap();
        let checkpoint = Checkpoint::load(&path);
        assert!(checkpoint.is_empty());
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHECKPOINT_FILE);

        let mut checkpoint = Checkpoint::default();
        checkpoint.record(1, Path::new("out/page_1.json"));
        checkpoint.record(3, Path::new("out/page_3.json"));
        checkpoint.save(&path).unwrap();

        let loaded = Checkpoint::load(&path);
        assert_eq!(loaded, checkpoint);
        assert_eq!(loaded.result_for(3), Some(Path::new("out/page_3.json")));
        assert_eq!(loaded.result_for(2), None);
    }

    #[test]
    fn record_keys_are_one_based_strings() {
        let mut checkpoint = Checkpoint::default();
        checkpoint.record(12, Path::new("page_12.txt"));
        let json = serde_json::to_string(&checkpoint).unwrap();
        assert!(json.contains("\"12\""), "got: {json}");
    }

    #[test]
    fn save_replaces_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHECKPOINT_FILE);

        let mut checkpoint = Checkpoint::default();
        checkpoint.record(1, Path::new("page_1.json"));
        checkpoint.save(&path).unwrap();
        checkpoint.record(2, Path::new("page_2.json"));
        checkpoint.save(&path).unwrap();

        let loaded = Checkpoint::load(&path);
        assert_eq!(loaded.len(), 2);
        // No temp file left behind.
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn workspace_paths() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path().join("run")).unwrap();
        assert!(ws.root().join(IMAGES_DIR).is_dir());
        assert!(ws.page_image_path(4).ends_with("images/page_4.png"));
        assert!(ws
            .page_result_path(4, OutputFormat::Text)
            .ends_with("page_4.txt"));
        assert!(ws
            .aggregate_path(OutputFormat::Json)
            .ends_with("final_output.json"));
    }

    #[test]
    fn clear_checkpoint_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path().join("run")).unwrap();
        ws.clear_checkpoint().unwrap(); // nothing there yet

        Checkpoint::default().save(&ws.checkpoint_path()).unwrap();
        ws.clear_checkpoint().unwrap();
        assert!(!ws.checkpoint_path().exists());
    }
}
