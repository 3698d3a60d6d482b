//! Rich-text editor seam and HTML export.
//!
//! The editor itself is an external component; the crate only needs to push
//! generated HTML into it and read the (possibly edited) HTML back out.

use crate::error::NotesError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name used when exporting without an explicit path.
pub const DEFAULT_EXPORT_NAME: &str = "processed-notes.html";

/// HTML-in, HTML-out editor.
pub trait NoteEditor: Send + Sync {
    /// Replace the editor content.
    fn set_content(&mut self, html: &str);

    /// Current content, including any user edits.
    fn content(&self) -> String;
}

/// Editor that keeps its content in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryEditor {
    html: String,
}

impl InMemoryEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a user edit: append `html` to the current content.
    pub fn append(&mut self, html: &str) {
        self.html.push_str(html);
    }
}

impl NoteEditor for InMemoryEditor {
    fn set_content(&mut self, html: &str) {
        self.html = html.to_string();
    }

    fn content(&self) -> String {
        self.html.clone()
    }
}

/// Resolve an export target: a directory gets [`DEFAULT_EXPORT_NAME`]
/// appended, anything else is used as-is.
pub fn export_path(target: &Path) -> PathBuf {
    if target.is_dir() {
        target.join(DEFAULT_EXPORT_NAME)
    } else {
        target.to_path_buf()
    }
}

/// Write `html` to `path` atomically: a temp file in the same directory is
/// written, flushed, then renamed over the target.
pub fn export_html(html: &str, path: &Path) -> Result<PathBuf, NotesError> {
    let path = export_path(path);
    let write_err = |source: std::io::Error| NotesError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(html.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(&path).map_err(|e| write_err(e.error))?;

    info!("Exported {} bytes of notes to {}", html.len(), path.display());
    Ok(path)
}
