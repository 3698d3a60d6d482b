//! Result types returned by a notes run.

use crate::error::PageError;
use serde::{Deserialize, Serialize};

/// Basic facts about a loaded document. Needs no API call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub pdf_version: String,
    pub byte_len: usize,
}

/// Outcome for one processed page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageNotes {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Text returned by OCR (possibly empty).
    pub recognized_text: String,
    /// Formatted notes, `None` when the page had no text or failed.
    pub notes_html: Option<String>,
    pub duration_ms: u64,
    /// Set only when the run skips failed pages.
    pub error: Option<PageError>,
}

impl PageNotes {
    /// True when OCR found no text, so the page contributes nothing.
    pub fn is_empty_page(&self) -> bool {
        self.error.is_none() && self.notes_html.is_none()
    }

    /// The page's block in the combined notes: `<h2>Page N</h2>…` plus a
    /// blank-line separator, or `None` for empty and failed pages.
    pub fn html_block(&self) -> Option<String> {
        self.notes_html
            .as_ref()
            .map(|notes| format!("<h2>Page {}</h2>{}\n\n", self.page_num, notes))
    }
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages selected for processing.
    pub selected_pages: usize,
    /// Pages that produced notes.
    pub noted_pages: usize,
    /// Pages where OCR found no text.
    pub empty_pages: usize,
    /// Pages recorded as failed (skip-failed-pages policy only).
    pub failed_pages: usize,
    pub total_duration_ms: u64,
}

/// Combined notes plus per-page detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesOutput {
    /// Combined notes HTML, pages in ascending order.
    pub html: String,
    pub pages: Vec<PageNotes>,
    pub stats: NotesStats,
}
