//! Interactive session: the upload → split → OCR → notes → editor workflow.
//!
//! A [`Session`] owns the loaded document, the page range the user picked,
//! the OCR text and the editor. Each operation first checks that the current
//! [`View`] may move to the operation's target view, so a step can never run
//! out of order.

use crate::editor::{export_html, NoteEditor};
use crate::error::NotesError;
use crate::output::{DocumentInfo, NotesOutput};
use crate::pipeline::encode::{encode_page, to_data_uri};
use crate::pipeline::render::PageSource;
use crate::process::NotesPipeline;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Session views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum View {
    /// Waiting for a document
    Upload,
    /// Document loaded, choosing a page range
    Split,
    /// Range chosen, ready for OCR
    Ocr,
    /// OCR text available, ready for note generation
    Notes,
    /// Notes in the editor
    Editor,
}

impl View {
    /// Check if the workflow may move from this view to `target`.
    pub fn can_transition_to(&self, target: View) -> bool {
        use View::*;

        match (self, target) {
            // Reset and loading a new file are always allowed
            (_, Upload) => true,
            (_, Split) => true,

            // Re-splitting replaces the previous range
            (Split, Ocr) => true,
            (Ocr, Ocr) => true,

            (Ocr, Notes) => true,

            (Notes, Editor) => true,
            // Page-by-page processing goes straight to the editor
            (Split, Editor) => true,
            (Ocr, Editor) => true,
            (Editor, Editor) => true,

            _ => false,
        }
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upload => write!(f, "upload"),
            Self::Split => write!(f, "split"),
            Self::Ocr => write!(f, "ocr"),
            Self::Notes => write!(f, "notes"),
            Self::Editor => write!(f, "editor"),
        }
    }
}

/// One user's pass through the workflow.
pub struct Session {
    pipeline: NotesPipeline,
    editor: Box<dyn NoteEditor>,
    view: View,
    document: Option<Arc<dyn PageSource>>,
    selection: Vec<usize>,
    ocr_text: Option<String>,
}

impl Session {
    pub fn new(pipeline: NotesPipeline, editor: Box<dyn NoteEditor>) -> Self {
        Self {
            pipeline,
            editor,
            view: View::Upload,
            document: None,
            selection: Vec::new(),
            ocr_text: None,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn pipeline(&self) -> &NotesPipeline {
        &self.pipeline
    }

    pub fn editor(&self) -> &dyn NoteEditor {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> &mut dyn NoteEditor {
        self.editor.as_mut()
    }

    pub fn document_info(&self) -> Option<&DocumentInfo> {
        self.document.as_ref().map(|d| d.info())
    }

    /// Pages currently selected (1-indexed, ascending).
    pub fn selected_pages(&self) -> &[usize] {
        &self.selection
    }

    /// Text from the last OCR pass, if any.
    pub fn ocr_text(&self) -> Option<&str> {
        self.ocr_text.as_deref()
    }

    /// Load a PDF, replacing any previous document, and select all pages.
    pub async fn load_document(&mut self, bytes: Vec<u8>) -> Result<&DocumentInfo, NotesError> {
        self.ensure(View::Split)?;
        let doc = self.pipeline.load(bytes).await?;
        let total = doc.page_count();
        info!("Session loaded document with {} pages", total);

        self.selection = (1..=total).collect();
        self.ocr_text = None;
        self.pipeline.cancel_handle().reset();
        self.view = View::Split;
        Ok(self.document.insert(doc).info())
    }

    /// Preview images of the selected pages as PNG data URIs, rendered at the
    /// configured preview scale.
    pub async fn page_previews(&self) -> Result<Vec<String>, NotesError> {
        let doc = self.document()?;
        let scale = self.pipeline.config().preview_scale;
        let mut previews = Vec::with_capacity(self.selection.len());
        for &page_num in &self.selection {
            let image = doc.render_page(page_num, scale).await?;
            let encoded = encode_page(&image).map_err(|e| NotesError::EncodeFailed {
                page: page_num,
                detail: e.to_string(),
            })?;
            previews.push(to_data_uri(&encoded));
        }
        debug!("Rendered {} previews", previews.len());
        Ok(previews)
    }

    /// Restrict the workflow to pages `start..=end`.
    ///
    /// # Errors
    /// [`NotesError::InvalidInput`] when `start < 1`, `end > page_count` or
    /// `start > end`.
    pub fn split(&mut self, start: usize, end: usize) -> Result<&[usize], NotesError> {
        self.ensure(View::Ocr)?;
        let total = self.document()?.page_count();
        if start < 1 || end > total || start > end {
            return Err(NotesError::invalid_input("Invalid page range."));
        }

        self.selection = (start..=end).collect();
        self.ocr_text = None;
        self.view = View::Ocr;
        info!("Selected pages {}-{} of {}", start, end, total);
        Ok(&self.selection)
    }

    /// OCR the selected pages at the preview scale.
    pub async fn run_ocr(&mut self) -> Result<&str, NotesError> {
        if self.view != View::Ocr {
            return Err(self.rejected(View::Notes));
        }
        let doc = Arc::clone(self.document()?);
        let scale = self.pipeline.config().preview_scale;
        let text = self
            .pipeline
            .recognize_pages(doc.as_ref(), &self.selection, scale)
            .await?;

        info!("OCR produced {} chars", text.len());
        self.view = View::Notes;
        Ok(self.ocr_text.insert(text).as_str())
    }

    /// Generate notes from the OCR text and put them in the editor.
    pub async fn generate_notes(&mut self) -> Result<String, NotesError> {
        let text = match self.ocr_text.as_deref() {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => return Err(NotesError::invalid_input("Please perform OCR first.")),
        };
        self.ensure(View::Editor)?;

        let notes = self.pipeline.generator().generate_notes(&text).await?;
        self.editor.set_content(&notes);
        self.view = View::Editor;
        Ok(notes)
    }

    /// Run the page-by-page pipeline over the selected pages and put the
    /// combined notes in the editor.
    pub async fn process_page_by_page(&mut self) -> Result<NotesOutput, NotesError> {
        self.ensure(View::Editor)?;
        let doc = Arc::clone(self.document()?);
        let output = self
            .pipeline
            .process_pages(doc, self.selection.clone())
            .await?;

        self.editor.set_content(&output.html);
        self.view = View::Editor;
        Ok(output)
    }

    /// Write the editor content to `path` (a directory gets
    /// `processed-notes.html`). Returns the written path.
    pub fn export_notes(&self, path: impl AsRef<Path>) -> Result<PathBuf, NotesError> {
        export_html(&self.editor.content(), path.as_ref())
    }

    /// Drop the document and all derived state; back to [`View::Upload`].
    pub fn reset(&mut self) {
        self.document = None;
        self.selection.clear();
        self.ocr_text = None;
        self.editor.set_content("");
        self.pipeline.cancel_handle().reset();
        self.view = View::Upload;
    }

    fn document(&self) -> Result<&Arc<dyn PageSource>, NotesError> {
        self.document.as_ref().ok_or(NotesError::NoDocument)
    }

    fn ensure(&self, target: View) -> Result<(), NotesError> {
        if self.view.can_transition_to(target) {
            Ok(())
        } else {
            Err(self.rejected(target))
        }
    }

    fn rejected(&self, target: View) -> NotesError {
        NotesError::InvalidTransition {
            from: self.view.to_string(),
            to: target.to_string(),
        }
    }
}
