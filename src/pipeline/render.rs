//! PDF loading and rasterisation.
//!
//! [`DocumentLoader`] and [`PageSource`] are the seam to the PDF renderer:
//! bytes in, page count and per-page rasters out. [`PdfiumLoader`] is the
//! production implementation.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with thread-local state and CPU-heavy rendering.
//! Every pdfium call runs inside `tokio::task::spawn_blocking` so Tokio
//! worker threads never stall. The document bytes are shared through an
//! `Arc` and reopened per page, which keeps each blocking task
//! self-contained; only one page raster is alive at a time.

use crate::error::NotesError;
use crate::output::DocumentInfo;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// A loaded multi-page document.
#[async_trait]
pub trait PageSource: Send + Sync {
    fn info(&self) -> &DocumentInfo;

    fn page_count(&self) -> usize {
        self.info().page_count
    }

    /// Rasterise page `page_num` (1-indexed) at `scale` × its natural size.
    async fn render_page(&self, page_num: usize, scale: f32) -> Result<DynamicImage, NotesError>;
}

/// Opens documents from raw bytes.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, bytes: Vec<u8>) -> Result<Arc<dyn PageSource>, NotesError>;
}

/// Reject buffers that do not start with `%PDF`.
pub fn check_pdf_magic(bytes: &[u8]) -> Result<(), NotesError> {
    if bytes.starts_with(b"%PDF") {
        Ok(())
    } else {
        Err(NotesError::NotAPdf {
            magic: bytes.iter().take(4).copied().collect(),
        })
    }
}

/// [`DocumentLoader`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumLoader {
    password: Option<String>,
    max_rendered_pixels: Option<u32>,
    library_dir: Option<PathBuf>,
}

impl PdfiumLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    /// Cap either rendered dimension at `px` pixels.
    pub fn with_max_rendered_pixels(mut self, px: u32) -> Self {
        self.max_rendered_pixels = Some(px);
        self
    }

    /// Load libpdfium from this directory instead of the working directory or
    /// the system library path.
    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dir = Some(dir.into());
        self
    }

    /// Library directory from `PDFIUM_LIB_PATH`, if set.
    pub fn library_dir_from_env() -> Option<PathBuf> {
        std::env::var_os("PDFIUM_LIB_PATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }
}

#[async_trait]
impl DocumentLoader for PdfiumLoader {
    async fn load(&self, bytes: Vec<u8>) -> Result<Arc<dyn PageSource>, NotesError> {
        check_pdf_magic(&bytes)?;

        let bytes = Arc::new(bytes);
        let shared = Arc::clone(&bytes);
        let password = self.password.clone();
        let library_dir = self.library_dir.clone();

        let info = tokio::task::spawn_blocking(move || {
            read_info_blocking(&shared, password.as_deref(), library_dir.as_ref())
        })
        .await
        .map_err(|e| NotesError::Internal(format!("Load task panicked: {e}")))??;

        info!("PDF loaded: {} pages", info.page_count);

        Ok(Arc::new(PdfiumDocument {
            bytes,
            info,
            password: self.password.clone(),
            max_rendered_pixels: self.max_rendered_pixels,
            library_dir: self.library_dir.clone(),
        }))
    }
}

/// A document held as bytes and reopened by pdfium for each page.
struct PdfiumDocument {
    bytes: Arc<Vec<u8>>,
    info: DocumentInfo,
    password: Option<String>,
    max_rendered_pixels: Option<u32>,
    library_dir: Option<PathBuf>,
}

#[async_trait]
impl PageSource for PdfiumDocument {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    async fn render_page(&self, page_num: usize, scale: f32) -> Result<DynamicImage, NotesError> {
        if page_num == 0 || page_num > self.info.page_count {
            return Err(NotesError::PageOutOfRange {
                page: page_num,
                total: self.info.page_count,
            });
        }

        let bytes = Arc::clone(&self.bytes);
        let password = self.password.clone();
        let library_dir = self.library_dir.clone();
        let max_pixels = self.max_rendered_pixels;

        tokio::task::spawn_blocking(move || {
            render_page_blocking(
                &bytes,
                password.as_deref(),
                library_dir.as_ref(),
                page_num,
                scale,
                max_pixels,
            )
        })
        .await
        .map_err(|e| NotesError::Internal(format!("Render task panicked: {e}")))?
    }
}

fn bind_pdfium(library_dir: Option<&PathBuf>) -> Result<Pdfium, NotesError> {
    let bindings = match library_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| NotesError::PdfiumBindingFailed(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

fn open_error(err: PdfiumError) -> NotesError {
    let detail = format!("{err:?}");
    if detail.contains("Password") || detail.contains("password") {
        NotesError::PasswordRequired
    } else {
        NotesError::CorruptPdf { detail }
    }
}

fn read_info_blocking(
    bytes: &[u8],
    password: Option<&str>,
    library_dir: Option<&PathBuf>,
) -> Result<DocumentInfo, NotesError> {
    let pdfium = bind_pdfium(library_dir)?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(open_error)?;

    let page_count = document.pages().len() as usize;
    if page_count == 0 {
        return Err(NotesError::CorruptPdf {
            detail: "document has no pages".into(),
        });
    }

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(DocumentInfo {
        page_count,
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        pdf_version: format!("{:?}", document.version()),
        byte_len: bytes.len(),
    })
}

fn render_page_blocking(
    bytes: &[u8],
    password: Option<&str>,
    library_dir: Option<&PathBuf>,
    page_num: usize,
    scale: f32,
    max_pixels: Option<u32>,
) -> Result<DynamicImage, NotesError> {
    let pdfium = bind_pdfium(library_dir)?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(open_error)?;

    let page = document
        .pages()
        .get((page_num - 1) as u16)
        .map_err(|e| NotesError::RasterisationFailed {
            page: page_num,
            detail: format!("{e:?}"),
        })?;

    let mut render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
    if let Some(px) = max_pixels {
        render_config = render_config
            .set_maximum_width(px as i32)
            .set_maximum_height(px as i32);
    }

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| NotesError::RasterisationFailed {
            page: page_num,
            detail: format!("{e:?}"),
        })?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_num,
        image.width(),
        image.height()
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_check() {
        assert!(check_pdf_magic(b"%PDF-1.7\n...").is_ok());
        let err = check_pdf_magic(b"PK\x03\x04zip").unwrap_err();
        assert!(matches!(err, NotesError::NotAPdf { ref magic } if magic == b"PK\x03\x04"));
        assert!(matches!(
            check_pdf_magic(b""),
            Err(NotesError::NotAPdf { .. })
        ));
    }

    #[tokio::test]
    async fn loader_rejects_non_pdf_before_binding() {
        let err = PdfiumLoader::new()
            .load(b"hello world".to_vec())
            .await
            .err()
            .expect("non-PDF must be rejected");
        assert!(matches!(err, NotesError::NotAPdf { .. }));
    }
}
