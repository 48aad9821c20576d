//! PDF text and logo extraction using pdfium.
//!
//! pdfium is a C library; all calls run inside `spawn_blocking` and the
//! library is bound per call so the extractor itself stays `Send + Sync`.

use std::io::Cursor;

use image::ImageFormat;
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::error::ExtractionError;

/// Text, tables, and logo pulled out of a PDF.
#[derive(Debug, Clone, Default)]
pub struct DocumentContent {
    /// Concatenated text of all pages.
    pub text: String,
    /// Extracted tables, row-major. pdfium cannot produce these; stores
    /// that can (or test doubles) fill them in.
    pub tables: Vec<Vec<Vec<String>>>,
    /// Number of pages.
    pub page_count: usize,
    /// PNG render of the top of the first page, where the supplier logo
    /// usually sits.
    pub logo_png: Option<Vec<u8>>,
}

impl DocumentContent {
    /// Text plus a rendered block of any extracted tables, the form the
    /// AI extractor receives.
    #[must_use]
    pub fn combined_text(&self) -> String {
        if self.tables.is_empty() {
            return self.text.clone();
        }
        let mut out = self.text.clone();
        out.push_str("\n\nTables:\n");
        for (i, table) in self.tables.iter().enumerate() {
            out.push_str(&format!("\nTable {}:\n", i + 1));
            for row in table {
                out.push_str(&row.join(" | "));
                out.push('\n');
            }
        }
        out
    }
}

/// PDF content extractor collaborator.
pub trait DocumentExtractor: Send + Sync {
    /// Extract text, tables, and a best-effort logo image from PDF bytes.
    fn extract(
        &self,
        pdf: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<DocumentContent, ExtractionError>> + Send;
}

/// Production extractor backed by the system pdfium library.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfiumExtractor;

impl PdfiumExtractor {
    /// Create an extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DocumentExtractor for PdfiumExtractor {
    async fn extract(&self, pdf: Vec<u8>) -> Result<DocumentContent, ExtractionError> {
        tokio::task::spawn_blocking(move || extract_blocking(&pdf))
            .await
            .map_err(|e| ExtractionError::Document(format!("extraction task failed: {e}")))?
    }
}

fn extract_blocking(bytes: &[u8]) -> Result<DocumentContent, ExtractionError> {
    let pdfium = Pdfium::new(
        Pdfium::bind_to_system_library()
            .map_err(|e| ExtractionError::Document(format!("pdfium unavailable: {e}")))?,
    );

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| ExtractionError::Document(format!("could not open pdf: {e}")))?;

    let mut text = String::new();
    for page in document.pages().iter() {
        match page.text() {
            Ok(page_text) => {
                text.push_str(&page_text.all());
                text.push('\n');
            }
            Err(e) => warn!(error = %e, "Could not extract text from page"),
        }
    }

    let logo_png = render_logo(&document);
    let page_count = usize::from(document.pages().len());

    debug!(page_count, has_logo = logo_png.is_some(), "Extracted pdf content");

    Ok(DocumentContent {
        text,
        tables: Vec::new(),
        page_count,
        logo_png,
    })
}

/// Render the top strip of the first page as PNG.
///
/// The strip is the top 200 points or 30% of the page, whichever is
/// smaller, mirroring where Danish suppliers print their letterhead.
fn render_logo(document: &PdfDocument<'_>) -> Option<Vec<u8>> {
    let page = document.pages().first().ok()?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let page_height_pts = page.height().value.max(1.0) as u32;
    let strip_pts = 200.min(page_height_pts.saturating_mul(3) / 10).max(1);

    let config = PdfRenderConfig::new().set_target_width(1000);
    let bitmap = match page.render_with_config(&config) {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "Could not render first page for logo");
            return None;
        }
    };

    let full = bitmap.as_image();
    let strip_px = (full.height().saturating_mul(strip_pts) / page_height_pts).max(1);
    let cropped = full.crop_imm(0, 0, full.width(), strip_px.min(full.height()));

    let mut png = Vec::new();
    if let Err(e) = cropped.write_to(&mut Cursor::new(&mut png), ImageFormat::Png) {
        warn!(error = %e, "Could not encode logo image");
        return None;
    }
    Some(png)
}
