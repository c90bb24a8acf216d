//! PDF text layer: decide whether a PDF needs OCR and pull its embedded text.

mod extractor;

pub use extractor::PdfExtractor;

use crate::error::PdfError;

/// Embedded text shorter than this means the PDF is treated as scanned.
pub const MIN_TEXT_LENGTH: usize = 50;

/// What a PDF carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfType {
    /// Enough embedded text to skip OCR.
    Text,
    /// Page images only; needs OCR.
    Scanned,
    Empty,
}

pub type Result<T> = std::result::Result<T, PdfError>;

/// A loaded PDF document.
pub trait PdfProcessor {
    fn load(&mut self, data: &[u8]) -> Result<()>;

    fn page_count(&self) -> u32;

    /// Classify by the amount of embedded text.
    fn analyze(&self) -> PdfType;

    /// Embedded text of all pages, in page order.
    fn extract_text(&self) -> Result<String>;
}
