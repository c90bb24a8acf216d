//! OCR pipeline: Tesseract backend, image preprocessing and the file-level service.

mod preprocessing;
mod service;
mod tesseract;

pub use preprocessing::{ImagePreprocessor, PreparedImage};
pub use service::{OcrOutcome, OcrService, ProcessingMethod};
pub use tesseract::TesseractBackend;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// Result type for OCR operations.
pub type Result<T> = std::result::Result<T, OcrError>;

/// Result of OCR processing on an image or PDF page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    /// Recognized text.
    pub text: String,

    /// Engine confidence (0.0 - 1.0) when the backend reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    /// Name of the backend that produced the text.
    pub backend: String,

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl OcrResult {
    /// Wrap already-known text.
    pub fn from_text(text: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
            backend: backend.into(),
            processing_time_ms: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// An OCR engine.
pub trait OcrBackend: Send + Sync {
    /// Short backend name used in logs and results.
    fn name(&self) -> &str;

    /// Whether the backend can run on this machine.
    fn is_available(&self) -> bool;

    /// Recognize text in an image file.
    fn ocr_image(&self, image_path: &Path) -> Result<OcrResult>;

    /// Recognize text on one page (1-indexed) of a PDF.
    fn ocr_pdf_page(&self, pdf_path: &Path, page: u32) -> Result<OcrResult>;
}

/// Backend that returns fixed text regardless of input.
#[derive(Debug, Clone, Default)]
pub struct StaticTextBackend {
    text: String,
}

impl StaticTextBackend {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrBackend for StaticTextBackend {
    fn name(&self) -> &str {
        "static"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn ocr_image(&self, _image_path: &Path) -> Result<OcrResult> {
        Ok(OcrResult::from_text(self.text.clone(), self.name()))
    }

    fn ocr_pdf_page(&self, _pdf_path: &Path, _page: u32) -> Result<OcrResult> {
        Ok(OcrResult::from_text(self.text.clone(), self.name()))
    }
}

/// Image extensions accepted for OCR.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp"];

/// Lowercased extension of a path, if any.
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Whether the path looks like an image or PDF we can OCR.
pub fn is_supported_file(path: &Path) -> bool {
    file_extension(path)
        .is_some_and(|ext| ext == "pdf" || IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_supported_files() {
        assert!(is_supported_file(&PathBuf::from("scan.PDF")));
        assert!(is_supported_file(&PathBuf::from("receipts/momo.jpg")));
        assert!(!is_supported_file(&PathBuf::from("notes.txt")));
        assert!(!is_supported_file(&PathBuf::from("README")));
    }

    #[test]
    fn test_static_backend() {
        let backend = StaticTextBackend::new("Tổng cộng: 10.000 đ");
        let result = backend.ocr_image(Path::new("any.png")).unwrap();
        assert_eq!(result.text, "Tổng cộng: 10.000 đ");
        assert_eq!(result.backend, "static");
        assert!(!result.is_empty());
    }
}
