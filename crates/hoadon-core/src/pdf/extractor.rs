//! PDF text extraction using lopdf and pdf-extract.

use std::path::Path;
use std::sync::OnceLock;

use lopdf::{Document, Object};
use tracing::debug;

use super::{PdfProcessor, PdfType, Result, MIN_TEXT_LENGTH};
use crate::error::PdfError;

/// PDF content extractor.
///
/// Text is extracted at most once per loaded document; `analyze` and
/// `extract_text` share the result.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
    min_text_length: usize,
    text: OnceLock<std::result::Result<String, String>>,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
            min_text_length: MIN_TEXT_LENGTH,
            text: OnceLock::new(),
        }
    }

    /// Text shorter than this makes the document count as scanned.
    pub fn with_min_text_length(mut self, len: usize) -> Self {
        self.min_text_length = len;
        self
    }

    /// Read and load a PDF file.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let data = std::fs::read(path).map_err(|e| PdfError::Parse(format!("{}: {}", path.display(), e)))?;
        self.load(&data)
    }

    /// Whether any object in the document is an image XObject.
    fn has_images(&self) -> bool {
        let Some(doc) = self.document.as_ref() else {
            return false;
        };

        doc.objects.values().any(|object| match object {
            Object::Stream(stream) => stream
                .dict
                .get(b"Subtype")
                .and_then(|s| s.as_name())
                .is_ok_and(|name| name == b"Image"),
            _ => false,
        })
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract needs the decrypted bytes
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        self.text = OnceLock::new();

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn analyze(&self) -> PdfType {
        let text = self.extract_text().unwrap_or_default();
        let has_text = text.trim().chars().count() > self.min_text_length;

        let pdf_type = if has_text {
            PdfType::Text
        } else if self.has_images() {
            PdfType::Scanned
        } else {
            PdfType::Empty
        };

        debug!("PDF analysis: has_text={} -> {:?}", has_text, pdf_type);
        pdf_type
    }

    fn extract_text(&self) -> Result<String> {
        if self.raw_data.is_empty() {
            return Err(PdfError::Parse("no document loaded".to_string()));
        }
        self.text
            .get_or_init(|| {
                debug!("Extracting embedded text ({} bytes)", self.raw_data.len());
                pdf_extract::extract_text_from_mem(&self.raw_data).map_err(|e| e.to_string())
            })
            .clone()
            .map_err(PdfError::TextExtraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn single_page_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut data = Vec::new();
        doc.save_to(&mut data).unwrap();
        data
    }

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::new();
        assert!(extractor.document.is_none());
        assert_eq!(extractor.page_count(), 0);
        assert!(extractor.extract_text().is_err());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut extractor = PdfExtractor::new();
        let err = extractor.load(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));
    }

    #[test]
    fn test_load_counts_pages() {
        let mut extractor = PdfExtractor::new();
        extractor.load(&single_page_pdf()).unwrap();
        assert_eq!(extractor.page_count(), 1);
        assert!(!extractor.has_images());
    }

    #[test]
    fn test_analyze_reuses_extracted_text() {
        let mut extractor = PdfExtractor::new();
        extractor.load(&single_page_pdf()).unwrap();
        assert!(extractor.text.get().is_none());

        assert_eq!(extractor.analyze(), PdfType::Empty);
        let cached = extractor.text.get().cloned();
        assert!(cached.is_some());
        assert_eq!(extractor.extract_text().ok(), cached.and_then(|r| r.ok()));

        extractor.load(&single_page_pdf()).unwrap();
        assert!(extractor.text.get().is_none());
    }
}
