//! File-level OCR: pick text source, run the engine, extract structured fields.

use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{file_extension, IMAGE_EXTENSIONS, ImagePreprocessor, OcrBackend, OcrResult, TesseractBackend};
use crate::error::OcrError;
use crate::invoice::template::{
    calculate_confidence, extract_generic, extract_with_template, StructuredData,
};
use crate::models::config::OcrConfig;
use crate::models::template::InvoiceTemplate;
use crate::pdf::{PdfExtractor, PdfProcessor, PdfType, MIN_TEXT_LENGTH};

/// How structured data was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMethod {
    Template,
    #[default]
    Generic,
}

/// Outcome of processing one file. Failures are reported in `error`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrOutcome {
    pub raw_text: String,
    pub structured_data: StructuredData,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_used: Option<String>,
    pub processing_method: ProcessingMethod,
    pub meets_threshold: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processing_time_ms: u64,
}

impl OcrOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs an OCR backend over images and PDFs.
pub struct OcrService {
    backend: Box<dyn OcrBackend>,
    preprocessor: Option<ImagePreprocessor>,
    min_pdf_text_length: usize,
}

impl OcrService {
    /// Service over any backend, without image preprocessing.
    pub fn new(backend: impl OcrBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            preprocessor: None,
            min_pdf_text_length: MIN_TEXT_LENGTH,
        }
    }

    /// Tesseract with preprocessing, as configured.
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            backend: Box::new(TesseractBackend::from_config(config)),
            preprocessor: Some(ImagePreprocessor::from_config(config)),
            min_pdf_text_length: config.min_pdf_text_length,
        }
    }

    pub fn with_preprocessor(mut self, preprocessor: ImagePreprocessor) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Get text from a file: embedded PDF text when there is enough of it,
    /// otherwise OCR of the image or the first PDF page.
    pub fn extract_text(&self, path: &Path) -> Result<OcrResult, OcrError> {
        let ext = file_extension(path)
            .ok_or_else(|| OcrError::UnsupportedFile(path.display().to_string()))?;

        if ext == "pdf" {
            if let Some(result) = self.embedded_pdf_text(path) {
                return Ok(result);
            }
            info!("Running OCR on first page of {}", path.display());
            return self.backend.ocr_pdf_page(path, 1);
        }

        if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return Err(OcrError::UnsupportedFile(path.display().to_string()));
        }

        match &self.preprocessor {
            Some(preprocessor) => {
                let prepared = preprocessor.prepare(path)?;
                self.backend.ocr_image(prepared.path())
            }
            None => self.backend.ocr_image(path),
        }
    }

    fn embedded_pdf_text(&self, path: &Path) -> Option<OcrResult> {
        let start = Instant::now();
        let mut extractor = PdfExtractor::new().with_min_text_length(self.min_pdf_text_length);

        if let Err(e) = extractor.load_file(path) {
            warn!("Could not read PDF {}: {}", path.display(), e);
            return None;
        }
        if extractor.analyze() != PdfType::Text {
            return None;
        }

        let text = extractor.extract_text().ok()?;
        debug!("Using embedded text ({} chars) from {}", text.len(), path.display());
        Some(OcrResult {
            text,
            confidence: Some(1.0),
            backend: "pdf".to_string(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// OCR a file and extract structured fields. Never fails outward.
    pub fn process_file(
        &self,
        path: &Path,
        template: Option<&InvoiceTemplate>,
        threshold: f32,
    ) -> OcrOutcome {
        let start = Instant::now();
        let mut outcome = match self.extract_text(path) {
            Ok(result) => self.process_text(&result.text, template, threshold),
            Err(e) => {
                warn!("OCR failed for {}: {}", path.display(), e);
                OcrOutcome::failed(e.to_string())
            }
        };
        outcome.processing_time_ms = start.elapsed().as_millis() as u64;
        outcome
    }

    /// Extract structured fields from already recognized text.
    pub fn process_text(
        &self,
        text: &str,
        template: Option<&InvoiceTemplate>,
        threshold: f32,
    ) -> OcrOutcome {
        if text.trim().is_empty() {
            return OcrOutcome::failed("no text could be extracted from the file");
        }

        let (structured_data, processing_method) = match template {
            Some(t) => (extract_with_template(text, t), ProcessingMethod::Template),
            None => (extract_generic(text), ProcessingMethod::Generic),
        };
        let confidence = calculate_confidence(&structured_data, template);

        info!(
            "Extracted {} fields ({:?}) with confidence {:.2}",
            structured_data.len(),
            processing_method,
            confidence
        );

        OcrOutcome {
            raw_text: text.to_string(),
            structured_data,
            confidence,
            template_used: template.map(|t| t.name.clone()),
            processing_method,
            meets_threshold: confidence >= threshold,
            error: None,
            processing_time_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::template::{FieldSpec, FieldType, TemplateType};
    use crate::ocr::StaticTextBackend;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    const RECEIPT: &str = "HD: 00012345\nCông ty TNHH Bình Minh\nNgày 02/03/2024\nTổng cộng 250.000 VNĐ";

    #[test]
    fn test_process_file_generic() {
        let service = OcrService::new(StaticTextBackend::new(RECEIPT));
        let outcome = service.process_file(&PathBuf::from("receipt.jpg"), None, 0.8);

        assert!(outcome.is_success());
        assert_eq!(outcome.processing_method, ProcessingMethod::Generic);
        assert_eq!(outcome.structured_data["invoice_number"], "00012345");
        assert_eq!(outcome.template_used, None);
        assert_eq!(outcome.raw_text, RECEIPT);
    }

    #[test]
    fn test_process_file_with_template() {
        let template = InvoiceTemplate::new("Bình Minh", TemplateType::Pdf)
            .with_field("invoice_number", FieldSpec::new(FieldType::String, true))
            .with_field("total_amount", FieldSpec::new(FieldType::Decimal, true));

        let service = OcrService::new(StaticTextBackend::new(RECEIPT));
        let outcome = service.process_file(&PathBuf::from("receipt.png"), Some(&template), 0.8);

        assert_eq!(outcome.processing_method, ProcessingMethod::Template);
        assert_eq!(outcome.template_used.as_deref(), Some("Bình Minh"));
        assert_eq!(outcome.confidence, 1.0);
        assert!(outcome.meets_threshold);
    }

    #[test]
    fn test_empty_text_reports_error() {
        let service = OcrService::new(StaticTextBackend::new("   \n"));
        let outcome = service.process_file(&PathBuf::from("blank.png"), None, 0.5);

        assert_eq!(outcome.confidence, 0.0);
        assert!(!outcome.meets_threshold);
        assert!(outcome.error.is_some());
    }

    #[test]
    fn test_unsupported_file_captured() {
        let service = OcrService::new(StaticTextBackend::new(RECEIPT));
        let outcome = service.process_file(&PathBuf::from("notes.docx"), None, 0.5);
        assert!(outcome.error.unwrap().contains("unsupported"));
    }
}
