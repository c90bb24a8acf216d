//! Invoice field extraction module.

mod classify;
mod parser;
pub mod rules;
pub mod template;

pub use classify::classify;
pub use parser::{
    pattern_confidence, validate_and_cleanup, ExtractionResult, InvoiceParser, VietInvoiceParser,
};
pub use template::{
    calculate_confidence, extract_generic, extract_with_template, StructuredData, TemplateStore,
};

use crate::error::ExtractionError;
use crate::ocr::OcrResult;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Trait for invoice field extractors.
pub trait InvoiceExtractor {
    /// Extract invoice data from OCR result.
    fn extract(&self, ocr_result: &OcrResult) -> Result<ExtractionResult>;

    /// Extract invoice data from plain text.
    fn extract_from_text(&self, text: &str) -> Result<ExtractionResult>;
}
