//! Rule-based field extractors for Vietnamese invoices.

pub mod amounts;
pub mod dates;
pub mod items;
pub mod patterns;
pub mod tax_code;

pub use amounts::{extract_multiple_amounts, format_vnd, parse_vnd_amount, AmountExtractor};
pub use dates::{extract_dates, parse_date, DateExtractor, InvoiceDates};
pub use items::{extract_line_items, ItemExtractor};
pub use tax_code::{extract_tax_code, format_tax_code, validate_tax_code, TaxCodeExtractor};
pub use patterns::*;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// Extraction context with confidence scores.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}

/// First capture group of the first pattern that matches, trimmed.
pub fn first_capture(patterns: &[regex::Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}
