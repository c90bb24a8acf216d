//! Error types for the hoadon-core library.

use thiserror::Error;

/// Main error type for the hoadon library.
#[derive(Error, Debug)]
pub enum HoadonError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Invoice extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Invoice or template storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// OCR job queue error.
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The OCR binary (or a helper like pdftoppm) is not installed.
    #[error("OCR backend not available: {0}")]
    BackendNotAvailable(String),

    /// The OCR engine ran but failed.
    #[error("OCR failed: {0}")]
    Failed(String),

    /// Image preprocessing failed.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// Unsupported input file.
    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),

    /// I/O error while running OCR.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to invoice field extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// No invoice data could be extracted.
    #[error("no invoice data found")]
    NoData,
}

/// Errors from the invoice and template stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record with the given id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Record failed validation.
    #[error("invalid record: {0}")]
    Invalid(String),

    /// Backing file could not be read or written.
    #[error("persistence failed: {0}")]
    Persistence(String),
}

/// Errors from the OCR job queue.
#[derive(Error, Debug)]
pub enum JobError {
    /// Unknown job id.
    #[error("job not found: {0}")]
    NotFound(String),

    /// The job is still queued or running.
    #[error("job still in progress: {0}")]
    InProgress(String),

    /// The queue has been shut down.
    #[error("job queue closed")]
    QueueClosed,

    /// The job failed while processing.
    #[error("job failed: {0}")]
    Failed(String),
}

/// Result type for the hoadon library.
pub type Result<T> = std::result::Result<T, HoadonError>;
