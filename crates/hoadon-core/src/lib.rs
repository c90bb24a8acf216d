//! Core library for Vietnamese invoice processing.
//!
//! This crate provides:
//! - OCR pipeline using Tesseract, with embedded-text shortcut for PDFs
//! - Vietnamese invoice field extraction (codes, dates, amounts, tax codes, line items)
//! - Template-guided extraction and the OCR confidence heuristic
//! - Invoice store with filtering, pagination and analytics
//! - Chat assistant: intent detection, canned replies, hybrid NLU routing
//! - Background OCR job queue

pub mod analytics;
pub mod chat;
pub mod error;
pub mod invoice;
pub mod jobs;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod store;
pub mod text;

pub use error::{HoadonError, Result};
pub use models::invoice::{ExtractedInvoice, Invoice, InvoiceKind, InvoiceStatus, LineItem};
pub use models::template::InvoiceTemplate;
pub use models::HoadonConfig;
pub use pdf::{PdfExtractor, PdfProcessor, PdfType};
pub use ocr::{OcrBackend, OcrOutcome, OcrResult, OcrService, TesseractBackend};
pub use invoice::{ExtractionResult, InvoiceExtractor, InvoiceParser, TemplateStore, VietInvoiceParser};
pub use store::{InvoiceFilter, InvoiceStore, Page, PageResult, TimeFilter};
pub use chat::{ChatHandler, ChatResponse, HybridRouter, Intent, IntentDetector};
pub use jobs::{JobProcessor, JobStatus, OcrJob, OcrJobQueue, OcrPipeline};
pub use text::TextProcessor;
