//! Data models for invoices, templates and configuration.

pub mod config;
pub mod invoice;
pub mod template;

pub use config::HoadonConfig;
pub use invoice::{
    AmountBreakdown, ExtractedInvoice, GrandTotalMethod, Invoice, InvoiceKind, InvoiceStatus,
    LineItem,
};
pub use template::{FieldSpec, FieldType, InvoiceTemplate, TemplateType};
