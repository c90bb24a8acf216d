//! Rule-based parser for Vietnamese invoices, MoMo receipts and electricity bills.

use std::time::Instant;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::ExtractionError;
use crate::models::config::ExtractionConfig;
use crate::models::invoice::*;
use crate::ocr::OcrResult;

use super::classify::classify;
use super::rules::{
    amounts::{extract_multiple_amounts, parse_vnd_amount},
    dates::{extract_dates, parse_date},
    first_capture,
    items::{extract_line_items, DEFAULT_MAX_ITEMS},
    patterns::*,
    tax_code::TaxCodeExtractor,
    FieldExtractor,
};
use super::{InvoiceExtractor, Result};

/// Accepted MoMo payment range (VND).
const MOMO_MIN_AMOUNT: i64 = 100;
const MOMO_MAX_AMOUNT: i64 = 100_000_000;

/// Accepted electricity bill range (VND); negative amounts are payments.
const ELECTRICITY_MIN_AMOUNT: i64 = -5_000_000;
const ELECTRICITY_MAX_AMOUNT: i64 = 10_000_000;

/// Electricity totals above this are assumed to have lost a decimal separator.
const ELECTRICITY_SUSPICIOUS_AMOUNT: i64 = 5_000_000;

const MAX_NAME_CHARS: usize = 100;

/// Result of invoice extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Extracted invoice data.
    pub invoice: ExtractedInvoice,
    /// Pattern-based confidence (0.5 - 1.0).
    pub confidence: f32,
    /// Raw extracted text.
    pub raw_text: String,
    /// Extraction warnings.
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Trait for invoice parsing.
pub trait InvoiceParser {
    /// Parse invoice from text.
    fn parse(&self, text: &str) -> Result<ExtractionResult>;
}

/// Parser for Vietnamese invoices.
pub struct VietInvoiceParser {
    /// Maximum number of line items taken from a document.
    max_items: usize,
    /// Currency assigned to extracted invoices.
    currency: String,
}

impl VietInvoiceParser {
    /// Create a new parser with default settings.
    pub fn new() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            currency: "VND".to_string(),
        }
    }

    /// Create a parser from extraction configuration.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new()
            .with_max_items(config.max_line_items)
            .with_currency(&config.default_currency)
    }

    /// Set the line item cap.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Set the currency.
    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_string();
        self
    }

    /// Extract invoice fields from OCR text. The file name takes part in
    /// document kind detection.
    pub fn extract_fields(&self, text: &str, filename: &str) -> ExtractionResult {
        let start = Instant::now();

        info!(
            "Extracting invoice fields from {} characters of text ({})",
            text.len(),
            if filename.is_empty() { "<text>" } else { filename }
        );

        let mut invoice = ExtractedInvoice {
            currency: self.currency.clone(),
            kind: classify(text, filename),
            amounts: extract_multiple_amounts(text),
            ..Default::default()
        };

        match invoice.kind {
            InvoiceKind::MomoPayment => self.extract_momo(text, &mut invoice),
            InvoiceKind::Electricity => self.extract_electricity(text, &mut invoice),
            _ => self.extract_general(text, &mut invoice),
        }

        validate_and_cleanup(text, &mut invoice);

        let mut warnings = Vec::new();
        if !invoice.has_code() {
            warnings.push("Could not extract invoice code".to_string());
        }
        if invoice.date.is_none() {
            warnings.push("Could not extract invoice date".to_string());
        }
        if invoice.total_amount.is_zero() {
            warnings.push("Could not extract total amount".to_string());
        }

        let confidence = pattern_confidence(&invoice);

        debug!(
            "Extracted {} invoice {} with confidence {:.2}",
            invoice.kind.as_str(),
            invoice.invoice_code,
            confidence
        );

        ExtractionResult {
            invoice,
            confidence,
            raw_text: text.to_string(),
            warnings,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn extract_momo(&self, text: &str, invoice: &mut ExtractedInvoice) {
        invoice.payment_method = Some("MoMo".to_string());

        if let Some(id) = find_transaction_id(text) {
            invoice.invoice_code = format!("MOMO-{}", id);
            invoice.transaction_id = Some(id);
        }

        if let Some(account) = first_capture(&MOMO_ACCOUNT_PATTERNS, text) {
            invoice.buyer_name = account.clone();
            invoice.payment_account = Some(account);
        }

        let min = Decimal::from(MOMO_MIN_AMOUNT);
        let max = Decimal::from(MOMO_MAX_AMOUNT);
        if let Some(amount) = first_amount_in_range(&MOMO_AMOUNT_PATTERNS, text, min, max) {
            invoice.total_amount = amount;
            invoice.subtotal = amount;
        }

        if let Some(datetime) = first_capture(&MOMO_DATETIME_PATTERNS, text) {
            invoice.date = datetime.split_whitespace().next().and_then(parse_date);
            invoice.date_text = Some(datetime);
        }

        if let Some(recipient) = first_capture(&MOMO_RECIPIENT_PATTERNS, text) {
            invoice.seller_name = recipient;
        }

        if let Some(content) = first_capture(&CONTENT_PATTERNS, text) {
            invoice.items.push(LineItem::single(content, invoice.total_amount));
        }
    }

    fn extract_electricity(&self, text: &str, invoice: &mut ExtractedInvoice) {
        invoice.seller_name = "Công ty Điện lực".to_string();

        if let Some(code) = first_capture(&CUSTOMER_CODE_PATTERNS, text) {
            invoice.invoice_code = code;
        }

        if let Some(name) = first_capture(&CUSTOMER_NAME_PATTERNS, text) {
            invoice.buyer_name = truncate_chars(&name, MAX_NAME_CHARS);
        }

        if let Some(caps) = ADDRESS_PATTERN.captures(text) {
            invoice.buyer_address = Some(caps[1].trim().to_string());
        }

        let min = Decimal::from(ELECTRICITY_MIN_AMOUNT);
        let max = Decimal::from(ELECTRICITY_MAX_AMOUNT);
        if let Some(amount) = first_amount_in_range(&ELECTRICITY_AMOUNT_PATTERNS, text, min, max) {
            invoice.total_amount = amount;
            invoice.subtotal = amount;
        }

        if let Some(caps) = PERIOD_PATTERN.captures(text) {
            let period = caps[1].trim();
            invoice.items.push(LineItem::single(
                format!("Tiền điện {}", period),
                invoice.total_amount,
            ));
        }

        let full_date = DATE_DMY.captures_iter(text).find_map(|caps| {
            if caps[3].len() != 4 {
                return None;
            }
            let day: u32 = caps[1].parse().ok()?;
            let month: u32 = caps[2].parse().ok()?;
            let year: i32 = caps[3].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day).filter(|_| (1900..=2100).contains(&year))
        });

        if let Some(date) = full_date {
            invoice.date = Some(date);
            invoice.date_text = Some(date.format("%d/%m/%Y").to_string());
        } else if let Some(caps) = YEAR_ONLY.captures(text) {
            let year: i32 = caps[1].parse().unwrap_or(0);
            invoice.date = NaiveDate::from_ymd_opt(year, 1, 1);
            invoice.date_text = Some(format!("01/01/{}", year));
        }
    }

    fn extract_general(&self, text: &str, invoice: &mut ExtractedInvoice) {
        if let Some(code) = find_invoice_code(text) {
            invoice.invoice_code = code;
        }

        if let Some(issue) = extract_dates(text).issue_date {
            invoice.date = Some(issue.value);
            invoice.date_text = Some(issue.value.format("%d/%m/%Y").to_string());
        }

        if let Some(buyer) = first_capture(&BUYER_PATTERNS, text) {
            invoice.buyer_name = truncate_chars(&buyer, MAX_NAME_CHARS);
        }
        if let Some(seller) = first_capture(&SELLER_PATTERNS, text) {
            invoice.seller_name = truncate_chars(&seller, MAX_NAME_CHARS);
        }

        self.extract_tax_ids(text, invoice);

        let mut addresses = ADDRESS_PATTERN
            .captures_iter(text)
            .map(|caps| caps[1].trim().to_string());
        invoice.seller_address = addresses.next();
        invoice.buyer_address = addresses.next();

        if let Some(caps) = PAYMENT_METHOD.captures(text) {
            invoice.payment_method = Some(caps[1].trim().to_string());
        }

        let amounts = &invoice.amounts;
        invoice.total_amount = amounts.grand_total.unwrap_or_default();
        invoice.tax_amount = amounts.tax.unwrap_or_default();
        invoice.subtotal = amounts
            .subtotal
            .unwrap_or_else(|| amounts.subtotals.iter().copied().sum());
        invoice.tax_percentage = TAX_RATE
            .captures(text)
            .and_then(|caps| parse_vnd_amount(&caps[1].replace(',', ".")));

        invoice.items = extract_line_items(text, self.max_items);
    }

    fn extract_tax_ids(&self, text: &str, invoice: &mut ExtractedInvoice) {
        invoice.seller_tax_id = SELLER_TAX_CODE.captures(text).map(|c| c[1].to_string());
        invoice.buyer_tax_id = BUYER_TAX_CODE.captures(text).map(|c| c[1].to_string());

        // Without section labels the first MST is the seller's, the second the buyer's.
        let labeled = TaxCodeExtractor::new().labeled_only(true).extract_all(text);
        if invoice.seller_tax_id.is_none() {
            invoice.seller_tax_id = labeled
                .iter()
                .map(|m| m.value.clone())
                .find(|code| Some(code) != invoice.buyer_tax_id.as_ref());
        }
        if invoice.buyer_tax_id.is_none() {
            invoice.buyer_tax_id = labeled
                .iter()
                .map(|m| m.value.clone())
                .find(|code| Some(code) != invoice.seller_tax_id.as_ref());
        }
    }
}

impl Default for VietInvoiceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceParser for VietInvoiceParser {
    fn parse(&self, text: &str) -> Result<ExtractionResult> {
        if text.trim().is_empty() {
            return Err(ExtractionError::NoData);
        }
        Ok(self.extract_fields(text, ""))
    }
}

impl InvoiceExtractor for VietInvoiceParser {
    fn extract(&self, ocr_result: &OcrResult) -> Result<ExtractionResult> {
        let mut result = self.parse(&ocr_result.text)?;
        result.processing_time_ms += ocr_result.processing_time_ms;
        Ok(result)
    }

    fn extract_from_text(&self, text: &str) -> Result<ExtractionResult> {
        self.parse(text)
    }
}

/// Post-extraction fixes: backup transaction ids, implausible electricity
/// totals, and per-kind defaults for names and codes.
pub fn validate_and_cleanup(text: &str, invoice: &mut ExtractedInvoice) {
    if invoice.kind == InvoiceKind::MomoPayment
        && invoice.transaction_id.as_ref().is_none_or(|id| id.len() < 6)
    {
        let backup = MOMO_BACKUP_ID_PATTERNS.iter().find_map(|re| {
            re.captures_iter(text)
                .map(|caps| caps[1].to_string())
                .find(|candidate| !candidate.contains(['.', ',']))
        });
        if let Some(id) = backup {
            invoice.invoice_code = format!("MOMO-{}", id);
            invoice.transaction_id = Some(id);
        }
    }

    if invoice.kind == InvoiceKind::Electricity
        && invoice.total_amount > Decimal::from(ELECTRICITY_SUSPICIOUS_AMOUNT)
    {
        invoice.total_amount /= Decimal::ONE_HUNDRED;
        invoice.subtotal = invoice.total_amount;
    }

    if invoice.kind == InvoiceKind::MomoPayment && invoice.buyer_name == UNKNOWN_NAME {
        invoice.buyer_name = invoice
            .payment_account
            .clone()
            .unwrap_or_else(|| "MoMo User".to_string());
    }

    if invoice.seller_name.trim().is_empty() || invoice.seller_name == UNKNOWN_NAME {
        invoice.seller_name = match invoice.kind {
            InvoiceKind::Electricity => "Công ty Điện lực",
            InvoiceKind::MomoPayment => "MoMo Payment",
            _ => "Unknown Vendor",
        }
        .to_string();
    }

    if !invoice.has_code() {
        match invoice.kind {
            InvoiceKind::MomoPayment => {
                if let Some(id) = &invoice.transaction_id {
                    invoice.invoice_code = format!("MOMO-{}", id);
                }
            }
            InvoiceKind::Electricity => {
                let customer: String = invoice
                    .buyer_name
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .take(10)
                    .collect();
                invoice.invoice_code = if customer.is_empty() || invoice.buyer_name == UNKNOWN_NAME {
                    format!("EVN-{}", Utc::now().format("%Y%m%d%H%M%S"))
                } else {
                    format!("EVN-{}", customer)
                };
            }
            _ => {}
        }
    }
}

/// Confidence from the number of fields found: 0.5 base, +0.1 per field.
pub fn pattern_confidence(invoice: &ExtractedInvoice) -> f32 {
    let found = [
        invoice.has_code(),
        invoice.date_text.is_some() || invoice.date.is_some(),
        invoice.buyer_name != UNKNOWN_NAME,
        invoice.seller_name != UNKNOWN_NAME,
        !invoice.total_amount.is_zero(),
    ];

    let confidence = 0.5 + 0.1 * found.iter().filter(|f| **f).count() as f32;
    confidence.min(1.0)
}

fn find_transaction_id(text: &str) -> Option<String> {
    MOMO_TRANSACTION_PATTERNS.iter().find_map(|re| {
        re.captures_iter(text)
            .map(|caps| caps[1].trim().to_string())
            .find(|candidate| is_plausible_transaction_id(candidate))
    })
}

fn is_plausible_transaction_id(candidate: &str) -> bool {
    let lower = candidate.to_lowercase();
    let digits_only = candidate
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .all(|c| c.is_ascii_digit());

    candidate.len() >= 6
        && !lower.contains("vnd")
        && !lower.contains('đ')
        && !candidate.contains(['.', ','])
        && !digits_only
}

fn find_invoice_code(text: &str) -> Option<String> {
    INVOICE_CODE_PATTERNS.iter().find_map(|re| {
        re.captures_iter(text)
            .map(|caps| caps[1].trim().trim_end_matches('-').to_string())
            .find(|code| code.chars().any(|c| c.is_ascii_digit()))
    })
}

fn first_amount_in_range(
    patterns: &[regex::Regex],
    text: &str,
    min: Decimal,
    max: Decimal,
) -> Option<Decimal> {
    patterns.iter().find_map(|re| {
        re.captures_iter(text)
            .filter_map(|caps| parse_vnd_amount(&caps[1]))
            .find(|amount| !amount.is_zero() && *amount >= min && *amount <= max)
    })
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.trim().chars().take(max).collect()
}
