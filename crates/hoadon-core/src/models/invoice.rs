//! Invoice data models for Vietnamese invoices and payment receipts.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Placeholder code used when no invoice code could be extracted.
pub const UNKNOWN_CODE: &str = "INV-UNKNOWN";

/// Placeholder party name used when a name could not be extracted.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Kind of document the text was recognised as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    /// Ordinary sales invoice (hóa đơn GTGT / bán hàng).
    #[default]
    General,
    /// MoMo e-wallet payment receipt.
    MomoPayment,
    /// Electricity bill (hóa đơn tiền điện).
    Electricity,
    /// Water bill (hóa đơn tiền nước).
    Water,
    /// Retail sale.
    Sale,
    /// Service invoice.
    Service,
}

impl InvoiceKind {
    /// All kinds, in display order.
    pub const ALL: [InvoiceKind; 6] = [
        InvoiceKind::General,
        InvoiceKind::MomoPayment,
        InvoiceKind::Electricity,
        InvoiceKind::Water,
        InvoiceKind::Sale,
        InvoiceKind::Service,
    ];

    /// Stable machine name.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceKind::General => "general",
            InvoiceKind::MomoPayment => "momo_payment",
            InvoiceKind::Electricity => "electricity",
            InvoiceKind::Water => "water",
            InvoiceKind::Sale => "sale",
            InvoiceKind::Service => "service",
        }
    }

    /// Vietnamese display label.
    pub fn label(&self) -> &'static str {
        match self {
            InvoiceKind::General => "Hóa đơn chung",
            InvoiceKind::MomoPayment => "Thanh toán MoMo",
            InvoiceKind::Electricity => "Hóa đơn điện",
            InvoiceKind::Water => "Hóa đơn nước",
            InvoiceKind::Sale => "Hóa đơn bán hàng",
            InvoiceKind::Service => "Hóa đơn dịch vụ",
        }
    }

    /// Parse from the machine name.
    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        InvoiceKind::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// Payment status of a stored invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Parse status from a string (English or Vietnamese).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "chờ thanh toán" | "chưa thanh toán" => Some(InvoiceStatus::Pending),
            "paid" | "đã thanh toán" => Some(InvoiceStatus::Paid),
            "overdue" | "quá hạn" => Some(InvoiceStatus::Overdue),
            "cancelled" | "canceled" | "đã hủy" => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }
}

/// A single line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product/service description.
    pub description: String,

    /// Quantity.
    pub quantity: Decimal,

    /// Unit price, when printed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,

    /// Line total.
    pub amount: Decimal,
}

impl LineItem {
    /// A single-unit item with only a total.
    pub fn single(description: impl Into<String>, amount: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity: Decimal::ONE,
            unit_price: None,
            amount,
        }
    }
}

/// How the grand total of a multi-amount document was chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrandTotalMethod {
    /// A grand-total label (tổng cộng, tổng thanh toán, ...) was found.
    Keyword,
    /// One amount equals the sum of all the others.
    SumMatch,
    /// The largest amount was taken.
    Largest,
    /// No amounts at all.
    #[default]
    None,
}

/// Every amount found on a document, classified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmountBreakdown {
    /// Line amounts (items, fees) in document order.
    pub subtotals: Vec<Decimal>,

    /// Labeled pre-tax subtotal (thành tiền, tạm tính).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,

    /// Tax amount (thuế, VAT).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax: Option<Decimal>,

    /// Discount, always non-negative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,

    /// Grand total.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grand_total: Option<Decimal>,

    /// How `grand_total` was decided.
    pub method: GrandTotalMethod,
}

/// Fields extracted from the OCR text of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedInvoice {
    /// Invoice code, transaction code or customer code.
    pub invoice_code: String,

    /// Detected document kind.
    pub kind: InvoiceKind,

    /// Document date, when it parses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    /// Date (and time) as printed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_text: Option<String>,

    pub buyer_name: String,
    pub seller_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_address: Option<String>,

    /// E-wallet transaction id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_account: Option<String>,

    pub currency: String,

    /// Amount due; negative for refunds and payments on utility bills.
    pub total_amount: Decimal,

    pub subtotal: Decimal,
    pub tax_amount: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_percentage: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<LineItem>,

    /// Classified amounts found in the text.
    #[serde(default)]
    pub amounts: AmountBreakdown,
}

impl Default for ExtractedInvoice {
    fn default() -> Self {
        Self {
            invoice_code: UNKNOWN_CODE.to_string(),
            kind: InvoiceKind::General,
            date: None,
            date_text: None,
            buyer_name: UNKNOWN_NAME.to_string(),
            seller_name: UNKNOWN_NAME.to_string(),
            buyer_tax_id: None,
            seller_tax_id: None,
            buyer_address: None,
            seller_address: None,
            transaction_id: None,
            payment_method: None,
            payment_account: None,
            currency: "VND".to_string(),
            total_amount: Decimal::ZERO,
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            tax_percentage: None,
            items: Vec::new(),
            amounts: AmountBreakdown::default(),
        }
    }
}

impl ExtractedInvoice {
    /// Whether a real invoice code was found.
    pub fn has_code(&self) -> bool {
        self.invoice_code != UNKNOWN_CODE && !self.invoice_code.is_empty()
    }
}

/// A saved invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Store-assigned id (0 until inserted).
    #[serde(default)]
    pub id: u64,

    /// Source file name.
    #[serde(default)]
    pub filename: String,

    pub invoice_code: String,

    #[serde(default)]
    pub kind: InvoiceKind,

    pub buyer_name: String,
    pub seller_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_code: Option<String>,

    pub total_amount: Decimal,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default)]
    pub status: InvoiceStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<LineItem>,

    /// Extraction confidence (0.0 - 1.0).
    #[serde(default)]
    pub confidence: f32,

    /// OCR text the invoice was extracted from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_text: String,

    pub created_at: DateTime<Utc>,
}

fn default_currency() -> String {
    "VND".to_string()
}

impl Invoice {
    /// Create an empty pending invoice.
    pub fn new(invoice_code: impl Into<String>, total_amount: Decimal) -> Self {
        Self {
            id: 0,
            filename: String::new(),
            invoice_code: invoice_code.into(),
            kind: InvoiceKind::General,
            buyer_name: UNKNOWN_NAME.to_string(),
            seller_name: UNKNOWN_NAME.to_string(),
            tax_code: None,
            total_amount,
            currency: default_currency(),
            status: InvoiceStatus::Pending,
            invoice_date: None,
            due_date: None,
            items: Vec::new(),
            confidence: 0.0,
            raw_text: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Build a record from extracted fields.
    pub fn from_extracted(
        extracted: &ExtractedInvoice,
        filename: impl Into<String>,
        confidence: f32,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            filename: filename.into(),
            invoice_code: extracted.invoice_code.clone(),
            kind: extracted.kind,
            buyer_name: extracted.buyer_name.clone(),
            seller_name: extracted.seller_name.clone(),
            tax_code: extracted
                .seller_tax_id
                .clone()
                .or_else(|| extracted.buyer_tax_id.clone()),
            total_amount: extracted.total_amount,
            currency: extracted.currency.clone(),
            status: InvoiceStatus::Pending,
            invoice_date: extracted.date,
            due_date: None,
            items: extracted.items.clone(),
            confidence,
            raw_text: raw_text.into(),
            created_at: Utc::now(),
        }
    }

    /// Unpaid and past its due date.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(self.status, InvoiceStatus::Pending | InvoiceStatus::Overdue)
            && self.due_date.is_some_and(|due| due < today)
    }

    /// Validate the record and return any issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.invoice_code.trim().is_empty() {
            issues.push("Missing invoice code".to_string());
        }

        if let (Some(issued), Some(due)) = (self.invoice_date, self.due_date) {
            if due < issued {
                issues.push(format!("Due date {} is before invoice date {}", due, issued));
            }
        }

        if !(0.0..=1.0).contains(&self.confidence) {
            issues.push(format!("Confidence {} out of range", self.confidence));
        }

        if !self.items.is_empty() {
            let items_total: Decimal = self.items.iter().map(|i| i.amount).sum();
            if items_total > self.total_amount.abs() && !self.total_amount.is_zero() {
                issues.push(format!(
                    "Line items total ({}) exceeds invoice total ({})",
                    items_total, self.total_amount
                ));
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip_names() {
        for kind in InvoiceKind::ALL {
            assert_eq!(InvoiceKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(InvoiceKind::from_str("bogus"), None);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(InvoiceStatus::from_str("PAID"), Some(InvoiceStatus::Paid));
        assert_eq!(InvoiceStatus::from_str("đã thanh toán"), Some(InvoiceStatus::Paid));
        assert_eq!(InvoiceStatus::from_str("quá hạn"), Some(InvoiceStatus::Overdue));
        assert_eq!(InvoiceStatus::from_str("x"), None);
    }

    #[test]
    fn test_overdue() {
        let mut invoice = Invoice::new("HD001", Decimal::new(100_000, 0));
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        invoice.due_date = NaiveDate::from_ymd_opt(2024, 5, 1);
        assert!(invoice.is_overdue(today));

        invoice.status = InvoiceStatus::Paid;
        assert!(!invoice.is_overdue(today));
    }

    #[test]
    fn test_validate_due_before_issue() {
        let mut invoice = Invoice::new("HD001", Decimal::new(100_000, 0));
        invoice.invoice_date = NaiveDate::from_ymd_opt(2024, 5, 10);
        invoice.due_date = NaiveDate::from_ymd_opt(2024, 5, 1);
        let issues = invoice.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("before"));
    }

    #[test]
    fn test_from_extracted_prefers_seller_tax_id() {
        let extracted = ExtractedInvoice {
            invoice_code: "HD123".to_string(),
            seller_tax_id: Some("0101234567".to_string()),
            buyer_tax_id: Some("0309876543".to_string()),
            total_amount: Decimal::new(385_000, 0),
            ..Default::default()
        };
        let invoice = Invoice::from_extracted(&extracted, "hd.jpg", 0.9, "raw");
        assert_eq!(invoice.tax_code.as_deref(), Some("0101234567"));
        assert_eq!(invoice.filename, "hd.jpg");
        assert_eq!(invoice.status, InvoiceStatus::Pending);
    }
}
