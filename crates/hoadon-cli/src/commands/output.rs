//! Invoice rendering shared by the commands.

use hoadon_core::invoice::rules::format_vnd;
use hoadon_core::models::invoice::Invoice;
use rust_decimal::Decimal;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

const CSV_HEADER: [&str; 12] = [
    "id",
    "invoice_code",
    "kind",
    "invoice_date",
    "seller_name",
    "buyer_name",
    "tax_code",
    "total_amount",
    "currency",
    "status",
    "confidence",
    "filename",
];

pub fn format_invoice(invoice: &Invoice, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(invoice)?),
        OutputFormat::Csv => invoices_csv(std::slice::from_ref(invoice)),
        OutputFormat::Text => Ok(invoice_text(invoice)),
    }
}

pub fn format_invoices(invoices: &[Invoice], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(invoices)?),
        OutputFormat::Csv => invoices_csv(invoices),
        OutputFormat::Text => Ok(invoices
            .iter()
            .map(invoice_line)
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

pub fn invoices_csv(invoices: &[Invoice]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(CSV_HEADER)?;

    for invoice in invoices {
        wtr.write_record([
            invoice.id.to_string(),
            invoice.invoice_code.clone(),
            invoice.kind.as_str().to_string(),
            invoice.invoice_date.map(|d| d.to_string()).unwrap_or_default(),
            invoice.seller_name.clone(),
            invoice.buyer_name.clone(),
            invoice.tax_code.clone().unwrap_or_default(),
            invoice.total_amount.to_string(),
            invoice.currency.clone(),
            invoice.status.as_str().to_string(),
            format!("{:.2}", invoice.confidence),
            invoice.filename.clone(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

pub fn money(amount: Decimal, currency: &str) -> String {
    if currency.eq_ignore_ascii_case("VND") {
        format_vnd(amount)
    } else {
        format!("{} {}", amount, currency)
    }
}

/// One-line listing entry.
pub fn invoice_line(invoice: &Invoice) -> String {
    format!(
        "#{:<4} {:<16} {:<12} {:>16}  {:<10} {}",
        invoice.id,
        invoice.invoice_code,
        invoice
            .invoice_date
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| "-".to_string()),
        money(invoice.total_amount, &invoice.currency),
        invoice.status.as_str(),
        invoice.seller_name,
    )
}

pub fn invoice_text(invoice: &Invoice) -> String {
    let mut output = String::new();

    output.push_str(&format!("Invoice: {}\n", invoice.invoice_code));
    output.push_str(&format!("Kind: {}\n", invoice.kind.label()));
    if let Some(date) = invoice.invoice_date {
        output.push_str(&format!("Date: {}\n", date.format("%d/%m/%Y")));
    }
    output.push('\n');

    output.push_str(&format!("Seller: {}\n", invoice.seller_name));
    if let Some(tax_code) = &invoice.tax_code {
        output.push_str(&format!("  Tax code: {}\n", tax_code));
    }
    output.push_str(&format!("Buyer: {}\n", invoice.buyer_name));

    if !invoice.items.is_empty() {
        output.push_str("\nItems:\n");
        for item in &invoice.items {
            output.push_str(&format!(
                "  - {} x{}: {}\n",
                item.description,
                item.quantity,
                money(item.amount, &invoice.currency)
            ));
        }
    }

    output.push('\n');
    output.push_str(&format!(
        "Total: {}\n",
        money(invoice.total_amount, &invoice.currency)
    ));
    output.push_str(&format!("Status: {}\n", invoice.status.as_str()));

    if let Some(due_date) = invoice.due_date {
        output.push_str(&format!("Payment due: {}\n", due_date.format("%d/%m/%Y")));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Invoice {
        let mut invoice = Invoice::new("0001234", Decimal::from(121_000));
        invoice.id = 7;
        invoice.seller_name = "Công ty TNHH Thương mại ABC".to_string();
        invoice
    }

    #[test]
    fn test_csv_has_header_and_row() {
        let csv = invoices_csv(&[sample()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("id,invoice_code,kind"));
        assert!(lines[1].starts_with("7,0001234,general"));
    }

    #[test]
    fn test_text_uses_vnd_format() {
        let text = invoice_text(&sample());
        assert!(text.contains("Invoice: 0001234"));
        assert!(text.contains("Total: 121.000 ₫"));
    }

    #[test]
    fn test_money_other_currency() {
        assert_eq!(money(Decimal::from(15), "USD"), "15 USD");
    }
}
