//! Line item extraction from table-like invoice rows.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::amounts::parse_vnd_amount;
use super::patterns::{GRAND_TOTAL_LABEL, LINE_ITEM, SUBTOTAL_LABEL};
use super::{ExtractionMatch, FieldExtractor};
use crate::models::invoice::LineItem;

/// Default cap on items taken from one document.
pub const DEFAULT_MAX_ITEMS: usize = 10;

/// Extracts rows of the form `description quantity unit_price total`.
pub struct ItemExtractor {
    max_items: usize,
}

impl ItemExtractor {
    pub fn new() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
        }
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    fn parse_line(&self, line: &str) -> Option<LineItem> {
        let caps = LINE_ITEM.captures(line)?;

        let description = caps[1].trim().trim_end_matches(':').trim();
        if description.is_empty()
            || GRAND_TOTAL_LABEL.is_match(description)
            || SUBTOTAL_LABEL.is_match(description)
        {
            return None;
        }

        let quantity = Decimal::from_str(&caps[2].replace(',', ".")).ok()?;
        if quantity <= Decimal::ZERO {
            return None;
        }

        let unit_price = parse_vnd_amount(&caps[3])?;
        let amount = parse_vnd_amount(&caps[4])?;

        Some(LineItem {
            description: description.to_string(),
            quantity,
            unit_price: Some(unit_price),
            amount,
        })
    }
}

impl Default for ItemExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for ItemExtractor {
    type Output = ExtractionMatch<LineItem>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();
        let mut offset = 0;

        for raw_line in text.split('\n') {
            let line_start = offset;
            offset += raw_line.len() + 1;

            let line = raw_line.trim();
            if let Some(item) = self.parse_line(line) {
                let start = line_start + (raw_line.len() - raw_line.trim_start().len());
                results.push(
                    ExtractionMatch::new(item, 0.7, line).with_position(start, start + line.len()),
                );
                if results.len() >= self.max_items {
                    break;
                }
            }
        }

        results
    }
}

/// Extract up to `max_items` line items from text.
pub fn extract_line_items(text: &str, max_items: usize) -> Vec<LineItem> {
    ItemExtractor::new()
        .with_max_items(max_items)
        .extract_all(text)
        .into_iter()
        .map(|m| m.value)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_items() {
        let text = r#"
            STT Tên hàng SL Đơn giá Thành tiền
            Cà phê sữa 2 25.000 50.000
            Bánh mì thịt 3 20,000 60,000
            Tổng cộng 1 110.000 110.000
        "#;

        let items = extract_line_items(text, 10);
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0],
            LineItem {
                description: "Cà phê sữa".to_string(),
                quantity: Decimal::from(2),
                unit_price: Some(Decimal::from(25_000)),
                amount: Decimal::from(50_000),
            }
        );
        assert_eq!(items[1].amount, Decimal::from(60_000));
    }

    #[test]
    fn test_zero_quantity_skipped() {
        assert!(extract_line_items("Khuyến mãi 0 10.000 0", 10).is_empty());
    }

    #[test]
    fn test_max_items_cap() {
        let text: String = (1..=15)
            .map(|i| format!("Hàng số {} 1 1.000 1.000\n", i))
            .collect();
        assert_eq!(extract_line_items(&text, 10).len(), 10);
        assert_eq!(extract_line_items(&text, 3).len(), 3);
    }
}
