//! Amount extraction for Vietnamese invoices.

use regex::Match;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use super::patterns::{
    AMOUNT_PATTERN, DISCOUNT_LABEL, GRAND_TOTAL_LABEL, SUBTOTAL_LABEL, TAX_LABEL,
};
use super::{ExtractionMatch, FieldExtractor};
use crate::models::invoice::{AmountBreakdown, GrandTotalMethod};

/// Amount field extractor.
///
/// Accepts thousand-grouped numbers (`1.234.567`, `1,234,567.50`) and plain
/// digit runs followed by a currency marker (`50000đ`). Bare numbers such as
/// quantities, percentages and years are ignored.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for caps in AMOUNT_PATTERN.captures_iter(text) {
            let Some(full_match) = caps.get(0) else {
                continue;
            };
            let has_currency = caps.get(5).is_some();
            let number = match (caps.get(3), caps.get(4)) {
                (Some(grouped), _) => grouped,
                (None, Some(plain)) if has_currency => plain,
                _ => continue,
            };
            if !is_standalone(text, full_match.start(), number.end()) {
                continue;
            }

            let Some(mut amount) = parse_vnd_amount(number.as_str()) else {
                continue;
            };
            if caps.get(1).is_some() || caps.get(2).is_some() {
                amount = -amount;
            }

            let confidence = if has_currency { 0.9 } else { 0.7 };
            results.push(
                ExtractionMatch::new(amount, confidence, full_match.as_str().trim())
                    .with_position(full_match.start(), full_match.end()),
            );
        }

        results
    }
}

/// False when the digits at `start..end` continue a longer number on either
/// side, as in `15.12.2023` or `0901.234.567`.
fn is_standalone(text: &str, start: usize, end: usize) -> bool {
    let is_separator = |c: char| c == '.' || c == ',';

    let mut before = text[..start].chars().rev();
    let joined_before = match before.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some(c) if is_separator(c) => before.next().is_some_and(|p| p.is_ascii_digit()),
        _ => false,
    };

    let mut after = text[end..].chars();
    let joined_after = match after.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some(c) if is_separator(c) => after.next().is_some_and(|n| n.is_ascii_digit()),
        _ => false,
    };

    !joined_before && !joined_after
}

/// Role of an amount, decided by the label on its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AmountLabel {
    GrandTotal,
    Subtotal,
    Tax,
    Discount,
    Line,
}

fn classify_line(line: &str) -> AmountLabel {
    if SUBTOTAL_LABEL.is_match(line) {
        return AmountLabel::Subtotal;
    }

    let grand = GRAND_TOTAL_LABEL.find(line);
    let tax = TAX_LABEL.find(line);
    let discount = DISCOUNT_LABEL.find(line);

    match grand {
        Some(grand) => {
            // "Tổng tiền thuế" is a tax line; "Tổng cộng (gồm VAT)" is the total.
            if tax.is_some_and(|t| qualifies(grand, t, line)) {
                AmountLabel::Tax
            } else if discount.is_some_and(|d| qualifies(grand, d, line)) {
                AmountLabel::Discount
            } else {
                AmountLabel::GrandTotal
            }
        }
        None if tax.is_some() => AmountLabel::Tax,
        None if discount.is_some() => AmountLabel::Discount,
        None => AmountLabel::Line,
    }
}

/// Whether `label` names what the grand-total word is summing.
fn qualifies(grand: Match<'_>, label: Match<'_>, line: &str) -> bool {
    label.start() < grand.start()
        || (label.start() >= grand.end() && line[grand.end()..label.start()].trim().is_empty())
}

/// Extract every amount on the document and decide which one is the grand total.
///
/// The last amount on each line is its value. A grand-total label wins
/// outright; otherwise an amount equal to the sum of all other unlabeled
/// amounts is taken, and failing that the largest amount.
pub fn extract_multiple_amounts(text: &str) -> AmountBreakdown {
    let extractor = AmountExtractor::new();
    let mut result = AmountBreakdown::default();
    let mut keyword_total = None;
    let mut unlabeled = Vec::new();
    let mut all = Vec::new();

    for line in text.lines() {
        let Some(amount) = extractor.extract_all(line).pop() else {
            continue;
        };
        let value = amount.value;
        all.push(value);

        match classify_line(line) {
            AmountLabel::GrandTotal => keyword_total = Some(value),
            AmountLabel::Subtotal => result.subtotal = Some(value),
            AmountLabel::Tax => result.tax = Some(value.abs()),
            AmountLabel::Discount => result.discount = Some(value.abs()),
            AmountLabel::Line => unlabeled.push(value),
        }
    }

    if let Some(total) = keyword_total {
        result.grand_total = Some(total);
        result.method = GrandTotalMethod::Keyword;
    } else if let Some(idx) = find_sum_match(&unlabeled) {
        result.grand_total = Some(unlabeled.remove(idx));
        result.method = GrandTotalMethod::SumMatch;
    } else if let Some(max) = all.iter().max().copied() {
        if let Some(idx) = unlabeled.iter().position(|v| *v == max) {
            unlabeled.remove(idx);
        }
        result.grand_total = Some(max);
        result.method = GrandTotalMethod::Largest;
    }

    result.subtotals = unlabeled;
    result
}

/// Index of an amount equal to the sum of all the others (needs at least three).
fn find_sum_match(values: &[Decimal]) -> Option<usize> {
    if values.len() < 3 {
        return None;
    }
    let sum: Decimal = values.iter().sum();
    values
        .iter()
        .position(|v| !v.is_zero() && *v * Decimal::TWO == sum)
}

/// Parse a Vietnamese-formatted amount (e.g. "1.234.567", "385.000 VNĐ", "1.234,56").
///
/// A leading `-` or an opening parenthesis marks a negative amount.
pub fn parse_vnd_amount(s: &str) -> Option<Decimal> {
    let trimmed = s.trim();
    let negative = trimmed.starts_with('-') || trimmed.starts_with('(');

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == ',' || c == '.');

    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => normalize_single_separator(cleaned, ','),
        (None, Some(_)) => normalize_single_separator(cleaned, '.'),
        (None, None) => cleaned.to_string(),
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

fn normalize_single_separator(s: &str, sep: char) -> String {
    let groups: Vec<&str> = s.split(sep).collect();
    let thousands = (1..=3).contains(&groups[0].len())
        && groups[1..].iter().all(|g| g.len() == 3);

    if !thousands && groups.len() == 2 {
        s.replace(sep, ".")
    } else {
        s.replace(sep, "")
    }
}

/// Format amount in Vietnamese style (1.234.567 ₫).
pub fn format_vnd(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let text = rounded.abs().to_string();
    let integer_part = text.split('.').next().unwrap_or("0");

    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();

    if rounded.is_sign_negative() && !rounded.is_zero() {
        formatted.push('-');
    }

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push('.');
        }
        formatted.push(*c);
    }

    format!("{} ₫", formatted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_vnd_amount() {
        assert_eq!(parse_vnd_amount("1.234.567"), Some(d("1234567")));
        assert_eq!(parse_vnd_amount("1,234,567"), Some(d("1234567")));
        assert_eq!(parse_vnd_amount("1,234.56"), Some(d("1234.56")));
        assert_eq!(parse_vnd_amount("1.234,56"), Some(d("1234.56")));
        assert_eq!(parse_vnd_amount("385.000 VNĐ"), Some(d("385000")));
        assert_eq!(parse_vnd_amount("-308.472"), Some(d("-308472")));
        assert_eq!(parse_vnd_amount("(308.472d)"), Some(d("-308472")));
        assert_eq!(parse_vnd_amount("12,5"), Some(d("12.5")));
        assert_eq!(parse_vnd_amount("VND"), None);
    }

    #[test]
    fn test_format_vnd() {
        assert_eq!(format_vnd(d("1234567")), "1.234.567 ₫");
        assert_eq!(format_vnd(d("999")), "999 ₫");
        assert_eq!(format_vnd(d("1000.5")), "1.001 ₫");
        assert_eq!(format_vnd(d("-308472")), "-308.472 ₫");
        assert_eq!(format_vnd(Decimal::ZERO), "0 ₫");
    }

    #[test]
    fn test_extract_all_ignores_bare_numbers() {
        let extractor = AmountExtractor::new();
        let results = extractor.extract_all("Gạo 10kg: 200.000 VNĐ, thuế 10%, năm 2024, phí 5000đ");
        let values: Vec<Decimal> = results.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![d("200000"), d("5000")]);
        assert!(results[0].confidence > 0.8);
    }

    #[test]
    fn test_extract_all_skips_dates_and_phone_numbers() {
        let extractor = AmountExtractor::new();
        assert!(extractor.extract_all("SĐT: 0901.234.567").is_empty());
        assert!(extractor.extract_all("Ngày: 15.12.2023").is_empty());

        let values: Vec<Decimal> = extractor
            .extract_all("Hotline 1900.1234.567, phí dịch vụ 50.000đ.")
            .iter()
            .map(|m| m.value)
            .collect();
        assert_eq!(values, vec![d("50000")]);
    }

    #[test]
    fn test_multi_amounts_ignore_date_and_phone_lines() {
        let amounts = extract_multiple_amounts(
            "Ngày: 15.12.2023\nSĐT: 0901.234.567\nPhí: 50.000đ\nPhí giao hàng: 20.000đ",
        );
        assert_eq!(amounts.method, GrandTotalMethod::Largest);
        assert_eq!(amounts.grand_total, Some(d("50000")));
        assert_eq!(amounts.subtotals, vec![d("20000")]);
    }

    #[test]
    fn test_multi_amounts_restaurant() {
        let text = r#"
            NHÀ HÀNG HOÀNG LONG
            ===================
            Món ăn 1: Phở bò         100.000 VNĐ
            Món ăn 2: Cơm gà        200.000 VNĐ
            Món ăn 3: Nước ngọt      50.000 VNĐ

            Thành tiền:             350.000 VNĐ
            Thuế VAT 10%:            35.000 VNĐ
            TỔNG CỘNG:              385.000 VNĐ
        "#;

        let amounts = extract_multiple_amounts(text);
        assert_eq!(amounts.method, GrandTotalMethod::Keyword);
        assert_eq!(amounts.grand_total, Some(d("385000")));
        assert_eq!(amounts.subtotal, Some(d("350000")));
        assert_eq!(amounts.tax, Some(d("35000")));
        assert_eq!(amounts.subtotals, vec![d("100000"), d("200000"), d("50000")]);
    }

    #[test]
    fn test_multi_amounts_utilities() {
        let text = r#"
            HÓA ĐƠN TIỆN ÍCH
            Tiền điện:              500.000 VNĐ
            Tiền nước:              120.000 VNĐ
            Tiền internet:           80.000 VNĐ

            Tổng cộng:              700.000 VNĐ
        "#;

        let amounts = extract_multiple_amounts(text);
        assert_eq!(amounts.grand_total, Some(d("700000")));
        assert_eq!(amounts.subtotals.len(), 3);
    }

    #[test]
    fn test_multi_amounts_with_discount() {
        let text = r#"
            SIÊU THỊ COOPMART
            Gạo 10kg:               200.000 VNĐ
            Thịt heo 2kg:           180.000 VNĐ
            Rau củ:                  50.000 VNĐ
            Gia vị:                  30.000 VNĐ
            Nước giải khát:          40.000 VNĐ

            Tạm tính:               500.000 VNĐ
            Giảm giá 10%:           -50.000 VNĐ
            TỔNG THANH TOÁN:        450.000 VNĐ
        "#;

        let amounts = extract_multiple_amounts(text);
        assert_eq!(amounts.grand_total, Some(d("450000")));
        assert_eq!(amounts.discount, Some(d("50000")));
        assert_eq!(amounts.subtotal, Some(d("500000")));
        assert_eq!(amounts.subtotals.len(), 5);
    }

    #[test]
    fn test_multi_amounts_sum_detection() {
        let text = "800.000\n300.000\n500.000\n";

        let amounts = extract_multiple_amounts(text);
        assert_eq!(amounts.method, GrandTotalMethod::SumMatch);
        assert_eq!(amounts.grand_total, Some(d("800000")));
        assert_eq!(amounts.subtotals, vec![d("300000"), d("500000")]);
    }

    #[test]
    fn test_multi_amounts_largest_fallback() {
        let amounts = extract_multiple_amounts("Phí A: 120.000đ\nPhí B: 90.000đ");
        assert_eq!(amounts.method, GrandTotalMethod::Largest);
        assert_eq!(amounts.grand_total, Some(d("120000")));
        assert_eq!(amounts.subtotals, vec![d("90000")]);
    }

    #[test]
    fn test_multi_amounts_empty() {
        let amounts = extract_multiple_amounts("");
        assert_eq!(amounts.method, GrandTotalMethod::None);
        assert_eq!(amounts.grand_total, None);
    }

    #[test]
    fn test_total_tax_line_is_tax() {
        let amounts = extract_multiple_amounts("Tổng tiền thuế: 35.000\nTổng cộng (gồm VAT): 385.000");
        assert_eq!(amounts.tax, Some(d("35000")));
        assert_eq!(amounts.grand_total, Some(d("385000")));
    }
}
