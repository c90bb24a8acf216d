//! Date extraction for Vietnamese invoices.

use chrono::NaiveDate;

use super::patterns::{DATE_DMY, DATE_VIETNAMESE_LONG, DATE_YMD, DUE_DATE, ISSUE_DATE};
use super::{ExtractionMatch, FieldExtractor};

/// Formats tried by [`parse_date`], in order.
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%m/%d/%Y", "%Y-%m-%d", "%d/%m/%y", "%d-%m-%y",
];

/// Date field extractor.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        let mut all = self.extract_all(text);
        all.sort_by_key(|m| m.position.map(|(start, _)| start).unwrap_or(usize::MAX));
        all.into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<Self::Output> = Vec::new();

        // ngày 15 tháng 12 năm 2023
        for caps in DATE_VIETNAMESE_LONG.captures_iter(text) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let month: u32 = caps[2].parse().unwrap_or(0);
            let year: i32 = caps[3].parse().unwrap_or(0);

            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                let Some(full_match) = caps.get(0) else {
                    continue;
                };
                results.push(
                    ExtractionMatch::new(date, 0.95, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                );
            }
        }

        // DD/MM/YYYY, DD-MM-YYYY or DD.MM.YYYY
        for caps in DATE_DMY.captures_iter(text) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let month: u32 = caps[2].parse().unwrap_or(0);
            let year = parse_year(&caps[3]);

            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                if results.iter().any(|r| r.value == date) {
                    continue;
                }

                let Some(full_match) = caps.get(0) else {
                    continue;
                };
                results.push(
                    ExtractionMatch::new(date, 0.9, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                );
            }
        }

        // YYYY-MM-DD or YYYY/MM/DD
        for caps in DATE_YMD.captures_iter(text) {
            let year: i32 = caps[1].parse().unwrap_or(0);
            let month: u32 = caps[2].parse().unwrap_or(0);
            let day: u32 = caps[3].parse().unwrap_or(0);

            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                if results.iter().any(|r| r.value == date) {
                    continue;
                }

                let Some(full_match) = caps.get(0) else {
                    continue;
                };
                results.push(
                    ExtractionMatch::new(date, 0.9, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                );
            }
        }

        results
    }
}

/// Extracted dates from an invoice.
#[derive(Debug, Clone, Default)]
pub struct InvoiceDates {
    /// Issue date (ngày lập).
    pub issue_date: Option<ExtractionMatch<NaiveDate>>,
    /// Payment due date (hạn thanh toán).
    pub due_date: Option<ExtractionMatch<NaiveDate>>,
}

/// Extract labeled dates from invoice text.
pub fn extract_dates(text: &str) -> InvoiceDates {
    let mut result = InvoiceDates::default();
    let date_extractor = DateExtractor::new();

    if let Some(caps) = DUE_DATE.captures(text) {
        let date_text = &caps[1];
        if let Some(date) = date_extractor.extract(date_text) {
            result.due_date = Some(ExtractionMatch::new(date.value, 0.95, date_text));
        }
    }

    // The issue label also matches "ngày" inside "hạn thanh toán ngày", so skip due lines.
    for caps in ISSUE_DATE.captures_iter(text) {
        let Some(full) = caps.get(0) else {
            continue;
        };
        let line_start = text[..full.start()].rfind('\n').map(|i| i + 1).unwrap_or(0);
        if DUE_DATE.is_match(&text[line_start..full.end()]) {
            continue;
        }

        let date_text = &caps[1];
        if let Some(date) = date_extractor.extract(date_text) {
            result.issue_date = Some(ExtractionMatch::new(date.value, 0.95, date_text));
            break;
        }
    }

    if result.issue_date.is_none() {
        result.issue_date = date_extractor
            .extract(text)
            .filter(|d| result.due_date.as_ref().is_none_or(|due| due.value != d.value));
    }

    result
}

/// Parse a date string using the accepted invoice formats.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_year(s: &str) -> i32 {
    let year: i32 = s.parse().unwrap_or(0);
    if year < 100 {
        // Two-digit year: assume 2000s for 00-50, 1900s for 51-99
        if year <= 50 {
            2000 + year
        } else {
            1900 + year
        }
    } else {
        year
    }
}
