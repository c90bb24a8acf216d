//! MST (mã số thuế, Vietnamese tax code) extraction and validation.
//!
//! An MST is 10 digits for the enterprise, optionally followed by a 3 digit
//! branch suffix (`0101234567-001`). Only the format is checked.

use super::patterns::{TAX_CODE_LABELED, TAX_CODE_STANDALONE};
use super::{ExtractionMatch, FieldExtractor};

/// MST field extractor.
pub struct TaxCodeExtractor {
    labeled_only: bool,
}

impl TaxCodeExtractor {
    /// Create a new MST extractor.
    pub fn new() -> Self {
        Self { labeled_only: false }
    }

    /// Only accept codes preceded by an MST label.
    pub fn labeled_only(mut self, labeled_only: bool) -> Self {
        self.labeled_only = labeled_only;
        self
    }
}

impl Default for TaxCodeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for TaxCodeExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<Self::Output> = Vec::new();

        for caps in TAX_CODE_LABELED.captures_iter(text) {
            let code = join_code(&caps[1], caps.get(2).map(|m| m.as_str()));
            if validate_tax_code(&code) {
                let Some(full_match) = caps.get(0) else {
                    continue;
                };
                results.push(
                    ExtractionMatch::new(code, 0.95, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                );
            }
        }

        if self.labeled_only {
            return results;
        }

        for caps in TAX_CODE_STANDALONE.captures_iter(text) {
            let code = join_code(&caps[1], caps.get(2).map(|m| m.as_str()));
            if results.iter().any(|r| r.value == code) || !validate_tax_code(&code) {
                continue;
            }

            let Some(full_match) = caps.get(0) else {
                continue;
            };
            results.push(
                ExtractionMatch::new(code, 0.6, full_match.as_str())
                    .with_position(full_match.start(), full_match.end()),
            );
        }

        results
    }
}

fn join_code(main: &str, branch: Option<&str>) -> String {
    match branch {
        Some(branch) => format!("{}-{}", main, branch),
        None => main.to_string(),
    }
}

/// Extract the first MST found in text, formatted.
pub fn extract_tax_code(text: &str) -> Option<String> {
    TaxCodeExtractor::new().extract(text).map(|m| m.value)
}

/// Validate MST format: 10 digits, or 13 digits with an optional dash before the branch.
pub fn validate_tax_code(code: &str) -> bool {
    let digits: String = code.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if digits.len() != 10 && digits.len() != 13 {
        return false;
    }
    if code.matches('-').count() > 1 {
        return false;
    }
    if let Some(pos) = code.find('-') {
        if code[..pos].trim().len() != 10 {
            return false;
        }
    }

    !digits[..10].chars().all(|c| c == '0')
}

/// Format MST as `0101234567` or `0101234567-001`.
pub fn format_tax_code(code: &str) -> Option<String> {
    if !validate_tax_code(code) {
        return None;
    }

    let digits: String = code.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 13 {
        Some(format!("{}-{}", &digits[..10], &digits[10..]))
    } else {
        Some(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tax_code() {
        assert!(validate_tax_code("0101234567"));
        assert!(validate_tax_code("0101234567-001"));
        assert!(validate_tax_code("0101234567001"));
        assert!(!validate_tax_code("0000000000"));
        assert!(!validate_tax_code("01012345"));
        assert!(!validate_tax_code("01012345AB"));
        assert!(!validate_tax_code("01012-34567001"));
    }

    #[test]
    fn test_format_tax_code() {
        assert_eq!(format_tax_code("0101234567001"), Some("0101234567-001".to_string()));
        assert_eq!(format_tax_code("0101234567"), Some("0101234567".to_string()));
        assert_eq!(format_tax_code("123"), None);
    }

    #[test]
    fn test_extract_labeled() {
        let extractor = TaxCodeExtractor::new();
        let result = extractor.extract("Mã số thuế: 0312345678-002").unwrap();
        assert_eq!(result.value, "0312345678-002");
        assert!(result.confidence > 0.9);
    }

    #[test]
    fn test_extract_standalone_and_labeled_only() {
        let text = "Hotline 0901234567";
        assert_eq!(extract_tax_code(text), Some("0901234567".to_string()));
        assert!(TaxCodeExtractor::new().labeled_only(true).extract(text).is_none());
    }
}
