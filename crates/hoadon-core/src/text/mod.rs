//! Vietnamese text normalisation and lightweight token extraction.
//!
//! Used by the chat intent detector (normalised matching, keyword search)
//! and by the store's free-text search.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::str::FromStr;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    // `\w` is Unicode-aware, so Vietnamese letters survive.
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s]").unwrap();

    static ref NUMBER_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\d{1,3}(?:[.,]\d{3})*(?:[.,]\d{1,2})?").unwrap(),
        Regex::new(r"\d+[.,]\d+").unwrap(),
        Regex::new(r"\d+").unwrap(),
    ];

    static ref DATE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\b\d{1,2}[/-]\d{1,2}[/-]\d{4}\b").unwrap(),
        Regex::new(r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2}\b").unwrap(),
        Regex::new(r"\b\d{4}[/-]\d{1,2}[/-]\d{1,2}\b").unwrap(),
        Regex::new(r"\b\d{1,2}\s+(?:tháng\s+)?\d{1,2}\s+(?:năm\s+)?\d{4}\b").unwrap(),
    ];

    static ref INVOICE_NUMBER_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?:hd|hóa đơn|invoice)[:\s]*([a-z0-9]+)").unwrap(),
        Regex::new(r"số[:\s]*([a-z0-9]+)").unwrap(),
        Regex::new(r"([a-z]{1,3}\d{6,})").unwrap(),
        Regex::new(r"(\d{7,})").unwrap(),
    ];

    static ref TAX_CODE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:mst|mã số thuế|tax code)[:\s]*(\d{10,13})").unwrap(),
        Regex::new(r"\b(\d{10})\b").unwrap(),
        Regex::new(r"\b(\d{13})\b").unwrap(),
    ];

    static ref AMOUNT_CHARS: Regex = Regex::new(r"[^\d.,]").unwrap();
}

const STOPWORDS: &[&str] = &[
    "và", "của", "có", "là", "được", "một", "này", "đó", "các", "cho", "với", "từ", "tại",
    "về", "để", "trong", "trên", "dưới", "sau", "trước", "giữa", "bên", "cạnh", "gần", "xa",
    "cao", "thấp",
];

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("hđ", "hóa đơn"),
    ("vat", "thuế giá trị gia tăng"),
    ("mst", "mã số thuế"),
    ("cty", "công ty"),
    ("tnhh", "trách nhiệm hữu hạn"),
    ("cp", "cổ phần"),
];

/// Vietnamese text processor.
pub struct TextProcessor {
    stopwords: HashSet<&'static str>,
    abbreviations: Vec<(Regex, &'static str)>,
}

impl TextProcessor {
    pub fn new() -> Self {
        let abbreviations = ABBREVIATIONS
            .iter()
            .filter_map(|(abbr, full)| {
                Regex::new(&format!(r"\b{}\b", regex::escape(abbr)))
                    .ok()
                    .map(|re| (re, *full))
            })
            .collect();

        Self {
            stopwords: STOPWORDS.iter().copied().collect(),
            abbreviations,
        }
    }

    /// Lowercase, expand abbreviations and strip punctuation.
    pub fn normalize(&self, text: &str) -> String {
        let text = text.trim();
        if text.is_empty() {
            return String::new();
        }

        let mut normalized = WHITESPACE.replace_all(text, " ").to_lowercase();

        for (pattern, full) in &self.abbreviations {
            normalized = pattern.replace_all(&normalized, *full).into_owned();
        }

        let normalized = NON_WORD.replace_all(&normalized, " ");
        WHITESPACE.replace_all(&normalized, " ").trim().to_string()
    }

    /// Words of the normalised text that are not stopwords and longer than two characters.
    pub fn extract_keywords(&self, text: &str) -> Vec<String> {
        self.normalize(text)
            .split_whitespace()
            .filter(|w| !self.stopwords.contains(w) && w.chars().count() > 2)
            .map(str::to_string)
            .collect()
    }

    /// Money-like numbers, first-seen order.
    pub fn extract_numbers(&self, text: &str) -> Vec<String> {
        collect_unique(NUMBER_PATTERNS.iter().flat_map(|re| {
            re.find_iter(text).map(|m| m.as_str().to_string())
        }))
    }

    /// Date-looking substrings.
    pub fn extract_dates(&self, text: &str) -> Vec<String> {
        collect_unique(DATE_PATTERNS.iter().flat_map(|re| {
            re.find_iter(text).map(|m| m.as_str().to_string())
        }))
    }

    /// Candidate invoice numbers, lowercased.
    pub fn extract_invoice_numbers(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        collect_unique(INVOICE_NUMBER_PATTERNS.iter().flat_map(|re| {
            re.captures_iter(&lower)
                .map(|caps| caps[1].to_string())
                .collect::<Vec<_>>()
        }))
    }

    /// 10 or 13 digit tax codes.
    pub fn extract_tax_codes(&self, text: &str) -> Vec<String> {
        collect_unique(TAX_CODE_PATTERNS.iter().flat_map(|re| {
            re.captures_iter(text)
                .map(|caps| caps[1].to_string())
                .filter(|code| code.len() == 10 || code.len() == 13)
                .collect::<Vec<_>>()
        }))
    }

    /// Parse an amount written in Vietnamese (`1.000.000,50`) or US
    /// (`1,000,000.50`) style. Returns zero when nothing parses.
    pub fn clean_amount(&self, amount: &str) -> Decimal {
        let cleaned = AMOUNT_CHARS.replace_all(amount, "").into_owned();

        let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
            (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
            (Some(_), Some(_)) => cleaned.replace(',', ""),
            (Some(_), None) => {
                let parts: Vec<&str> = cleaned.split(',').collect();
                if parts.len() == 2 && parts[1].len() <= 2 {
                    cleaned.replace(',', ".")
                } else {
                    cleaned.replace(',', "")
                }
            }
            (None, Some(_)) => {
                let parts: Vec<&str> = cleaned.split('.').collect();
                if parts.len() > 2 || parts.last().is_some_and(|p| p.len() == 3) {
                    cleaned.replace('.', "")
                } else {
                    cleaned
                }
            }
            (None, None) => cleaned,
        };

        Decimal::from_str(&normalized).unwrap_or(Decimal::ZERO)
    }

    /// Jaccard similarity of the keyword sets.
    pub fn similarity(&self, a: &str, b: &str) -> f32 {
        let words_a: HashSet<String> = self.extract_keywords(a).into_iter().collect();
        let words_b: HashSet<String> = self.extract_keywords(b).into_iter().collect();

        if words_a.is_empty() && words_b.is_empty() {
            return 1.0;
        }
        if words_a.is_empty() || words_b.is_empty() {
            return 0.0;
        }

        let intersection = words_a.intersection(&words_b).count();
        let union = words_a.union(&words_b).count();
        intersection as f32 / union as f32
    }

    /// Wrap case-insensitive keyword occurrences in `**`.
    pub fn highlight_keywords(&self, text: &str, keywords: &[&str]) -> String {
        let mut highlighted = text.to_string();
        for keyword in keywords.iter().filter(|k| !k.is_empty()) {
            if let Ok(re) = Regex::new(&format!("(?i){}", regex::escape(keyword))) {
                highlighted = re
                    .replace_all(&highlighted, format!("**{}**", keyword).as_str())
                    .into_owned();
            }
        }
        highlighted
    }
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_unique(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values.filter(|v| seen.insert(v.clone())).collect()
}
