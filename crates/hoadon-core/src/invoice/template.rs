//! Template-guided extraction and the flat-file template store.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::rules::{
    amounts::parse_vnd_amount, dates::parse_date, first_capture, items::extract_line_items,
};
use crate::error::{Result, StoreError};
use crate::models::template::{FieldSpec, FieldType, InvoiceTemplate};
use std::collections::BTreeMap;

/// Extracted field values keyed by field name.
pub type StructuredData = Map<String, Value>;

const DEFAULT_REQUIRED: &[&str] = &["invoice_number", "company_name", "total_amount"];
const OPTIONAL_FIELDS: &[&str] = &["customer_name", "invoice_date", "items", "company_address"];
const MAX_TEMPLATE_ITEMS: usize = 10;

lazy_static! {
    static ref FIELD_PATTERNS: Vec<(&'static str, Vec<Regex>)> = vec![
        ("invoice_number", vec![
            Regex::new(r"(?i)(?:số\s+hóa\s+đơn|invoice\s+no|invoice\s+number)[:\s]+([A-Z0-9\-/]+)").unwrap(),
            Regex::new(r"(?i)(?:HD|INV)[:\s]*([A-Z0-9\-/]+)").unwrap(),
            Regex::new(r"(\d{4,})").unwrap(),
        ]),
        ("company_name", vec![
            Regex::new(r"(?i)(?:công\s+ty|company)[:\s]*([^\n]+)").unwrap(),
            Regex::new(r"(?m)^\s*([A-ZÀÁÂÃÈÉÊÌÍÒÓÔÕÙÚĂĐĨŨƠƯ][^\n]{10,})").unwrap(),
        ]),
        ("customer_name", vec![
            Regex::new(r"(?i)(?:khách\s+hàng|customer|đơn\s+vị)[:\s]*([^\n]+)").unwrap(),
            Regex::new(r"(?i)(?:tên|name)[:\s]*([^\n]+)").unwrap(),
        ]),
        ("total_amount", vec![
            Regex::new(r"(?i)(?:tổng\s+cộng|total|thành\s+tiền)[:\s]*([0-9][0-9,.\s]*[0-9])").unwrap(),
            Regex::new(r"(?i)([0-9][0-9,]*\.?\d*)\s*(?:VND|đ|VNĐ)").unwrap(),
        ]),
        ("invoice_date", vec![
            Regex::new(r"(?i)(?:ngày|date)[:\s]*(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})").unwrap(),
            Regex::new(r"(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})").unwrap(),
        ]),
        ("tax_amount", vec![
            Regex::new(r"(?i)(?:VAT|thuế)[:\s]*([0-9][0-9,.\s]*[0-9])").unwrap(),
        ]),
        ("company_tax_id", vec![
            Regex::new(r"(?i)(?:MST|tax\s+id)[:\s]*([0-9\-]+)").unwrap(),
        ]),
    ];

    static ref GENERIC_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("invoice_number", Regex::new(r"(?i)(?:Invoice|INV|HD)[:\s#]*([A-Z0-9\-/]+)").unwrap()),
        ("total_amount", Regex::new(r"(?i)([0-9][0-9,]*\.?\d*)\s*(?:VND|đ|VNĐ|USD|\$)").unwrap()),
        ("invoice_date", Regex::new(r"(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})").unwrap()),
    ];
}

/// Extract the fields a template maps, then type-convert them.
pub fn extract_with_template(text: &str, template: &InvoiceTemplate) -> StructuredData {
    let mut data = StructuredData::new();

    for (field, patterns) in FIELD_PATTERNS.iter() {
        if !template.field_mappings.contains_key(*field) {
            continue;
        }
        if let Some(value) = first_capture(patterns, text) {
            data.insert(field.to_string(), Value::String(value));
        }
    }

    insert_items(text, &mut data);

    debug!(
        "Template '{}' matched {} of {} fields",
        template.name,
        data.len(),
        template.field_mappings.len()
    );

    validate_and_format(&data, &template.field_mappings)
}

/// Basic extraction when no template is selected.
pub fn extract_generic(text: &str) -> StructuredData {
    let mut data = StructuredData::new();

    for (field, pattern) in GENERIC_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            let value = caps[1].trim();
            if !value.is_empty() {
                data.insert(field.to_string(), Value::String(value.to_string()));
            }
        }
    }

    insert_items(text, &mut data);
    data
}

fn insert_items(text: &str, data: &mut StructuredData) {
    let items = extract_line_items(text, MAX_TEMPLATE_ITEMS);
    if items.is_empty() {
        return;
    }
    if let Ok(value) = serde_json::to_value(items) {
        data.insert("items".to_string(), value);
    }
}

/// Convert mapped fields to their declared types. Values that fail to
/// convert are kept as extracted.
pub fn validate_and_format(
    data: &StructuredData,
    mappings: &BTreeMap<String, FieldSpec>,
) -> StructuredData {
    let mut formatted = StructuredData::new();

    for (name, spec) in mappings {
        let Some(value) = data.get(name) else {
            continue;
        };

        let converted = match (spec.field_type, value.as_str()) {
            (FieldType::Decimal, Some(s)) if !s.is_empty() => {
                let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
                parse_vnd_amount(&cleaned)
                    .and_then(|d| d.to_f64())
                    .map(|f| json!(f))
            }
            (FieldType::Date, Some(s)) if !s.is_empty() => {
                parse_date(s).map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            }
            (FieldType::String, Some(s)) if !s.is_empty() => Some(Value::String(s.trim().to_string())),
            _ => None,
        };

        formatted.insert(name.clone(), converted.unwrap_or_else(|| value.clone()));
    }

    if let Some(items) = data.get("items") {
        formatted.insert("items".to_string(), items.clone());
    }

    formatted
}

/// Score extracted data against required and optional fields (0.0 - 1.0).
pub fn calculate_confidence(data: &StructuredData, template: Option<&InvoiceTemplate>) -> f32 {
    if data.is_empty() {
        return 0.0;
    }

    let template_required = template.map(|t| t.required_fields()).unwrap_or_default();
    let required: Vec<&str> = if template_required.is_empty() {
        DEFAULT_REQUIRED.to_vec()
    } else {
        template_required
    };

    let mut score = 0.0f64;
    let mut total = 0.0f64;

    for field in &required {
        total += 1.0;
        if data.get(*field).is_some_and(is_truthy) {
            score += 1.0;
        }
    }

    for field in OPTIONAL_FIELDS {
        if data.get(*field).is_some_and(is_truthy) {
            score += 0.2;
            total += 0.2;
        }
    }

    for value in data.values() {
        let too_short = value.as_str().is_some_and(|s| s.trim().chars().count() < 2);
        if !is_truthy(value) || too_short {
            score -= 0.1;
        }
    }

    if total <= 0.0 {
        return 0.0;
    }

    let confidence = (score / total).clamp(0.0, 1.0);
    ((confidence * 100.0).round() / 100.0) as f32
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Invoice templates persisted as a JSON array.
#[derive(Debug, Default)]
pub struct TemplateStore {
    path: Option<PathBuf>,
    templates: Vec<InvoiceTemplate>,
}

impl TemplateStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let templates = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };

        info!("Loaded {} templates from {}", templates.len(), path.display());

        Ok(Self {
            path: Some(path),
            templates,
        })
    }

    pub fn list(&self) -> &[InvoiceTemplate] {
        &self.templates
    }

    pub fn get(&self, id: u64) -> Option<&InvoiceTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Find a template by case-insensitive name.
    pub fn find_by_name(&self, name: &str) -> Option<&InvoiceTemplate> {
        let name = name.to_lowercase();
        self.templates.iter().find(|t| t.name.to_lowercase() == name)
    }

    /// Add a template, assigning the next id.
    pub fn add(&mut self, mut template: InvoiceTemplate) -> Result<u64> {
        if template.name.trim().is_empty() {
            return Err(StoreError::Invalid("template name is empty".to_string()).into());
        }

        template.id = self.templates.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let id = template.id;
        let mut templates = self.templates.clone();
        templates.push(template);
        self.commit(templates)?;
        Ok(id)
    }

    /// Replace an existing template.
    pub fn update(&mut self, mut template: InvoiceTemplate) -> Result<()> {
        let mut templates = self.templates.clone();
        let slot = templates
            .iter_mut()
            .find(|t| t.id == template.id)
            .ok_or_else(|| StoreError::NotFound(format!("template {}", template.id)))?;

        template.created_at = slot.created_at;
        template.updated_at = Utc::now();
        *slot = template;
        self.commit(templates)
    }

    /// Remove a template by id.
    pub fn remove(&mut self, id: u64) -> Result<InvoiceTemplate> {
        let mut templates = self.templates.clone();
        let idx = templates
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("template {}", id)))?;

        let removed = templates.remove(idx);
        self.commit(templates)?;
        Ok(removed)
    }

    /// Persist `templates`, replacing the in-memory list only once the write succeeds.
    fn commit(&mut self, templates: Vec<InvoiceTemplate>) -> Result<()> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let content = serde_json::to_string_pretty(&templates)?;
            std::fs::write(path, content)
                .map_err(|e| StoreError::Persistence(format!("{}: {}", path.display(), e)))?;
        }
        self.templates = templates;
        Ok(())
    }
}

impl FromStr for TemplateStore {
    type Err = crate::error::HoadonError;

    /// Parse a store from JSON without a backing file.
    fn from_str(s: &str) -> Result<Self> {
        Ok(Self {
            path: None,
            templates: serde_json::from_str(s)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::template::TemplateType;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"CÔNG TY CỔ PHẦN THỰC PHẨM SAO MAI
Số hóa đơn: HD-2024/015
Ngày: 05/01/2024
Khách hàng: Nguyễn Văn An
MST: 0101234567
Cà phê sữa 2 25.000 50.000
Thuế: 5.000
Tổng cộng: 55.000 VNĐ
"#;

    fn vat_template() -> InvoiceTemplate {
        InvoiceTemplate::new("VAT", TemplateType::Pdf)
            .with_field("invoice_number", FieldSpec::new(FieldType::String, true))
            .with_field("total_amount", FieldSpec::new(FieldType::Decimal, true))
            .with_field("invoice_date", FieldSpec::new(FieldType::Date, false))
            .with_field("customer_name", FieldSpec::new(FieldType::String, false))
            .with_field("company_tax_id", FieldSpec::new(FieldType::String, false))
    }

    #[test]
    fn test_extract_with_template() {
        let data = extract_with_template(SAMPLE, &vat_template());

        assert_eq!(data["invoice_number"], json!("HD-2024/015"));
        assert_eq!(data["total_amount"], json!(55000.0));
        assert_eq!(data["invoice_date"], json!("2024-01-05"));
        assert_eq!(data["customer_name"], json!("Nguyễn Văn An"));
        assert_eq!(data["company_tax_id"], json!("0101234567"));
        assert!(data.contains_key("items"));
        // Not mapped by the template.
        assert!(!data.contains_key("tax_amount"));
    }

    #[test]
    fn test_unparseable_values_kept() {
        let mut data = StructuredData::new();
        data.insert("invoice_date".to_string(), json!("sometime"));
        data.insert("total_amount".to_string(), json!("n/a"));

        let formatted = validate_and_format(&data, &vat_template().field_mappings);
        assert_eq!(formatted["invoice_date"], json!("sometime"));
        assert_eq!(formatted["total_amount"], json!("n/a"));
    }

    #[test]
    fn test_extract_generic() {
        let data = extract_generic("Invoice: INV-889\nNgày 12/03/2024\nTổng 1,250,000 VND");
        assert_eq!(data["invoice_number"], json!("INV-889"));
        assert_eq!(data["total_amount"], json!("1,250,000"));
        assert_eq!(data["invoice_date"], json!("12/03/2024"));
    }

    #[test]
    fn test_calculate_confidence_defaults() {
        assert_eq!(calculate_confidence(&StructuredData::new(), None), 0.0);

        let mut data = StructuredData::new();
        data.insert("invoice_number".to_string(), json!("0001234"));
        data.insert("total_amount".to_string(), json!(121000.0));
        assert_eq!(calculate_confidence(&data, None), 0.67);

        data.insert("company_name".to_string(), json!("Công ty ABC"));
        assert_eq!(calculate_confidence(&data, None), 1.0);
    }

    #[test]
    fn test_calculate_confidence_with_template_and_penalty() {
        let template = vat_template();
        let mut data = StructuredData::new();
        data.insert("invoice_number".to_string(), json!("HD1"));
        data.insert("customer_name".to_string(), json!("A"));

        // required: invoice_number (1/1), total_amount (0/1); optional customer_name +0.2;
        // penalty 0.1 for the one-character name: (1.2 - 0.1) / 2.2 = 0.5
        assert_eq!(calculate_confidence(&data, Some(&template)), 0.5);
    }

    #[test]
    fn test_template_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");

        let mut store = TemplateStore::open(&path).unwrap();
        let first = store.add(vat_template()).unwrap();
        let second = store
            .add(InvoiceTemplate::new("Bán lẻ", TemplateType::Excel))
            .unwrap();
        assert_eq!((first, second), (1, 2));

        let reopened = TemplateStore::open(&path).unwrap();
        assert_eq!(reopened.list().len(), 2);
        assert_eq!(reopened.find_by_name("bán lẻ").map(|t| t.id), Some(2));

        let mut store = reopened;
        store.remove(1).unwrap();
        assert!(store.get(1).is_none());
        assert!(store.remove(1).is_err());
        assert_eq!(store.add(vat_template()).unwrap(), 3);
    }

    #[test]
    fn test_failed_write_keeps_templates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");
        let mut store = TemplateStore::open(&path).unwrap();
        let id = store.add(vat_template()).unwrap();

        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(store.add(InvoiceTemplate::new("Bán lẻ", TemplateType::Excel)).is_err());
        assert_eq!(store.list().len(), 1);
        assert!(store.find_by_name("bán lẻ").is_none());

        let mut renamed = vat_template();
        renamed.id = id;
        renamed.name = "Đổi tên".to_string();
        assert!(store.update(renamed).is_err());
        assert_eq!(store.get(id).map(|t| t.name.as_str()), Some(vat_template().name.as_str()));

        assert!(store.remove(id).is_err());
        assert!(store.get(id).is_some());
    }

    #[test]
    fn test_add_rejects_empty_name() {
        let mut store = TemplateStore::in_memory();
        assert!(store.add(InvoiceTemplate::new("  ", TemplateType::Pdf)).is_err());
    }
}
