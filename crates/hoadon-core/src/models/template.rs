//! Invoice template model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source document format a template was designed for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    Word,
    #[default]
    Pdf,
    Excel,
}

impl TemplateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Word => "word",
            TemplateType::Pdf => "pdf",
            TemplateType::Excel => "excel",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "word" | "docx" | "doc" => Some(TemplateType::Word),
            "pdf" => Some(TemplateType::Pdf),
            "excel" | "xlsx" | "xls" => Some(TemplateType::Excel),
            _ => None,
        }
    }
}

/// Value type of a mapped field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Decimal,
    Date,
}

/// How a single template field is typed and whether it must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    pub fn new(field_type: FieldType, required: bool) -> Self {
        Self { field_type, required }
    }
}

/// A named set of field mappings used to guide extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTemplate {
    #[serde(default)]
    pub id: u64,

    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default)]
    pub template_type: TemplateType,

    /// Field name to spec, e.g. `total_amount -> decimal, required`.
    #[serde(default)]
    pub field_mappings: BTreeMap<String, FieldSpec>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvoiceTemplate {
    pub fn new(name: impl Into<String>, template_type: TemplateType) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: name.into(),
            description: String::new(),
            template_type,
            field_mappings: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: add a field mapping.
    pub fn with_field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.field_mappings.insert(name.into(), spec);
        self
    }

    /// Builder: set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Names of the fields marked required.
    pub fn required_fields(&self) -> Vec<&str> {
        self.field_mappings
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_spec_json_shape() {
        let spec: FieldSpec = serde_json::from_str(r#"{"type": "decimal", "required": true}"#).unwrap();
        assert_eq!(spec, FieldSpec::new(FieldType::Decimal, true));

        let spec: FieldSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec.field_type, FieldType::String);
        assert!(!spec.required);
    }

    #[test]
    fn test_required_fields() {
        let template = InvoiceTemplate::new("VAT", TemplateType::Pdf)
            .with_field("invoice_number", FieldSpec::new(FieldType::String, true))
            .with_field("total_amount", FieldSpec::new(FieldType::Decimal, true))
            .with_field("customer_name", FieldSpec::new(FieldType::String, false));

        assert_eq!(template.required_fields(), vec!["invoice_number", "total_amount"]);
    }

    #[test]
    fn test_template_type_parsing() {
        assert_eq!(TemplateType::from_str("XLSX"), Some(TemplateType::Excel));
        assert_eq!(TemplateType::from_str("docx"), Some(TemplateType::Word));
        assert_eq!(TemplateType::from_str("png"), None);
    }
}
