//! Configuration structures for the hoadon pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for hoadon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HoadonConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Invoice extraction configuration.
    pub extraction: ExtractionConfig,

    /// Chatbot configuration.
    pub chat: ChatConfig,

    /// Background OCR job configuration.
    pub jobs: JobConfig,

    /// Flat-file storage locations.
    pub storage: StorageConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language string.
    pub language: String,

    /// Name or path of the tesseract binary.
    pub tesseract_bin: String,

    /// DPI used when rasterising PDF pages.
    pub pdf_dpi: u32,

    /// Maximum image dimension (longer side) handed to the engine.
    pub max_image_size: u32,

    /// Convert images to grayscale before OCR.
    pub grayscale: bool,

    /// Minimum embedded text length for a PDF to skip OCR.
    pub min_pdf_text_length: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "vie+eng".to_string(),
            tesseract_bin: "tesseract".to_string(),
            pdf_dpi: 300,
            max_image_size: 3000,
            grayscale: true,
            min_pdf_text_length: 50,
        }
    }
}

/// Invoice extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum confidence for an OCR result to be accepted.
    pub confidence_threshold: f32,

    /// Maximum number of line items taken from free text.
    pub max_line_items: usize,

    /// Currency used when none is detected.
    pub default_currency: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.8,
            max_line_items: 10,
            default_currency: "VND".to_string(),
        }
    }
}

/// Chatbot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Display name of the assistant.
    pub bot_name: String,

    /// Number of turns kept per user.
    pub history_limit: usize,

    /// Minimum Rasa confidence for its reply to be used directly.
    pub rasa_reply_threshold: f32,

    /// Rasa threshold inside the hybrid NLP decision rules.
    pub rasa_confidence_threshold: f32,

    /// BERT classifier threshold inside the hybrid NLP decision rules.
    pub bert_confidence_threshold: f32,

    /// Threshold above which an LLM answer replaces the current one.
    pub llm_confidence_threshold: f32,

    /// Maximum invoices listed in one chat reply.
    pub max_listed_invoices: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            bot_name: "HoaDon AI".to_string(),
            history_limit: 50,
            rasa_reply_threshold: 0.7,
            rasa_confidence_threshold: 0.6,
            bert_confidence_threshold: 0.7,
            llm_confidence_threshold: 0.8,
            max_listed_invoices: 10,
        }
    }
}

/// Background OCR job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Number of concurrent OCR workers.
    pub workers: usize,

    /// Bounded queue capacity.
    pub queue_capacity: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
        }
    }
}

/// Flat-file storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding saved invoices.
    pub invoices_path: PathBuf,

    /// JSON file holding invoice templates.
    pub templates_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            invoices_path: PathBuf::from("invoices.json"),
            templates_path: PathBuf::from("templates.json"),
        }
    }
}

impl HoadonConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Apply `HOADON_*` environment overrides.
    pub fn apply_env(mut self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok());
        self
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup("HOADON_BOT_NAME") {
            self.chat.bot_name = name;
        }
        if let Some(bin) = lookup("HOADON_TESSERACT") {
            self.ocr.tesseract_bin = bin;
        }
        if let Some(lang) = lookup("HOADON_OCR_LANG") {
            self.ocr.language = lang;
        }
        if let Some(path) = lookup("HOADON_STORE") {
            self.storage.invoices_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("HOADON_TEMPLATES") {
            self.storage.templates_path = PathBuf::from(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HoadonConfig::default();
        assert_eq!(config.ocr.language, "vie+eng");
        assert_eq!(config.chat.history_limit, 50);
        assert_eq!(config.extraction.default_currency, "VND");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: HoadonConfig =
            serde_json::from_str(r#"{"chat": {"bot_name": "Trợ lý"}}"#).unwrap();
        assert_eq!(config.chat.bot_name, "Trợ lý");
        assert_eq!(config.chat.history_limit, 50);
        assert_eq!(config.jobs.workers, 2);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = HoadonConfig::default();
        config.apply_vars(|key| match key {
            "HOADON_OCR_LANG" => Some("vie".to_string()),
            "HOADON_STORE" => Some("/tmp/hd.json".to_string()),
            _ => None,
        });
        assert_eq!(config.ocr.language, "vie");
        assert_eq!(config.storage.invoices_path, PathBuf::from("/tmp/hd.json"));
        assert_eq!(config.ocr.tesseract_bin, "tesseract");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = HoadonConfig::default();
        config.jobs.workers = 8;
        config.save(&path).unwrap();

        let loaded = HoadonConfig::from_file(&path).unwrap();
        assert_eq!(loaded.jobs.workers, 8);
    }
}
