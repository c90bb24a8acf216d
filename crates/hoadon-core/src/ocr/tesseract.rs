//! Tesseract OCR backend driven through the command line.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use tempfile::TempDir;
use tracing::debug;

use super::{OcrBackend, OcrResult, Result};
use crate::error::OcrError;
use crate::models::config::OcrConfig;

/// Tesseract OCR backend.
pub struct TesseractBackend {
    binary: String,
    language: String,
    dpi: u32,
}

impl TesseractBackend {
    /// Create a backend using `tesseract` from PATH with Vietnamese and English models.
    pub fn new() -> Self {
        Self::from_config(&OcrConfig::default())
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            binary: config.tesseract_bin.clone(),
            language: config.language.clone(),
            dpi: config.pdf_dpi,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    fn run_tesseract(&self, image_path: &Path) -> Result<String> {
        debug!("Running {} on {}", self.binary, image_path.display());

        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::Failed(format!("tesseract failed: {}", stderr.trim())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                OcrError::BackendNotAvailable(format!("{} not found (install tesseract-ocr)", self.binary)),
            ),
            Err(e) => Err(OcrError::Io(e)),
        }
    }

    fn pdf_page_to_image(&self, pdf_path: &Path, page: u32, output_dir: &Path) -> Result<PathBuf> {
        let page_str = page.to_string();
        let dpi = self.dpi.to_string();
        let output_prefix = output_dir.join("page");

        let status = Command::new("pdftoppm")
            .args(["-png", "-r", &dpi, "-f", &page_str, "-l", &page_str])
            .arg(pdf_path)
            .arg(&output_prefix)
            .status();

        match status {
            Ok(s) if s.success() => find_page_image(output_dir, page)
                .ok_or_else(|| OcrError::Failed(format!("no image generated for page {}", page))),
            Ok(_) => Err(OcrError::Failed("pdftoppm failed to convert PDF page".to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                OcrError::BackendNotAvailable("pdftoppm not found (install poppler-utils)".to_string()),
            ),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for TesseractBackend {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        check_binary(&self.binary)
    }

    fn ocr_image(&self, image_path: &Path) -> Result<OcrResult> {
        let start = Instant::now();
        let text = self.run_tesseract(image_path)?;

        Ok(OcrResult {
            text,
            confidence: None,
            backend: self.name().to_string(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn ocr_pdf_page(&self, pdf_path: &Path, page: u32) -> Result<OcrResult> {
        let start = Instant::now();

        let temp_dir = TempDir::new()?;
        let image_path = self.pdf_page_to_image(pdf_path, page, temp_dir.path())?;
        let text = self.run_tesseract(&image_path)?;

        Ok(OcrResult {
            text,
            confidence: None,
            backend: self.name().to_string(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// pdftoppm pads page numbers to the width of the page count.
fn find_page_image(dir: &Path, page: u32) -> Option<PathBuf> {
    [2, 3, 4]
        .into_iter()
        .map(|width| dir.join(format!("page-{:0width$}.png", page, width = width)))
        .chain(std::iter::once(dir.join(format!("page-{}.png", page))))
        .find(|p| p.exists())
}

/// Whether a binary is on PATH.
pub fn check_binary(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_page_image() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_page_image(dir.path(), 1).is_none());

        std::fs::write(dir.path().join("page-007.png"), b"").unwrap();
        assert_eq!(
            find_page_image(dir.path(), 7),
            Some(dir.path().join("page-007.png"))
        );
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let config = OcrConfig {
            tesseract_bin: "hoadon-no-such-tesseract".to_string(),
            ..OcrConfig::default()
        };
        let backend = TesseractBackend::from_config(&config);
        assert!(!backend.is_available());

        let err = backend.ocr_image(Path::new("missing.png")).unwrap_err();
        assert!(matches!(err, OcrError::BackendNotAvailable(_)));
    }
}
