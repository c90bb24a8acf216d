//! Image preprocessing before OCR.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};
use tempfile::TempDir;
use tracing::debug;

use super::Result;
use crate::error::OcrError;
use crate::models::config::OcrConfig;

/// An image written to a temporary PNG, deleted on drop.
pub struct PreparedImage {
    path: PathBuf,
    _dir: TempDir,
}

impl PreparedImage {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Grayscale conversion and downscaling for the OCR engine.
pub struct ImagePreprocessor {
    /// Maximum image dimension.
    max_size: u32,
    /// Convert to 8-bit grayscale.
    grayscale: bool,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self::from_config(&OcrConfig::default())
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            max_size: config.max_image_size,
            grayscale: config.grayscale,
        }
    }

    /// Set maximum image dimension.
    pub fn with_max_size(mut self, size: u32) -> Self {
        self.max_size = size;
        self
    }

    pub fn with_grayscale(mut self, grayscale: bool) -> Self {
        self.grayscale = grayscale;
        self
    }

    /// Apply grayscale and resize to an in-memory image.
    pub fn process(&self, image: DynamicImage) -> DynamicImage {
        let (width, height) = image.dimensions();
        let (new_width, new_height) = self.calculate_resize_dimensions(width, height);

        let image = if (new_width, new_height) != (width, height) {
            debug!("Resizing {}x{} -> {}x{}", width, height, new_width, new_height);
            image.resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3)
        } else {
            image
        };

        if self.grayscale {
            DynamicImage::ImageLuma8(image.to_luma8())
        } else {
            image
        }
    }

    /// Load an image file, process it and write the result to a temp PNG.
    pub fn prepare(&self, path: &Path) -> Result<PreparedImage> {
        let image = image::open(path)
            .map_err(|e| OcrError::Preprocessing(format!("{}: {}", path.display(), e)))?;
        let processed = self.process(image);

        let dir = TempDir::new()?;
        let out = dir.path().join("prepared.png");
        processed
            .save_with_format(&out, image::ImageFormat::Png)
            .map_err(|e| OcrError::Preprocessing(e.to_string()))?;

        Ok(PreparedImage {
            path: out,
            _dir: dir,
        })
    }

    fn calculate_resize_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let max_dim = width.max(height);

        if max_dim <= self.max_size {
            return (width, height);
        }

        let scale = self.max_size as f32 / max_dim as f32;
        let new_width = (width as f32 * scale) as u32;
        let new_height = (height as f32 * scale) as u32;

        (new_width.max(1), new_height.max(1))
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_resize_dimensions() {
        let preprocessor = ImagePreprocessor::new().with_max_size(1000);

        assert_eq!(preprocessor.calculate_resize_dimensions(500, 300), (500, 300));

        let (w, h) = preprocessor.calculate_resize_dimensions(4000, 2000);
        assert_eq!(w, 1000);
        assert_eq!(h, 500);
    }

    #[test]
    fn test_prepare_writes_grayscale_png() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("receipt.png");
        RgbImage::from_pixel(40, 20, Rgb([200, 10, 10])).save(&src).unwrap();

        let prepared = ImagePreprocessor::new().with_max_size(20).prepare(&src).unwrap();
        let out = image::open(prepared.path()).unwrap();
        assert_eq!(out.dimensions(), (20, 10));
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_prepare_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("fake.png");
        std::fs::write(&src, b"not an image").unwrap();

        let err = ImagePreprocessor::new().prepare(&src).err().unwrap();
        assert!(matches!(err, OcrError::Preprocessing(_)));
    }
}
