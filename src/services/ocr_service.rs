use std::path::Path;

use tracing::{debug, info};

use crate::error::AppError;
use crate::models::extraction::Extraction;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];
const DEFAULT_LANGUAGE: &str = "eng";

pub fn is_image_candidate(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reads text out of an image. Never fails outright; problems are reported as
/// `Extraction::Unavailable` or `Extraction::Failed`.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, image_path: &Path) -> Extraction;
}

pub struct NullExtractor {
    reason: String,
}

impl NullExtractor {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl TextExtractor for NullExtractor {
    fn extract(&self, _image_path: &Path) -> Extraction {
        Extraction::Unavailable(self.reason.clone())
    }
}

/// Tesseract through `leptess`. A fresh engine is created per call so the
/// extractor stays `Send + Sync`.
pub struct TesseractExtractor {
    language: String,
}

impl TesseractExtractor {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    /// Fails when the engine or its language data cannot be loaded.
    pub fn probe(&self) -> Result<(), AppError> {
        leptess::LepTess::new(None, &self.language)
            .map(|_| ())
            .map_err(|e| AppError::Ocr(format!("init failed: {e}")))
    }

    fn recognize(&self, image_path: &Path) -> Result<(String, i32), AppError> {
        let mut lt = leptess::LepTess::new(None, &self.language)
            .map_err(|e| AppError::Ocr(format!("init failed: {e}")))?;
        lt.set_image(image_path)
            .map_err(|e| AppError::Ocr(format!("set_image failed: {e}")))?;
        let text = lt
            .get_utf8_text()
            .map_err(|e| AppError::Ocr(format!("get_utf8_text failed: {e}")))?;
        Ok((text, lt.mean_text_conf()))
    }
}

impl TextExtractor for TesseractExtractor {
    fn extract(&self, image_path: &Path) -> Extraction {
        if let Err(e) = image::image_dimensions(image_path) {
            return Extraction::Failed(format!("unreadable image: {e}"));
        }

        match self.recognize(image_path) {
            Ok((text, mean_conf)) => recognized(&text, mean_conf),
            Err(e) => Extraction::Failed(e.to_string()),
        }
    }
}

/// Trims engine output and scales its 0..=100 mean confidence to 0.0..=1.0.
/// Blank output carries no confidence.
fn recognized(raw: &str, mean_conf: i32) -> Extraction {
    let text = raw.trim().to_string();
    let confidence = if text.is_empty() || mean_conf < 0 {
        None
    } else {
        Some((f64::from(mean_conf) / 100.0).clamp(0.0, 1.0))
    };
    Extraction::Text { text, confidence }
}

/// Uses tesseract when its engine initialises, otherwise a null extractor.
pub fn detect_extractor() -> Box<dyn TextExtractor> {
    let tesseract = TesseractExtractor::new(DEFAULT_LANGUAGE);
    match tesseract.probe() {
        Ok(()) => {
            info!("OCR enabled (tesseract, {DEFAULT_LANGUAGE})");
            Box::new(tesseract)
        }
        Err(e) => {
            debug!("OCR disabled: {e}");
            Box::new(NullExtractor::new(format!("tesseract unavailable: {e}")))
        }
    }
}
