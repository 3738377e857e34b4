//! # OCR Backend Module
//!
//! Image handles, the output contract shared by every OCR backend, and the
//! local recognition engine.
//!
//! Backends return an [`OcrOutput`]: the flat text, an optional overall
//! confidence, and optional structured blocks. When blocks are present the
//! receipt lines are rebuilt from them, one block per line.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ocr_config::OcrConfig;
use crate::ocr_errors::OcrError;

/// Opaque handle to a captured receipt image
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageHandle {
    path: Option<PathBuf>,
}

impl ImageHandle {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Handle without an image, for methods that never read one
    pub fn detached() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Check that the image exists, fits the size limit and has a supported
    /// format, returning the detected format
    pub fn validate(&self, config: &OcrConfig) -> Result<image::ImageFormat, OcrError> {
        let path = self
            .path()
            .ok_or_else(|| OcrError::Validation("no image file attached".to_string()))?;

        let metadata = std::fs::metadata(path).map_err(|e| {
            OcrError::Validation(format!("cannot access {}: {e}", path.display()))
        })?;
        if !metadata.is_file() {
            return Err(OcrError::Validation(format!(
                "{} is not a file",
                path.display()
            )));
        }
        if metadata.len() == 0 {
            return Err(OcrError::Validation(format!("{} is empty", path.display())));
        }
        if metadata.len() > config.max_file_size {
            return Err(OcrError::Validation(format!(
                "{} is {} bytes, limit is {} bytes",
                path.display(),
                metadata.len(),
                config.max_file_size
            )));
        }

        let format = detect_image_format(path, config)?;
        debug!("Validated image {} as {:?}", path.display(), format);
        Ok(format)
    }

    /// Read the whole image file
    pub fn read_bytes(&self) -> Result<Vec<u8>, OcrError> {
        let path = self
            .path()
            .ok_or_else(|| OcrError::ImageLoad("no image file attached".to_string()))?;
        std::fs::read(path)
            .map_err(|e| OcrError::ImageLoad(format!("cannot read {}: {e}", path.display())))
    }
}

/// Detect the image format from the file's leading bytes
///
/// Only formats the OCR backends accept are returned: PNG, JPEG, BMP, TIFF
/// and WebP.
pub fn detect_image_format(path: &Path, config: &OcrConfig) -> Result<image::ImageFormat, OcrError> {
    let file = File::open(path)
        .map_err(|e| OcrError::Validation(format!("cannot open {}: {e}", path.display())))?;
    let mut reader = BufReader::new(file);
    let mut buffer = vec![0; config.buffer_size];

    let bytes_read = reader
        .read(&mut buffer)
        .map_err(|e| OcrError::Validation(format!("cannot read {}: {e}", path.display())))?;
    if bytes_read < config.min_format_bytes {
        return Err(OcrError::Validation(format!(
            "read {bytes_read} bytes from {}, need at least {} to detect the format",
            path.display(),
            config.min_format_bytes
        )));
    }
    buffer.truncate(bytes_read);

    let format = image::guess_format(&buffer)
        .map_err(|e| OcrError::Validation(format!("unknown image format: {e}")))?;

    if matches!(
        format,
        image::ImageFormat::Png
            | image::ImageFormat::Jpeg
            | image::ImageFormat::Bmp
            | image::ImageFormat::Tiff
            | image::ImageFormat::WebP
    ) {
        Ok(format)
    } else {
        Err(OcrError::Validation(format!(
            "unsupported image format {format:?}"
        )))
    }
}

/// Position of a text block in the image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Structured text block reported by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub confidence: Option<f32>,
    pub frame: Option<Frame>,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
            frame: None,
        }
    }
}

/// Text recognized by a backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OcrOutput {
    pub text: String,
    /// Backend-reported confidence in `[0, 1]`
    pub confidence: Option<f32>,
    pub blocks: Vec<TextBlock>,
}

impl OcrOutput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Receipt lines: one per block when blocks are present, else the text
    /// split on newlines
    ///
    /// # Examples
    ///
    /// ```rust
    /// use receipt_ingredients::ocr::{OcrOutput, TextBlock};
    ///
    /// let flat = OcrOutput::from_text("Milk $3.49\nBread $2.79");
    /// assert_eq!(flat.lines(), vec!["Milk $3.49", "Bread $2.79"]);
    ///
    /// let structured = OcrOutput {
    ///     text: "Milk $3.49 Bread $2.79".to_string(),
    ///     confidence: Some(0.93),
    ///     blocks: vec![TextBlock::new("Milk $3.49"), TextBlock::new("Bread $2.79")],
    /// };
    /// assert_eq!(structured.lines(), vec!["Milk $3.49", "Bread $2.79"]);
    /// ```
    pub fn lines(&self) -> Vec<String> {
        if self.blocks.is_empty() {
            self.text.lines().map(str::to_string).collect()
        } else {
            self.blocks.iter().map(|block| block.text.clone()).collect()
        }
    }
}

/// Synchronous text recognizer, run off the async runtime
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &ImageHandle) -> Result<OcrOutput, OcrError>;
}

/// Tesseract-backed local engine
#[cfg(feature = "tesseract")]
pub struct TesseractEngine {
    languages: String,
}

#[cfg(feature = "tesseract")]
impl TesseractEngine {
    pub fn new(languages: impl Into<String>) -> Self {
        Self {
            languages: languages.into(),
        }
    }
}

#[cfg(feature = "tesseract")]
impl TextRecognizer for TesseractEngine {
    fn recognize(&self, image: &ImageHandle) -> Result<OcrOutput, OcrError> {
        let path = image
            .path()
            .ok_or_else(|| OcrError::ImageLoad("no image file attached".to_string()))?;
        log::info!("Starting Tesseract recognition of {}", path.display());

        let mut tess = leptess::LepTess::new(None, &self.languages)
            .map_err(|e| OcrError::Initialization(format!("Failed to initialize Tesseract: {e}")))?;
        tess.set_image(path)
            .map_err(|e| OcrError::ImageLoad(format!("Failed to load image: {e}")))?;
        let text = tess
            .get_utf8_text()
            .map_err(|e| OcrError::Extraction(format!("Failed to extract text: {e}")))?;

        let confidence = tess.mean_text_conf();
        let cleaned = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<&str>>()
            .join("\n");

        log::info!(
            "Tesseract extracted {} characters (mean confidence {})",
            cleaned.len(),
            confidence
        );

        Ok(OcrOutput {
            text: cleaned,
            confidence: (confidence >= 0).then(|| (confidence as f32 / 100.0).min(1.0)),
            blocks: Vec::new(),
        })
    }
}

/// Stand-in local engine for builds without the `tesseract` feature
pub struct UnavailableEngine;

impl TextRecognizer for UnavailableEngine {
    fn recognize(&self, _image: &ImageHandle) -> Result<OcrOutput, OcrError> {
        Err(OcrError::Initialization(
            "local OCR engine not compiled in (enable the `tesseract` feature)".to_string(),
        ))
    }
}

/// Local engine for this build
#[cfg(feature = "tesseract")]
pub fn default_local_engine(config: &OcrConfig) -> Arc<dyn TextRecognizer> {
    Arc::new(TesseractEngine::new(config.languages.clone()))
}

/// Local engine for this build
#[cfg(not(feature = "tesseract"))]
pub fn default_local_engine(config: &OcrConfig) -> Arc<dyn TextRecognizer> {
    debug!(
        "Tesseract support disabled; local engine for '{}' is unavailable",
        config.languages
    );
    Arc::new(UnavailableEngine)
}
