//! # OCR Configuration Module
//!
//! This module defines the OCR method selection, per-backend base confidences,
//! image limits and cloud credentials used by the acquisition policy.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ocr_errors::OcrError;

// Constants for OCR configuration
pub const DEFAULT_LANGUAGES: &str = "eng";
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const FORMAT_DETECTION_BUFFER_SIZE: usize = 32;
pub const MIN_FORMAT_BYTES: usize = 8;
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB limit for image files
pub const MIN_API_KEY_LEN: usize = 20;

// Base confidence attached to text from each backend
pub const CLOUD_VISION_CONFIDENCE: f32 = 0.9;
pub const LOCAL_ENGINE_CONFIDENCE: f32 = 0.7;
pub const FIXED_SAMPLE_CONFIDENCE: f32 = 0.6;
pub const DETERMINISTIC_STUB_CONFIDENCE: f32 = 0.85;

// Environment variables read by `OcrConfig::from_env`
pub const ENV_METHOD: &str = "OCR_METHOD";
pub const ENV_API_KEY: &str = "VISION_API_KEY";
pub const ENV_ENDPOINT: &str = "VISION_ENDPOINT";
pub const ENV_LANGUAGES: &str = "OCR_LANGUAGES";
pub const ENV_TIMEOUT_SECS: &str = "OCR_TIMEOUT_SECS";
pub const ENV_CLOUD_FALLBACK: &str = "OCR_CLOUD_FALLBACK";

const PLACEHOLDER_KEYS: &[&str] = &["your_api_key", "your-api-key", "changeme", "placeholder", "xxx"];

/// OCR backend selected for a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OcrMethod {
    CloudVision,
    LocalEngine,
    /// Bypasses OCR and returns the canonical test receipt
    DeterministicStub,
    /// Fixed sample receipt, also the target of every fallback hop
    FixedSample,
}

impl OcrMethod {
    pub const ALL: [OcrMethod; 4] = [
        OcrMethod::CloudVision,
        OcrMethod::LocalEngine,
        OcrMethod::DeterministicStub,
        OcrMethod::FixedSample,
    ];

    /// Configuration string of the method
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrMethod::CloudVision => "cloud-vision",
            OcrMethod::LocalEngine => "local-engine",
            OcrMethod::DeterministicStub => "deterministic-stub",
            OcrMethod::FixedSample => "fixed-sample",
        }
    }

    /// Base confidence attached to text produced by this method
    pub fn base_confidence(&self) -> f32 {
        match self {
            OcrMethod::CloudVision => CLOUD_VISION_CONFIDENCE,
            OcrMethod::LocalEngine => LOCAL_ENGINE_CONFIDENCE,
            OcrMethod::DeterministicStub => DETERMINISTIC_STUB_CONFIDENCE,
            OcrMethod::FixedSample => FIXED_SAMPLE_CONFIDENCE,
        }
    }
}

impl fmt::Display for OcrMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OcrMethod {
    type Err = ConfigError;

    /// Parse a method string; unknown values are an error, never a default
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        OcrMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnknownMethod(s.to_string()))
    }
}

/// Fatal configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// OCR method string is not one of the recognized methods
    UnknownMethod(String),
    /// Environment value could not be parsed
    InvalidValue { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownMethod(method) => write!(
                f,
                "Configuration error: unknown OCR method '{method}' (expected cloud-vision, local-engine, deterministic-stub or fixed-sample)"
            ),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Configuration error: invalid value '{value}' for {key}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration structure for OCR acquisition
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Primary OCR method
    pub method: OcrMethod,
    /// Cloud vision API key
    pub api_key: Option<String>,
    /// Cloud vision annotate endpoint
    pub endpoint: String,
    /// Local engine language codes (e.g., "eng", "eng+fra")
    pub languages: String,
    /// Timeout for a single backend call in seconds
    pub timeout_secs: u64,
    /// Maximum allowed image size in bytes
    pub max_file_size: u64,
    /// Buffer size for format detection in bytes
    pub buffer_size: usize,
    /// Minimum bytes required for format detection
    pub min_format_bytes: usize,
    /// Recover from a failed cloud call with the fixed sample instead of
    /// returning the error
    pub cloud_failure_fallback: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            method: OcrMethod::DeterministicStub,
            api_key: None,
            endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            languages: DEFAULT_LANGUAGES.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_file_size: MAX_FILE_SIZE,
            buffer_size: FORMAT_DETECTION_BUFFER_SIZE,
            min_format_bytes: MIN_FORMAT_BYTES,
            cloud_failure_fallback: true,
        }
    }
}

impl OcrConfig {
    /// Configuration for a given method with every other setting at its default
    pub fn for_method(method: OcrMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    /// Build the configuration from process environment variables
    ///
    /// Unset variables keep their defaults; set but unparsable values are a
    /// [`ConfigError`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    ///
    /// # Examples
    ///
    /// ```rust
    /// use receipt_ingredients::ocr_config::{OcrConfig, OcrMethod};
    ///
    /// let config = OcrConfig::from_lookup(|key| match key {
    ///     "OCR_METHOD" => Some("fixed-sample".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(config.method, OcrMethod::FixedSample);
    /// assert_eq!(config.timeout_secs, 30);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(method) = lookup(ENV_METHOD) {
            config.method = method.parse()?;
        }
        config.api_key = lookup(ENV_API_KEY).filter(|key| !key.trim().is_empty());
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            config.endpoint = endpoint;
        }
        if let Some(languages) = lookup(ENV_LANGUAGES) {
            config.languages = languages;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout_secs = parse_value(ENV_TIMEOUT_SECS, &timeout)?;
        }
        if let Some(fallback) = lookup(ENV_CLOUD_FALLBACK) {
            config.cloud_failure_fallback = parse_value(ENV_CLOUD_FALLBACK, &fallback)?;
        }

        debug!(
            "OCR configuration: method={}, api_key_set={}, languages={}, timeout={}s",
            config.method,
            config.api_key.is_some(),
            config.languages,
            config.timeout_secs
        );
        Ok(config)
    }

    /// Return the API key if it is present and well-formed
    ///
    /// A usable key is non-empty, not a placeholder, at least
    /// [`MIN_API_KEY_LEN`] characters long and made only of ASCII letters,
    /// digits, `-` and `_`.
    pub fn validated_api_key(&self) -> Result<&str, OcrError> {
        let key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(OcrError::MissingCredentials)?;

        let lower = key.to_lowercase();
        if lower.starts_with("your") || PLACEHOLDER_KEYS.contains(&lower.as_str()) {
            return Err(OcrError::InvalidCredentials(
                "API key is a placeholder".to_string(),
            ));
        }
        if key.len() < MIN_API_KEY_LEN {
            return Err(OcrError::InvalidCredentials(format!(
                "API key is too short ({} characters, need at least {})",
                key.len(),
                MIN_API_KEY_LEN
            )));
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(OcrError::InvalidCredentials(
                "API key contains unexpected characters".to_string(),
            ));
        }

        Ok(key)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<OcrConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        OcrConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("cloud-vision".parse::<OcrMethod>(), Ok(OcrMethod::CloudVision));
        assert_eq!(" Local-Engine ".parse::<OcrMethod>(), Ok(OcrMethod::LocalEngine));
        assert_eq!(
            "tesseract".parse::<OcrMethod>(),
            Err(ConfigError::UnknownMethod("tesseract".to_string()))
        );
        assert!("".parse::<OcrMethod>().is_err());
    }

    #[test]
    fn test_base_confidences() {
        assert_eq!(OcrMethod::CloudVision.base_confidence(), 0.9);
        assert_eq!(OcrMethod::LocalEngine.base_confidence(), 0.7);
        assert_eq!(OcrMethod::FixedSample.base_confidence(), 0.6);
        assert_eq!(OcrMethod::DeterministicStub.base_confidence(), 0.85);
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.method, OcrMethod::DeterministicStub);
        assert_eq!(config.api_key, None);
        assert_eq!(config.endpoint, DEFAULT_VISION_ENDPOINT);
        assert_eq!(config.languages, "eng");
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert!(config.cloud_failure_fallback);
    }

    #[test]
    fn test_env_overrides() {
        let config = config_from(&[
            ("OCR_METHOD", "cloud-vision"),
            ("VISION_API_KEY", "AIzaSyA1b2C3d4E5f6G7h8I9j0"),
            ("OCR_TIMEOUT_SECS", "5"),
            ("OCR_CLOUD_FALLBACK", "false"),
            ("OCR_LANGUAGES", "eng+fra"),
        ])
        .unwrap();

        assert_eq!(config.method, OcrMethod::CloudVision);
        assert_eq!(config.timeout_secs, 5);
        assert!(!config.cloud_failure_fallback);
        assert_eq!(config.languages, "eng+fra");
        assert_eq!(config.validated_api_key(), Ok("AIzaSyA1b2C3d4E5f6G7h8I9j0"));
    }

    #[test]
    fn test_invalid_env_values() {
        assert_eq!(
            config_from(&[("OCR_METHOD", "magic")]).unwrap_err(),
            ConfigError::UnknownMethod("magic".to_string())
        );
        assert_eq!(
            config_from(&[("OCR_TIMEOUT_SECS", "soon")]).unwrap_err(),
            ConfigError::InvalidValue {
                key: "OCR_TIMEOUT_SECS".to_string(),
                value: "soon".to_string()
            }
        );
        assert!(config_from(&[("OCR_CLOUD_FALLBACK", "maybe")]).is_err());
    }

    #[test]
    fn test_blank_api_key_is_absent() {
        let config = config_from(&[("VISION_API_KEY", "   ")]).unwrap();
        assert_eq!(config.api_key, None);
        assert_eq!(config.validated_api_key(), Err(OcrError::MissingCredentials));
    }

    #[test]
    fn test_malformed_api_keys() {
        for key in ["YOUR_API_KEY_GOES_HERE_1234", "changeme", "short-key", "AIza key with spaces 12345"] {
            let config = OcrConfig {
                api_key: Some(key.to_string()),
                ..Default::default()
            };
            assert!(
                matches!(config.validated_api_key(), Err(OcrError::InvalidCredentials(_))),
                "accepted {key}"
            );
        }
    }
}
