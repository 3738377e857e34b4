//! # OCR Acquisition Module
//!
//! Chooses the OCR backend for a receipt image and falls back to the fixed
//! sample receipt when the preferred backend is unavailable.
//!
//! The policy is a small state machine:
//!
//! ```text
//! TryingPrimary ──ok──────────────▶ Done
//!      │  └──────fatal───────────▶ Failed
//!      └──recoverable──▶ TryingFallback ──▶ Done
//! ```
//!
//! `TryingFallback` can only move to `Done`, so at most one fallback hop is
//! taken per acquisition.
//!
//! Recovery rules per primary method:
//!
//! - `cloud-vision`: missing or malformed credentials fall back before any
//!   network call; a failed call falls back only when
//!   [`OcrConfig::cloud_failure_fallback`] is set, otherwise it is returned.
//! - `local-engine`: initialization and recognition failures (including a
//!   panicking engine or a timeout) are logged and fall back, never raised.
//! - `deterministic-stub` and `fixed-sample` never touch the image and
//!   cannot fail.
//!
//! Image validation errors are input errors and are always returned.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cloud_vision::CloudVisionClient;
use crate::ocr::{default_local_engine, ImageHandle, OcrOutput, TextRecognizer};
use crate::ocr_config::{OcrConfig, OcrMethod};
use crate::ocr_errors::OcrError;
use crate::sample_receipts::{DETERMINISTIC_STUB_TEXT, FIXED_SAMPLE_TEXT};

/// Receipt text obtained from an OCR backend
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    /// Flat recognized text
    pub text: String,
    /// Receipt lines, rebuilt from blocks when the backend reported them
    pub lines: Vec<String>,
    /// Method requested by the configuration
    pub requested_method: OcrMethod,
    /// Method that actually produced the text
    pub method: OcrMethod,
    /// Base confidence of `method`
    pub base_confidence: f32,
    /// Confidence reported by the backend, if any
    pub reported_confidence: Option<f32>,
    /// Why the primary method was abandoned
    pub fallback_cause: Option<String>,
}

impl Acquisition {
    fn from_output(requested_method: OcrMethod, method: OcrMethod, output: OcrOutput) -> Self {
        Self {
            lines: output.lines(),
            text: output.text,
            requested_method,
            method,
            base_confidence: method.base_confidence(),
            reported_confidence: output.confidence,
            fallback_cause: None,
        }
    }

    fn canned(requested_method: OcrMethod, method: OcrMethod, text: &str) -> Self {
        Self::from_output(requested_method, method, OcrOutput::from_text(text))
    }

    /// Whether the text came from the fallback rather than the requested method
    pub fn is_fallback(&self) -> bool {
        self.fallback_cause.is_some()
    }

    pub fn provenance(&self) -> OcrProvenance {
        OcrProvenance {
            requested_method: self.requested_method,
            method: self.method,
            base_confidence: self.base_confidence,
            reported_confidence: self.reported_confidence,
            fallback_cause: self.fallback_cause.clone(),
        }
    }
}

/// How the text of a [`crate::receipt_aggregator::ReceiptAnalysis`] was obtained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrProvenance {
    pub requested_method: OcrMethod,
    pub method: OcrMethod,
    pub base_confidence: f32,
    pub reported_confidence: Option<f32>,
    pub fallback_cause: Option<String>,
}

#[derive(Debug)]
enum AcquisitionState {
    TryingPrimary,
    TryingFallback { cause: String },
    Done(Acquisition),
    Failed(OcrError),
}

/// OCR backend selection and fallback policy
pub struct OcrAcquisitionPolicy {
    config: OcrConfig,
    local_engine: Arc<dyn TextRecognizer>,
}

impl OcrAcquisitionPolicy {
    /// Create a policy using this build's local engine
    pub fn new(config: OcrConfig) -> Self {
        let local_engine = default_local_engine(&config);
        Self::with_local_engine(config, local_engine)
    }

    /// Create a policy with a custom local engine
    pub fn with_local_engine(config: OcrConfig, local_engine: Arc<dyn TextRecognizer>) -> Self {
        Self {
            config,
            local_engine,
        }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Acquire receipt text for an image
    ///
    /// # Examples
    ///
    /// ```rust
    /// use receipt_ingredients::ocr::ImageHandle;
    /// use receipt_ingredients::ocr_acquisition::OcrAcquisitionPolicy;
    /// use receipt_ingredients::ocr_config::{OcrConfig, OcrMethod};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let policy = OcrAcquisitionPolicy::new(OcrConfig::for_method(OcrMethod::FixedSample));
    /// let acquisition = policy.acquire(&ImageHandle::detached()).await?;
    ///
    /// assert_eq!(acquisition.base_confidence, 0.6);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn acquire(&self, image: &ImageHandle) -> Result<Acquisition, OcrError> {
        let requested = self.config.method;
        info!("Starting OCR acquisition with method {}", requested);

        let mut state = AcquisitionState::TryingPrimary;
        loop {
            state = match state {
                AcquisitionState::TryingPrimary => self.try_primary(image).await,
                AcquisitionState::TryingFallback { cause } => {
                    warn!("OCR method {} failed, using fixed sample: {}", requested, cause);
                    let mut acquisition =
                        Acquisition::canned(requested, OcrMethod::FixedSample, FIXED_SAMPLE_TEXT);
                    acquisition.fallback_cause = Some(cause);
                    AcquisitionState::Done(acquisition)
                }
                AcquisitionState::Done(acquisition) => {
                    info!(
                        "OCR acquisition done: method={}, base confidence={}, {} characters",
                        acquisition.method,
                        acquisition.base_confidence,
                        acquisition.text.len()
                    );
                    return Ok(acquisition);
                }
                AcquisitionState::Failed(error) => {
                    warn!("OCR acquisition with method {} failed: {}", requested, error);
                    return Err(error);
                }
            };
        }
    }

    /// Acquire receipt text unless `cancelled` resolves first
    ///
    /// A cancelled acquisition returns [`OcrError::Cancelled`]; an in-flight
    /// local recognition keeps running on its blocking thread and its result
    /// is dropped.
    pub async fn acquire_cancellable<C>(
        &self,
        image: &ImageHandle,
        cancelled: C,
    ) -> Result<Acquisition, OcrError>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancelled => {
                info!("OCR acquisition cancelled by caller");
                Err(OcrError::Cancelled)
            }
            result = self.acquire(image) => result,
        }
    }

    async fn try_primary(&self, image: &ImageHandle) -> AcquisitionState {
        let requested = self.config.method;
        match requested {
            OcrMethod::DeterministicStub => AcquisitionState::Done(Acquisition::canned(
                requested,
                requested,
                DETERMINISTIC_STUB_TEXT,
            )),
            OcrMethod::FixedSample => {
                AcquisitionState::Done(Acquisition::canned(requested, requested, FIXED_SAMPLE_TEXT))
            }
            OcrMethod::CloudVision => self.try_cloud(image).await,
            OcrMethod::LocalEngine => self.try_local(image).await,
        }
    }

    async fn try_cloud(&self, image: &ImageHandle) -> AcquisitionState {
        let api_key = match self.config.validated_api_key() {
            Ok(key) => key,
            Err(error) => {
                return AcquisitionState::TryingFallback {
                    cause: error.to_string(),
                }
            }
        };

        if let Err(error) = image.validate(&self.config) {
            return AcquisitionState::Failed(error);
        }

        let result = match CloudVisionClient::new(&self.config) {
            Ok(client) => client.recognize(image, api_key).await,
            Err(error) => Err(error),
        };

        match result {
            Ok(output) => AcquisitionState::Done(Acquisition::from_output(
                OcrMethod::CloudVision,
                OcrMethod::CloudVision,
                output,
            )),
            Err(error) if self.config.cloud_failure_fallback => AcquisitionState::TryingFallback {
                cause: error.to_string(),
            },
            Err(error) => AcquisitionState::Failed(error),
        }
    }

    async fn try_local(&self, image: &ImageHandle) -> AcquisitionState {
        if let Err(error) = image.validate(&self.config) {
            return AcquisitionState::Failed(error);
        }

        let engine = Arc::clone(&self.local_engine);
        let handle = image.clone();
        let task = tokio::task::spawn_blocking(move || engine.recognize(&handle));

        let outcome = tokio::time::timeout(Duration::from_secs(self.config.timeout_secs), task).await;
        match outcome {
            Ok(Ok(Ok(output))) => {
                debug!("Local engine reported confidence {:?}", output.confidence);
                AcquisitionState::Done(Acquisition::from_output(
                    OcrMethod::LocalEngine,
                    OcrMethod::LocalEngine,
                    output,
                ))
            }
            Ok(Ok(Err(error))) => AcquisitionState::TryingFallback {
                cause: error.to_string(),
            },
            Ok(Err(join_error)) => AcquisitionState::TryingFallback {
                cause: format!("local engine task failed: {join_error}"),
            },
            Err(_) => AcquisitionState::TryingFallback {
                cause: OcrError::Timeout(self.config.timeout_secs).to_string(),
            },
        }
    }
}
