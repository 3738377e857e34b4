//! # Pipeline Module
//!
//! Entry point running OCR acquisition and receipt analysis for one image.

use log::info;
use std::future::Future;

use crate::ocr::ImageHandle;
use crate::ocr_acquisition::{Acquisition, OcrAcquisitionPolicy};
use crate::ocr_config::{ConfigError, OcrConfig};
use crate::ocr_errors::OcrError;
use crate::receipt_aggregator::{ReceiptAggregator, ReceiptAnalysis};

/// Errors returned by the pipeline entry points
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Configuration could not be built
    Config(ConfigError),
    /// Text could not be acquired and no fallback applied
    Acquisition(OcrError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Config(err) => write!(f, "{err}"),
            PipelineError::Acquisition(err) => write!(f, "OCR acquisition failed: {err}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Config(err) => Some(err),
            PipelineError::Acquisition(err) => Some(err),
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::Config(err)
    }
}

impl From<OcrError> for PipelineError {
    fn from(err: OcrError) -> Self {
        PipelineError::Acquisition(err)
    }
}

/// OCR acquisition followed by receipt analysis
pub struct ReceiptPipeline {
    policy: OcrAcquisitionPolicy,
    aggregator: ReceiptAggregator,
}

impl ReceiptPipeline {
    pub fn new(config: OcrConfig) -> Self {
        Self::with_components(OcrAcquisitionPolicy::new(config), ReceiptAggregator::new())
    }

    pub fn with_components(policy: OcrAcquisitionPolicy, aggregator: ReceiptAggregator) -> Self {
        Self { policy, aggregator }
    }

    /// Pipeline configured from environment variables
    pub fn from_env() -> Result<Self, PipelineError> {
        Ok(Self::new(OcrConfig::from_env()?))
    }

    pub fn policy(&self) -> &OcrAcquisitionPolicy {
        &self.policy
    }

    /// Analyze one receipt image
    pub async fn analyze(&self, image: &ImageHandle) -> Result<ReceiptAnalysis, PipelineError> {
        let acquisition = self.policy.acquire(image).await?;
        Ok(self.analyze_acquisition(&acquisition))
    }

    /// Analyze one receipt image unless `cancelled` resolves during OCR
    ///
    /// Only acquisition is cancellable; analysis of acquired text is
    /// synchronous and always completes.
    pub async fn analyze_cancellable<C>(
        &self,
        image: &ImageHandle,
        cancelled: C,
    ) -> Result<ReceiptAnalysis, PipelineError>
    where
        C: Future<Output = ()>,
    {
        let acquisition = self.policy.acquire_cancellable(image, cancelled).await?;
        Ok(self.analyze_acquisition(&acquisition))
    }

    /// Analyze text that was already acquired
    pub fn analyze_acquisition(&self, acquisition: &Acquisition) -> ReceiptAnalysis {
        let mut analysis = self.aggregator.aggregate(&acquisition.text, &acquisition.lines);
        analysis.ocr = Some(acquisition.provenance());

        info!(
            "Pipeline finished with method {} ({} ingredients, confidence {:.2})",
            acquisition.method,
            analysis.ingredients.len(),
            analysis.confidence
        );
        analysis
    }
}

/// Analyze one receipt image with the given OCR configuration
///
/// # Examples
///
/// ```rust
/// use receipt_ingredients::ocr::ImageHandle;
/// use receipt_ingredients::ocr_config::{OcrConfig, OcrMethod};
/// use receipt_ingredients::pipeline::analyze;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = OcrConfig::for_method(OcrMethod::DeterministicStub);
/// let analysis = analyze(&ImageHandle::detached(), config).await?;
///
/// assert_eq!(analysis.total_amount.as_deref(), Some("$42.13"));
/// # Ok(())
/// # }
/// ```
pub async fn analyze(image: &ImageHandle, config: OcrConfig) -> Result<ReceiptAnalysis, PipelineError> {
    ReceiptPipeline::new(config).analyze(image).await
}
