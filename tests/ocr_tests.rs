//! # OCR Tests Module
//!
//! Test suite for OCR acquisition: method selection, base confidences,
//! fallback hops, local engine failures and cancellation.

#[cfg(test)]
mod tests {
    use receipt_ingredients::ocr::{ImageHandle, OcrOutput, TextBlock, TextRecognizer};
    use receipt_ingredients::ocr_acquisition::OcrAcquisitionPolicy;
    use receipt_ingredients::ocr_config::{ConfigError, OcrConfig, OcrMethod};
    use receipt_ingredients::ocr_errors::OcrError;
    use receipt_ingredients::sample_receipts::{DETERMINISTIC_STUB_TEXT, FIXED_SAMPLE_TEXT};
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const VALID_API_KEY: &str = "AIzaSyA1b2C3d4E5f6G7h8I9j0kLmN";
    const CLOSED_ENDPOINT: &str = "http://127.0.0.1:9/v1/images:annotate";

    /// Minimal file the format detector accepts as PNG
    fn png_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48,
            0x44, 0x52,
        ])
        .unwrap();
        file.flush().unwrap();
        file
    }

    struct FailingEngine;

    impl TextRecognizer for FailingEngine {
        fn recognize(&self, _image: &ImageHandle) -> Result<OcrOutput, OcrError> {
            Err(OcrError::Initialization("tessdata not found".to_string()))
        }
    }

    struct PanickingEngine;

    impl TextRecognizer for PanickingEngine {
        fn recognize(&self, _image: &ImageHandle) -> Result<OcrOutput, OcrError> {
            panic!("engine crashed");
        }
    }

    struct SlowEngine(Duration);

    impl TextRecognizer for SlowEngine {
        fn recognize(&self, _image: &ImageHandle) -> Result<OcrOutput, OcrError> {
            std::thread::sleep(self.0);
            Ok(OcrOutput::from_text("Milk $3.49"))
        }
    }

    struct BlockEngine;

    impl TextRecognizer for BlockEngine {
        fn recognize(&self, _image: &ImageHandle) -> Result<OcrOutput, OcrError> {
            Ok(OcrOutput {
                text: "Whole Milk 1 gal $3.49 Bread $2.79".to_string(),
                confidence: Some(0.82),
                blocks: vec![
                    TextBlock::new("Whole Milk 1 gal $3.49"),
                    TextBlock::new("Bread $2.79"),
                ],
            })
        }
    }

    fn local_policy(engine: Arc<dyn TextRecognizer>) -> OcrAcquisitionPolicy {
        OcrAcquisitionPolicy::with_local_engine(OcrConfig::for_method(OcrMethod::LocalEngine), engine)
    }

    fn cloud_config(fallback: bool) -> OcrConfig {
        OcrConfig {
            method: OcrMethod::CloudVision,
            api_key: Some(VALID_API_KEY.to_string()),
            endpoint: CLOSED_ENDPOINT.to_string(),
            timeout_secs: 5,
            cloud_failure_fallback: fallback,
            ..Default::default()
        }
    }

    /// Test the deterministic stub bypasses OCR
    #[tokio::test]
    async fn test_deterministic_stub() {
        let policy = OcrAcquisitionPolicy::new(OcrConfig::for_method(OcrMethod::DeterministicStub));
        let acquisition = policy.acquire(&ImageHandle::detached()).await.unwrap();

        assert_eq!(acquisition.text, DETERMINISTIC_STUB_TEXT);
        assert_eq!(acquisition.base_confidence, 0.85);
        assert_eq!(acquisition.lines.len(), DETERMINISTIC_STUB_TEXT.lines().count());
    }

    /// Test the fixed sample method
    #[tokio::test]
    async fn test_fixed_sample() {
        let policy = OcrAcquisitionPolicy::new(OcrConfig::for_method(OcrMethod::FixedSample));
        let acquisition = policy.acquire(&ImageHandle::detached()).await.unwrap();

        assert_eq!(acquisition.text, FIXED_SAMPLE_TEXT);
        assert_eq!(acquisition.method, OcrMethod::FixedSample);
        assert_eq!(acquisition.base_confidence, 0.6);
        assert!(!acquisition.is_fallback());
    }

    /// Test absent credentials fall back before any network call
    #[tokio::test]
    async fn test_cloud_without_credentials_falls_back() {
        let config = OcrConfig {
            api_key: None,
            cloud_failure_fallback: false,
            ..cloud_config(false)
        };
        let policy = OcrAcquisitionPolicy::new(config);
        let acquisition = policy.acquire(&ImageHandle::detached()).await.unwrap();

        // Credential problems always fall back, whatever the cloud-failure setting
        assert_eq!(acquisition.method, OcrMethod::FixedSample);
        assert_eq!(acquisition.base_confidence, 0.6);
        assert!(acquisition.is_fallback());
    }

    /// Test malformed credentials fall back
    #[tokio::test]
    async fn test_cloud_with_placeholder_key_falls_back() {
        let config = OcrConfig {
            api_key: Some("YOUR_API_KEY".to_string()),
            ..cloud_config(false)
        };
        let policy = OcrAcquisitionPolicy::new(config);
        let acquisition = policy.acquire(&ImageHandle::detached()).await.unwrap();

        assert_eq!(acquisition.method, OcrMethod::FixedSample);
        assert!(acquisition.fallback_cause.unwrap().contains("placeholder"));
    }

    /// Test a failed cloud call is returned when fallback is disabled
    #[tokio::test]
    async fn test_cloud_failure_is_signalled() {
        let image = png_file();
        let policy = OcrAcquisitionPolicy::new(cloud_config(false));

        let err = policy
            .acquire(&ImageHandle::from_path(image.path()))
            .await
            .unwrap_err();
        assert!(err.is_cloud_failure(), "unexpected error: {err}");
    }

    /// Test a failed cloud call falls back exactly once when enabled
    #[tokio::test]
    async fn test_cloud_failure_falls_back() {
        let image = png_file();
        let policy = OcrAcquisitionPolicy::new(cloud_config(true));

        let acquisition = policy
            .acquire(&ImageHandle::from_path(image.path()))
            .await
            .unwrap();
        assert_eq!(acquisition.requested_method, OcrMethod::CloudVision);
        assert_eq!(acquisition.method, OcrMethod::FixedSample);
        assert_eq!(acquisition.text, FIXED_SAMPLE_TEXT);
        assert_eq!(acquisition.base_confidence, 0.6);
    }

    /// Test an invalid image is an input error, not a backend failure
    #[tokio::test]
    async fn test_cloud_rejects_invalid_image() {
        let policy = OcrAcquisitionPolicy::new(cloud_config(true));
        let err = policy
            .acquire(&ImageHandle::from_path("/nonexistent/receipt.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::Validation(_)));
    }

    /// Test local engine initialization failures are logged, not raised
    #[tokio::test]
    async fn test_local_engine_failure_falls_back() {
        let image = png_file();
        let policy = local_policy(Arc::new(FailingEngine));

        let acquisition = policy
            .acquire(&ImageHandle::from_path(image.path()))
            .await
            .unwrap();
        assert_eq!(acquisition.method, OcrMethod::FixedSample);
        assert_eq!(acquisition.base_confidence, 0.6);
        assert!(acquisition.fallback_cause.unwrap().contains("tessdata not found"));
    }

    /// Test a panicking local engine falls back
    #[tokio::test]
    async fn test_local_engine_panic_falls_back() {
        let image = png_file();
        let policy = local_policy(Arc::new(PanickingEngine));

        let acquisition = policy
            .acquire(&ImageHandle::from_path(image.path()))
            .await
            .unwrap();
        assert_eq!(acquisition.method, OcrMethod::FixedSample);
        assert!(acquisition.is_fallback());
    }

    /// Test a local engine exceeding the timeout falls back
    #[tokio::test]
    async fn test_local_engine_timeout_falls_back() {
        let image = png_file();
        let config = OcrConfig {
            method: OcrMethod::LocalEngine,
            timeout_secs: 1,
            ..Default::default()
        };
        let policy = OcrAcquisitionPolicy::with_local_engine(
            config,
            Arc::new(SlowEngine(Duration::from_millis(1500))),
        );

        let acquisition = policy
            .acquire(&ImageHandle::from_path(image.path()))
            .await
            .unwrap();
        assert_eq!(acquisition.method, OcrMethod::FixedSample);
        assert!(acquisition.fallback_cause.unwrap().contains("Timeout"));
    }

    /// Test local engine success and block-based line reconstruction
    #[tokio::test]
    async fn test_local_engine_blocks() {
        let image = png_file();
        let policy = local_policy(Arc::new(BlockEngine));

        let acquisition = policy
            .acquire(&ImageHandle::from_path(image.path()))
            .await
            .unwrap();
        assert_eq!(acquisition.method, OcrMethod::LocalEngine);
        assert_eq!(acquisition.base_confidence, 0.7);
        assert_eq!(acquisition.reported_confidence, Some(0.82));
        assert_eq!(acquisition.lines, vec!["Whole Milk 1 gal $3.49", "Bread $2.79"]);
    }

    /// Test cancellation wins over a slow local engine
    #[tokio::test]
    async fn test_cancellation() {
        let image = png_file();
        let policy = local_policy(Arc::new(SlowEngine(Duration::from_millis(500))));

        let result = policy
            .acquire_cancellable(
                &ImageHandle::from_path(image.path()),
                tokio::time::sleep(Duration::from_millis(20)),
            )
            .await;
        assert_eq!(result, Err(OcrError::Cancelled));
    }

    /// Test an already-resolved cancellation is honored immediately
    #[tokio::test]
    async fn test_immediate_cancellation() {
        let policy = OcrAcquisitionPolicy::new(OcrConfig::for_method(OcrMethod::DeterministicStub));
        let result = policy
            .acquire_cancellable(&ImageHandle::detached(), std::future::ready(()))
            .await;
        assert_eq!(result, Err(OcrError::Cancelled));
    }

    /// Test a pending cancellation does not disturb acquisition
    #[tokio::test]
    async fn test_uncancelled_acquisition_completes() {
        let policy = OcrAcquisitionPolicy::new(OcrConfig::for_method(OcrMethod::FixedSample));
        let acquisition = policy
            .acquire_cancellable(&ImageHandle::detached(), std::future::pending::<()>())
            .await
            .unwrap();
        assert_eq!(acquisition.method, OcrMethod::FixedSample);
    }

    /// Test unknown methods are a configuration error
    #[test]
    fn test_unknown_method_is_fatal() {
        let result = OcrConfig::from_lookup(|key| {
            (key == "OCR_METHOD").then(|| "google-lens".to_string())
        });
        assert_eq!(
            result.unwrap_err(),
            ConfigError::UnknownMethod("google-lens".to_string())
        );
    }
}
