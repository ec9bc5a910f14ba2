//! Document scanner: OCR collaborator + identity classifier

use std::sync::Arc;

use bima_core::{OcrEngine, Result};

use crate::classifier::{classify_identity_text, ScanOutcome};

/// Drives an injected OCR engine and classifies its output
pub struct DocumentScanner {
    ocr: Arc<dyn OcrEngine>,
}

impl DocumentScanner {
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }

    /// Scan an encoded image: extract text, then classify it
    ///
    /// OCR failures surface as [`bima_core::Error::Ocr`]; classification
    /// itself cannot fail.
    pub async fn scan(&self, image: &[u8]) -> Result<ScanOutcome> {
        let text = self.ocr.recognize(image).await?;
        tracing::debug!(
            engine = self.ocr.name(),
            chars = text.len(),
            "ocr extraction complete"
        );
        Ok(classify_identity_text(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bima_core::Error;

    struct FixedOcr(&'static str);

    #[async_trait]
    impl OcrEngine for FixedOcr {
        async fn recognize(&self, _image: &[u8]) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct BrokenOcr;

    #[async_trait]
    impl OcrEngine for BrokenOcr {
        async fn recognize(&self, _image: &[u8]) -> Result<String> {
            Err(Error::Ocr("decoder crashed".into()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_scan_classifies_extracted_text() {
        let scanner = DocumentScanner::new(Arc::new(FixedOcr(
            "Government of India 1234 5678 9012",
        )));
        let outcome = scanner.scan(&[0u8; 4]).await.unwrap();
        assert!(outcome.is_identity_document);
        assert_eq!(outcome.confidence, 90);
    }

    #[tokio::test]
    async fn test_ocr_failure_propagates() {
        let scanner = DocumentScanner::new(Arc::new(BrokenOcr));
        let err = scanner.scan(&[0u8; 4]).await.unwrap_err();
        assert!(matches!(err, Error::Ocr(_)));
    }
}
