//! OCR boundary trait for the document-scan feature

use async_trait::async_trait;

use crate::error::Result;

/// OCR text-extraction collaborator
///
/// Input is an encoded image; output is the raw recognized text, which the
/// document classifier then scores. Failures surface as
/// [`crate::Error::Ocr`].
#[async_trait]
pub trait OcrEngine: Send + Sync + 'static {
    /// Extract raw text from an encoded image
    async fn recognize(&self, image: &[u8]) -> Result<String>;

    /// Engine name for logging
    fn name(&self) -> &str;
}
