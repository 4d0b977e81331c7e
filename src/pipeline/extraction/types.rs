use super::ExtractionError;

/// One rasterized page handed to a recognition backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 1-based
    pub page_number: usize,
    /// Encoded image (PNG or JPEG).
    pub bytes: Vec<u8>,
}

/// Turns raw document bytes into page images.
pub trait DocumentRasterizer {
    fn rasterize(&self, pdf_bytes: &[u8], dpi: u32) -> Result<Vec<PageImage>, ExtractionError>;
}

/// OCR engine abstraction (allows mocking for tests).
///
/// Image pre-processing (grayscale, thresholding, denoising) belongs to the
/// implementation, not to the caller.
pub trait OcrEngine {
    fn recognize(&self, page: &PageImage) -> Result<String, ExtractionError>;
}
