//! Recognition collaborators for the rule-based backend.
//!
//! The CLI adapters drive the system `pdftoppm` (poppler) and `tesseract`
//! binaries. Pages are binarized (see [`preprocess_for_ocr`]) before they
//! reach Tesseract.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::preprocess::preprocess_for_ocr;
use super::types::{DocumentRasterizer, OcrEngine, PageImage};
use super::ExtractionError;

/// Tesseract options suited to tabular statements: LSTM engine, one block.
const TESSERACT_ARGS: [&str; 4] = ["--oem", "3", "--psm", "6"];

/// OCR through the `tesseract` command-line tool.
pub struct TesseractCli {
    binary: PathBuf,
    language: String,
    preprocess: bool,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>, language: &str) -> Self {
        Self {
            binary: binary.into(),
            language: language.to_string(),
            preprocess: true,
        }
    }

    /// Hand page images to Tesseract as rasterized.
    pub fn without_preprocessing(mut self) -> Self {
        self.preprocess = false;
        self
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, page: &PageImage) -> Result<String, ExtractionError> {
        let dir = tempfile::tempdir()
            .map_err(|e| ExtractionError::OcrProcessing(format!("temp dir: {e}")))?;
        let image: Cow<'_, [u8]> = if self.preprocess {
            Cow::Owned(preprocess_for_ocr(&page.bytes)?)
        } else {
            Cow::Borrowed(page.bytes.as_slice())
        };
        let image_path = dir.path().join(format!("page-{}.png", page.page_number));
        std::fs::write(&image_path, &image)
            .map_err(|e| ExtractionError::OcrProcessing(format!("write page image: {e}")))?;

        let output = Command::new(&self.binary)
            .arg(&image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .args(TESSERACT_ARGS)
            .output()
            .map_err(|e| {
                ExtractionError::OcrProcessing(format!("{}: {e}", self.binary.display()))
            })?;

        if !output.status.success() {
            return Err(ExtractionError::OcrProcessing(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Rasterization through poppler's `pdftoppm`.
pub struct PdftoppmRasterizer {
    binary: PathBuf,
}

impl PdftoppmRasterizer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

impl DocumentRasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf_bytes: &[u8], dpi: u32) -> Result<Vec<PageImage>, ExtractionError> {
        let dir = tempfile::tempdir()
            .map_err(|e| ExtractionError::Rasterization(format!("temp dir: {e}")))?;
        let pdf_path = dir.path().join("document.pdf");
        std::fs::write(&pdf_path, pdf_bytes)
            .map_err(|e| ExtractionError::Rasterization(format!("write document: {e}")))?;

        let output = Command::new(&self.binary)
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-png")
            .arg(&pdf_path)
            .arg(dir.path().join("page"))
            .output()
            .map_err(|e| {
                ExtractionError::Rasterization(format!("{}: {e}", self.binary.display()))
            })?;

        if !output.status.success() {
            return Err(ExtractionError::Rasterization(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let pages = collect_pages(dir.path())?;
        if pages.is_empty() {
            return Err(ExtractionError::Rasterization("document has no pages".into()));
        }
        Ok(pages)
    }
}

/// Read `page-N.png` files (N possibly zero-padded) in page order.
fn collect_pages(dir: &Path) -> Result<Vec<PageImage>, ExtractionError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| ExtractionError::Rasterization(format!("read output dir: {e}")))?;

    let mut numbered: Vec<(usize, PathBuf)> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter_map(|path| page_number(&path).map(|n| (n, path)))
        .collect();
    numbered.sort_by_key(|(n, _)| *n);

    numbered
        .into_iter()
        .map(|(page_number, path)| {
            let bytes = std::fs::read(&path)
                .map_err(|e| ExtractionError::Rasterization(format!("read page {page_number}: {e}")))?;
            Ok(PageImage { page_number, bytes })
        })
        .collect()
}

fn page_number(path: &Path) -> Option<usize> {
    if path.extension()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix("page-")?.parse().ok()
}

/// Mock OCR engine for unit testing without Tesseract.
///
/// Page `n` (1-based) returns `pages[n - 1]`; pages beyond the list fail,
/// as do pages listed in `failing_pages`.
pub struct MockOcrEngine {
    pub pages: Vec<String>,
    pub failing_pages: Vec<usize>,
}

impl MockOcrEngine {
    pub fn new(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            failing_pages: Vec::new(),
        }
    }

    pub fn failing_on(mut self, page_number: usize) -> Self {
        self.failing_pages.push(page_number);
        self
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, page: &PageImage) -> Result<String, ExtractionError> {
        if self.failing_pages.contains(&page.page_number) {
            return Err(ExtractionError::OcrProcessing(format!(
                "mock failure on page {}",
                page.page_number
            )));
        }
        page.page_number
            .checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .cloned()
            .ok_or_else(|| {
                ExtractionError::OcrProcessing(format!("no text for page {}", page.page_number))
            })
    }
}

/// Mock rasterizer: a fixed number of placeholder pages, or a failure.
pub struct MockRasterizer {
    pub page_count: usize,
    pub fail: bool,
}

impl MockRasterizer {
    pub fn with_pages(page_count: usize) -> Self {
        Self {
            page_count,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            page_count: 0,
            fail: true,
        }
    }
}

impl DocumentRasterizer for MockRasterizer {
    fn rasterize(&self, _pdf_bytes: &[u8], _dpi: u32) -> Result<Vec<PageImage>, ExtractionError> {
        if self.fail {
            return Err(ExtractionError::Rasterization("mock: unreadable document".into()));
        }
        Ok((1..=self.page_count)
            .map(|page_number| PageImage {
                page_number,
                bytes: format!("page {page_number}").into_bytes(),
            })
            .collect())
    }
}
