//! PDF text extraction.
//!
//! The document is parsed once with `lopdf`, then each page is re-saved as a
//! standalone single-page PDF and run through `pdf_extract`. Extraction
//! failures therefore stay contained to the page that caused them: the page
//! is skipped with a warning and the remaining pages still contribute text.

use tracing::warn;

/// Result of extracting a whole document.
#[derive(Debug)]
pub struct Extraction {
    pub text: String,
    pub pages: usize,
    pub pages_skipped: usize,
}

/// Extraction error. Only whole-document problems (unreadable file, invalid
/// PDF structure) surface here; per-page failures are downgraded to skips.
#[derive(Debug)]
pub enum ExtractError {
    Io(String),
    Pdf(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Io(e) => write!(f, "failed to read file: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extracts the text of a PDF file on disk.
pub fn extract_file(path: &std::path::Path) -> Result<Extraction, ExtractError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ExtractError::Io(format!("{}: {}", path.display(), e)))?;
    extract_bytes(&bytes)
}

/// Extracts the text of a PDF held in memory.
pub fn extract_bytes(bytes: &[u8]) -> Result<Extraction, ExtractError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

    let mut text = String::new();
    let mut pages_skipped = 0usize;
    for &page_no in &page_numbers {
        match extract_single_page(&doc, &page_numbers, page_no) {
            Ok(page_text) => {
                // pdf_extract separates pages with form feeds; with one page
                // per document they are stray and get dropped.
                text.push_str(&page_text.replace('\u{0C}', ""));
            }
            Err(e) => {
                pages_skipped += 1;
                warn!(page = page_no, error = %e, "skipping unreadable PDF page");
            }
        }
    }

    Ok(Extraction {
        text,
        pages: page_numbers.len(),
        pages_skipped,
    })
}

/// Saves a copy of the document containing only `page_no` and extracts it.
fn extract_single_page(
    doc: &lopdf::Document,
    all_pages: &[u32],
    page_no: u32,
) -> Result<String, ExtractError> {
    let mut single = doc.clone();
    let others: Vec<u32> = all_pages.iter().copied().filter(|&n| n != page_no).collect();
    if !others.is_empty() {
        single.delete_pages(&others);
    }

    let mut buf = Vec::new();
    single
        .save_to(&mut buf)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    pdf_extract::extract_text_from_mem(&buf).map_err(|e| ExtractError::Pdf(e.to_string()))
}
