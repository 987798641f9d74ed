//! Sliding-window text chunker.
//!
//! Splits extracted document text into fixed-size character windows with a
//! configurable overlap between consecutive windows. Overlap keeps sentences
//! that straddle a window boundary visible in both neighbours, so the context
//! assembly step never loses them entirely.
//!
//! Windows are measured in characters, not bytes, so multibyte text never
//! splits inside a UTF-8 sequence.

use anyhow::{bail, Result};

/// Split text into character windows of `size` chars, stepping forward by
/// `size - overlap` chars each time. The last window may be shorter.
///
/// Empty input yields zero chunks. `size` must be positive and `overlap`
/// strictly smaller than `size`, otherwise the window would never advance.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    if size == 0 {
        bail!("chunk size must be > 0");
    }
    if overlap >= size {
        bail!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap,
            size
        );
    }

    // Byte offset of every char boundary, plus the end of the string.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    let total_chars = boundaries.len() - 1;

    let step = size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < total_chars {
        let end = (start + size).min(total_chars);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        start += step;
    }

    Ok(chunks)
}
