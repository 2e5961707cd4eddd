/// Splits extracted document text into overlapping word-window chunks.
///
/// Overlap preserves context across chunk boundaries so a sentence split
/// across a boundary is still fully present in at least one chunk.
use thiserror::Error;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Invalid chunking parameters. Fatal at startup, never per-request.
#[derive(Error, Debug)]
#[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
pub struct InvalidChunking {
    pub chunk_size: usize,
    pub overlap: usize,
}

/// A contiguous word-range slice of a source document.
///
/// `start_index`/`end_index` are positions in the whitespace-tokenized
/// source text, not byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    pub text: String,
    pub start_index: usize,
    pub end_index: usize,
}

/// Split `text` into overlapping chunks of `chunk_size` words.
///
/// The window start advances by `chunk_size - overlap` words per step; the
/// final window is clipped to the available length. Empty input produces an
/// empty vec, not an error.
pub fn chunk(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<DocumentChunk>, InvalidChunking> {
    if overlap >= chunk_size {
        return Err(InvalidChunking {
            chunk_size,
            overlap,
        });
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let step = chunk_size - overlap;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = usize::min(start + chunk_size, words.len());
        let text = words[start..end].join(" ");
        if !text.trim().is_empty() {
            chunks.push(DocumentChunk {
                text,
                start_index: start,
                end_index: end,
            });
        }
        start += step;
    }

    Ok(chunks)
}
