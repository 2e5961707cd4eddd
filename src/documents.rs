/// Document processing for indexing.
///
/// Extracts text from supported formats, validates uploads, and turns
/// extracted text into indexable chunks with provenance metadata.
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::chunker;
use crate::config::Config;

/// Persisted representation of a document chunk plus provenance.
///
/// `id` is derived deterministically from the source filename stem and the
/// chunk ordinal, so re-uploading the same file with the same chunking
/// overwrites the same documents in the index.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IndexedChunk {
    pub id: String,
    pub content: String,
    pub source: String,
    pub chunk_ordinal: usize,
    pub file_type: String,
    pub upload_date: DateTime<Utc>,
}

impl IndexedChunk {
    pub fn new(id: &str, content: &str, source: &str, chunk_ordinal: usize, file_type: &str) -> Self {
        Self {
            id: id.to_string(),
            content: content.to_string(),
            source: source.to_string(),
            chunk_ordinal,
            file_type: file_type.to_string(),
            upload_date: Utc::now(),
        }
    }
}

/// Derive the deterministic index id for a source file stem and ordinal.
pub fn chunk_id(stem: &str, ordinal: usize) -> String {
    format!("{stem}-chunk-{ordinal}")
}

fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase()
}

/// Validate a file before processing: existence, size, allowed type.
pub fn validate_file(path: &Path, config: &Config) -> Result<()> {
    if !path.exists() {
        bail!("File does not exist: {}", path.display());
    }

    let size_mb = path.metadata()?.len() as f64 / (1024.0 * 1024.0);
    if size_mb > config.upload.max_file_size_mb as f64 {
        bail!(
            "File too large: {size_mb:.2}MB (max: {}MB)",
            config.upload.max_file_size_mb
        );
    }

    let extension = file_extension(path);
    if !config.upload.allowed_file_types.contains(&extension) {
        bail!("Unsupported file type: {extension}");
    }

    Ok(())
}

/// Extract text from any supported document format.
pub fn extract_text(path: &Path) -> Result<String> {
    match file_extension(path).as_str() {
        "txt" => extract_text_from_txt(path),
        "pdf" => extract_text_from_pdf(path),
        other => bail!("No processor for file type: {other}"),
    }
}

fn extract_text_from_txt(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    // Fall back to lossy decoding for legacy encodings
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    };

    if text.trim().is_empty() {
        bail!("Text file is empty: {}", path.display());
    }

    info!("Read {} characters from {}", text.len(), path.display());
    Ok(text)
}

fn extract_text_from_pdf(path: &Path) -> Result<String> {
    let doc = lopdf::Document::load(path)
        .with_context(|| format!("failed to load PDF: {}", path.display()))?;

    if doc.is_encrypted() {
        bail!("PDF is encrypted and cannot be processed: {}", path.display());
    }

    let mut text = String::new();
    for page_num in doc.get_pages().keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push_str("\n\n");
            }
            Err(e) => {
                warn!("Error reading page {page_num}: {e}");
            }
        }
    }

    if text.trim().is_empty() {
        bail!("No text could be extracted from PDF: {}", path.display());
    }

    info!("Extracted {} characters from {}", text.len(), path.display());
    Ok(text)
}

/// Split extracted text into indexable chunks with provenance.
///
/// Chunk ids depend only on the filename stem and ordinal, so identical
/// text chunked identically always maps to the same id set.
pub fn prepare_chunks(path: &Path, text: &str, config: &Config) -> Result<Vec<IndexedChunk>> {
    let chunks = chunker::chunk(text, config.chunk_size, config.chunk_overlap)?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document")
        .to_string();
    let file_type = file_extension(path);
    let upload_date = Utc::now();

    let indexed: Vec<IndexedChunk> = chunks
        .into_iter()
        .enumerate()
        .map(|(ordinal, chunk)| IndexedChunk {
            id: chunk_id(stem, ordinal),
            content: chunk.text,
            source: source.clone(),
            chunk_ordinal: ordinal,
            file_type: file_type.clone(),
            upload_date,
        })
        .collect();

    info!("Created {} chunks from {}", indexed.len(), path.display());
    Ok(indexed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn small_chunk_config() -> Config {
        let mut config = Config::default();
        config.chunk_size = 5;
        config.chunk_overlap = 2;
        config
    }

    #[test]
    fn test_chunk_id_format() {
        assert_eq!(chunk_id("handbook", 0), "handbook-chunk-0");
        assert_eq!(chunk_id("policy_2024", 17), "policy_2024-chunk-17");
    }

    #[test]
    fn test_validate_missing_file() {
        let err = validate_file(Path::new("/nonexistent/file.txt"), &Config::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_validate_unsupported_type() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slides.pptx");
        fs::write(&path, "data").unwrap();

        let err = validate_file(&path, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("Unsupported file type"));
    }

    #[test]
    fn test_validate_oversized_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "x".repeat(2 * 1024 * 1024)).unwrap();

        let mut config = Config::default();
        config.upload.max_file_size_mb = 1;
        let err = validate_file(&path, &config).unwrap_err();
        assert!(err.to_string().contains("File too large"));
    }

    #[test]
    fn test_validate_ok() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "some notes").unwrap();
        assert!(validate_file(&path, &Config::default()).is_ok());
    }

    #[test]
    fn test_extract_txt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("policy.txt");
        fs::write(&path, "Employees receive 10 sick leave days per year.").unwrap();

        let text = extract_text(&path).unwrap();
        assert!(text.contains("10 sick leave days"));
    }

    #[test]
    fn test_extract_empty_txt_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "   \n  ").unwrap();
        assert!(extract_text(&path).is_err());
    }

    #[test]
    fn test_extract_txt_with_invalid_utf8_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.txt");
        // latin-1 encoded "café"
        fs::write(&path, [0x63, 0x61, 0x66, 0xe9]).unwrap();

        let text = extract_text(&path).unwrap();
        assert!(text.starts_with("caf"));
    }

    #[test]
    fn test_prepare_chunks_ids_and_ordinals() {
        let words: Vec<String> = (0..12).map(|i| format!("w{i}")).collect();
        let text = words.join(" ");
        let path = Path::new("handbook.txt");

        let chunks = prepare_chunks(path, &text, &small_chunk_config()).unwrap();
        assert!(chunks.len() > 1);

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, format!("handbook-chunk-{i}"));
            assert_eq!(chunk.chunk_ordinal, i);
            assert_eq!(chunk.source, "handbook.txt");
            assert_eq!(chunk.file_type, "txt");
        }
    }

    #[test]
    fn test_prepare_chunks_deterministic_across_reupload() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let path = Path::new("policy.txt");
        let config = small_chunk_config();

        let first = prepare_chunks(path, text, &config).unwrap();
        let second = prepare_chunks(path, text, &config).unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.content, b.content);
            assert_eq!(a.chunk_ordinal, b.chunk_ordinal);
        }
    }

    #[test]
    fn test_prepare_chunks_rejects_bad_overlap() {
        let mut config = Config::default();
        config.chunk_size = 100;
        config.chunk_overlap = 100;
        assert!(prepare_chunks(Path::new("a.txt"), "some text", &config).is_err());
    }
}
