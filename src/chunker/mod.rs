
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::config::ConfigError;

/// A window of words cut from a source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Zero-based window index
    pub id: u64,
    /// Window tokens joined by single spaces
    pub text: String,
}

/// Configuration for sliding-window chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in whitespace-delimited tokens
    pub chunk_size: usize,
    /// Tokens shared by consecutive windows
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 300,
            overlap: 60,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ConfigError> {
        let config = Self {
            chunk_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }

        if self.overlap >= self.chunk_size {
            return Err(ConfigError::InvalidOverlap(self.overlap, self.chunk_size));
        }

        Ok(())
    }

    /// Distance between the starts of consecutive windows
    #[inline]
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Split text into overlapping word windows.
///
/// Windows start every `chunk_size - overlap` tokens. Iteration stops at the
/// first window that reaches the end of the token stream, so the last chunk
/// may be shorter but never consists solely of already-covered tokens.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, ConfigError> {
    config.validate()?;

    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < tokens.len() {
        let end = (start + config.chunk_size).min(tokens.len());
        chunks.push(Chunk {
            id: chunks.len() as u64,
            text: tokens[start..end].join(" "),
        });

        if end == tokens.len() {
            break;
        }
        start += config.stride();
    }

    debug!(
        "Chunked {} tokens into {} chunks (size {}, overlap {})",
        tokens.len(),
        chunks.len(),
        config.chunk_size,
        config.overlap
    );

    Ok(chunks)
}

/// Write chunks as a pretty-printed JSON array
#[inline]
pub fn save_chunks<P: AsRef<Path>>(path: P, chunks: &[Chunk]) -> Result<()> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(chunks).context("Failed to serialize chunks")?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write chunk file: {}", path.display()))?;
    Ok(())
}

#[inline]
pub fn load_chunks<P: AsRef<Path>>(path: P) -> Result<Vec<Chunk>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read chunk file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse chunk file: {}", path.display()))
}

/// Chunk a text file and write the chunk file, returning the chunk count
#[inline]
pub fn chunk_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    config: &ChunkingConfig,
) -> Result<usize> {
    let input = input.as_ref();
    let output = output.as_ref();

    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read input document: {}", input.display()))?;

    let chunks = chunk_text(&text, config).context("Invalid chunking parameters")?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    save_chunks(output, &chunks)?;
    info!("Wrote {} chunks to {}", chunks.len(), output.display());

    Ok(chunks.len())
}
