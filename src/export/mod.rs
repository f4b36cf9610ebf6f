// Export module
// Packages a built index directory into a self-contained output folder


use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, info};

use crate::Result;
use crate::chunker::save_chunks;
use crate::database::{INDEX_DIR_NAME, METADATA_FILE_NAME, Metadata};

pub const CLEANED_TEXT_FILE_NAME: &str = "cleaned_text.json";
pub const CHUNKS_FILE_NAME: &str = "chunks.json";

#[derive(Debug, Serialize)]
struct CleanedText<'a> {
    cleaned_text: &'a str,
}

/// Paths written by [`export_processed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub cleaned_text: PathBuf,
    pub chunks: PathBuf,
    pub metadata: PathBuf,
    pub index: PathBuf,
}

/// Write `cleaned_text.json` and `chunks.json` derived from the metadata
/// store, and copy the metadata and index into `output_dir`
#[inline]
pub fn export_processed(index_dir: &Path, output_dir: &Path) -> Result<ExportSummary> {
    let metadata_source = index_dir.join(METADATA_FILE_NAME);
    let metadata = Metadata::load(&metadata_source)?;

    fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;

    let joined = metadata.texts.join("\n\n");
    let cleaned_text = output_dir.join(CLEANED_TEXT_FILE_NAME);
    let content = serde_json::to_string_pretty(&CleanedText {
        cleaned_text: &joined,
    })
    .context("Failed to serialize cleaned text")?;
    fs::write(&cleaned_text, content)
        .with_context(|| format!("Failed to write {}", cleaned_text.display()))?;
    debug!("Wrote {}", cleaned_text.display());

    let chunks = output_dir.join(CHUNKS_FILE_NAME);
    save_chunks(&chunks, &metadata.to_chunks())?;
    debug!("Wrote {}", chunks.display());

    let metadata_target = output_dir.join(METADATA_FILE_NAME);
    fs::copy(&metadata_source, &metadata_target)
        .with_context(|| format!("Failed to copy {}", metadata_source.display()))?;

    let index_source = index_dir.join(INDEX_DIR_NAME);
    let index_target = output_dir.join(INDEX_DIR_NAME);
    if index_target.exists() {
        fs::remove_dir_all(&index_target)
            .with_context(|| format!("Failed to replace {}", index_target.display()))?;
    }
    copy_dir(&index_source, &index_target)?;

    info!(
        "Exported {} chunks from {} to {}",
        metadata.len(),
        index_dir.display(),
        output_dir.display()
    );

    Ok(ExportSummary {
        cleaned_text,
        chunks,
        metadata: metadata_target,
        index: index_target,
    })
}

fn copy_dir(source: &Path, target: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(target)
        .with_context(|| format!("Failed to create directory: {}", target.display()))?;

    for entry in fs::read_dir(source)
        .with_context(|| format!("Failed to read directory: {}", source.display()))?
    {
        let entry = entry?;
        let destination = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &destination)?;
        } else {
            fs::copy(entry.path(), &destination)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }

    Ok(())
}
