#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{error, info};

use crate::chunker::{ChunkingConfig, chunk_file};
use crate::config::Config;
use crate::crawler::{PageScraper, ScrapeReport, read_url_list};
use crate::embeddings::{Embedder, Generator, OllamaClient};
use crate::export::{ExportSummary, export_processed};
use crate::indexer::{BuildSummary, IndexBuilder};
use crate::rag::{Answer, RagPipeline, Retriever};

/// Number of characters of each source shown under an answer
const SOURCE_PREVIEW_CHARS: usize = 200;

/// Scrape every URL listed in `urls_file` into `out_dir`
#[inline]
pub async fn scrape(
    config: &Config,
    urls_file: &Path,
    out_dir: &Path,
    use_browser: bool,
) -> Result<ScrapeReport> {
    let urls = read_url_list(urls_file)?;
    info!("Scraping {} URLs into {}", urls.len(), out_dir.display());

    let mut scraper = PageScraper::new(config.scraper.clone(), use_browser);
    let report = scraper.scrape(&urls, out_dir).await?;

    println!("Scraped files:");
    for path in &report.written {
        println!("  {}", path.display());
    }
    if !report.skipped.is_empty() {
        println!("Skipped (not allowed): {}", report.skipped.len());
    }
    if !report.failed.is_empty() {
        println!("Failed to fetch: {}", report.failed.len());
    }

    Ok(report)
}

/// Chunk `input` and write the chunk file
#[inline]
pub fn chunk(input: &Path, output: &Path, chunking: &ChunkingConfig) -> Result<usize> {
    let count = chunk_file(input, output, chunking)?;
    println!("Created {} chunks -> {}", count, output.display());
    Ok(count)
}

/// Embed a chunk file and write the index. `embedding_model` replaces the
/// configured model; the index then takes whatever dimension it produces.
#[inline]
pub async fn build(
    config: &Config,
    chunks_path: &Path,
    out_dir: &Path,
    embedding_model: Option<&str>,
) -> Result<BuildSummary> {
    let client = ollama_client(config, embedding_model)?;

    let summary = IndexBuilder::new(&client)
        .with_batch_size(config.ollama.batch_size as usize)
        .build_from_file(chunks_path, out_dir)
        .await?;

    println!(
        "Saved index with {} vectors (dim {}, model {}) to {}",
        summary.chunks,
        summary.dim,
        client.model_name(),
        out_dir.display()
    );
    Ok(summary)
}

/// Answer questions from stdin until EOF or `exit`
#[inline]
pub async fn ask(config: &Config, index_dir: &Path, embedding_model: Option<&str>) -> Result<()> {
    let client = ollama_client(config, embedding_model)?;
    let retriever = Retriever::open(index_dir, client.clone()).await?;
    let pipeline = RagPipeline::new(&retriever, &client).with_top_k(config.retrieval.top_k);

    eprintln!(
        "{}",
        style(format!(
            "Starting local RAG using Ollama model {}...",
            client.generation_model()
        ))
        .bold()
        .cyan()
    );

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_interactive(&pipeline, stdin.lock(), stdout.lock()).await?;
    Ok(())
}

/// Answer a single question and print it with its sources
#[inline]
pub async fn query(
    config: &Config,
    index_dir: &Path,
    question: &str,
    embedding_model: Option<&str>,
) -> Result<Answer> {
    let client = ollama_client(config, embedding_model)?;
    let retriever = Retriever::open(index_dir, client.clone()).await?;
    let pipeline = RagPipeline::new(&retriever, &client).with_top_k(config.retrieval.top_k);

    let answer = pipeline.answer(question).await?;

    let stdout = std::io::stdout();
    write_answer(&mut stdout.lock(), &answer)?;
    Ok(answer)
}

/// Package the index directory into `out_dir`
#[inline]
pub fn export(index_dir: &Path, out_dir: &Path) -> Result<ExportSummary> {
    let summary = export_processed(index_dir, out_dir)?;
    println!(
        "Exported {}, {}, {} and {} to {}",
        file_name(&summary.cleaned_text),
        file_name(&summary.chunks),
        file_name(&summary.metadata),
        file_name(&summary.index),
        out_dir.display()
    );
    Ok(summary)
}

/// Read questions line by line and print each answer with its sources.
///
/// Blank lines are ignored. EOF, `exit` or `quit` end the loop. A failed
/// question is reported and the loop keeps going. Returns the number of
/// questions answered.
#[inline]
pub async fn run_interactive<E, G, R, W>(
    pipeline: &RagPipeline<'_, E, G>,
    mut input: R,
    mut output: W,
) -> Result<usize>
where
    E: Embedder,
    G: Generator,
    R: BufRead,
    W: Write,
{
    let mut answered = 0;
    let mut line = String::new();

    loop {
        write!(output, "\n> ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line).context("Failed to read question")? == 0 {
            writeln!(output)?;
            break;
        }

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        match pipeline.answer(question).await {
            Ok(answer) => {
                write_answer(&mut output, &answer)?;
                answered += 1;
            }
            Err(e) => {
                error!("Failed to answer question: {}", e);
                writeln!(output, "Error: {}", e)?;
            }
        }
    }

    output.flush()?;
    Ok(answered)
}

/// Print an answer followed by a short preview of each source chunk
#[inline]
pub fn write_answer<W: Write>(output: &mut W, answer: &Answer) -> std::io::Result<()> {
    writeln!(output, "\n--- ANSWER ---\n")?;
    writeln!(output, "{}", answer.text)?;
    writeln!(output, "\n--- SOURCES ---")?;

    for context in &answer.contexts {
        let preview: String = context.text.chars().take(SOURCE_PREVIEW_CHARS).collect();
        writeln!(output, "[{}] {}...", context.id, preview)?;
    }

    Ok(())
}

fn ollama_client(config: &Config, embedding_model: Option<&str>) -> Result<OllamaClient> {
    let client = OllamaClient::new(config).context("Failed to initialize Ollama client")?;
    Ok(match embedding_model {
        Some(model) => client.with_embedding_model(model),
        None => client,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
