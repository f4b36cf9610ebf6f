use super::*;
use crate::rag::RetrievedChunk;
use crate::rag::test_support::{BagOfWordsEmbedder, FixedGenerator, loan_chunks};
use std::io::Cursor;
use tempfile::TempDir;

struct FlakyGenerator;

impl Generator for FlakyGenerator {
    fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        if prompt.contains("### QUESTION:\ngold") {
            anyhow::bail!("model crashed")
        }
        Ok("Answer".to_string())
    }
}

async fn open_retriever() -> (Retriever<BagOfWordsEmbedder>, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    IndexBuilder::new(&BagOfWordsEmbedder)
        .build(&loan_chunks(), temp_dir.path())
        .await
        .expect("build should succeed");
    let retriever = Retriever::open(temp_dir.path(), BagOfWordsEmbedder)
        .await
        .expect("retriever should open");
    (retriever, temp_dir)
}

async fn run_session<G: Generator>(
    retriever: &Retriever<BagOfWordsEmbedder>,
    generator: &G,
    input: &str,
) -> (usize, String) {
    let pipeline = RagPipeline::new(retriever, generator);
    let mut output = Vec::new();
    let answered = run_interactive(&pipeline, Cursor::new(input), &mut output)
        .await
        .expect("session should run");
    (
        answered,
        String::from_utf8(output).expect("output should be utf-8"),
    )
}

#[test]
fn answer_block_layout() {
    let answer = Answer {
        text: "Up to 7 years.".to_string(),
        contexts: vec![
            RetrievedChunk {
                id: 1,
                text: "Car loan tenure".to_string(),
                score: 0.9,
            },
            RetrievedChunk {
                id: 4,
                text: "x".repeat(300),
                score: 0.1,
            },
        ],
    };
    let mut output = Vec::new();

    write_answer(&mut output, &answer).expect("should write");
    let text = String::from_utf8(output).expect("output should be utf-8");

    let expected = format!(
        "\n--- ANSWER ---\n\nUp to 7 years.\n\n--- SOURCES ---\n[1] Car loan tenure...\n[4] {}...\n",
        "x".repeat(200)
    );
    assert_eq!(text, expected);
}

#[tokio::test]
async fn session_answers_until_exit() {
    let (retriever, _temp_dir) = open_retriever().await;
    let generator = FixedGenerator::new("Not available in documents.");

    let (answered, output) = run_session(
        &retriever,
        &generator,
        "What is the car loan tenure?\n\n   \nEXIT\nhome loan rate?\n",
    )
    .await;

    assert_eq!(answered, 1);
    assert_eq!(output.matches("--- ANSWER ---").count(), 1);
    assert!(output.contains("Not available in documents."));
    assert!(output.contains("[1] Car loan tenure"));
    assert_eq!(output.matches("\n> ").count(), 4);
}

#[tokio::test]
async fn session_ends_at_eof_and_quit() {
    let (retriever, _temp_dir) = open_retriever().await;
    let generator = FixedGenerator::new("ok");

    let (answered, _) = run_session(&retriever, &generator, "home loan\ncar loan").await;
    assert_eq!(answered, 2);

    let (answered, output) = run_session(&retriever, &generator, "  quit  \nhome loan\n").await;
    assert_eq!(answered, 0);
    assert!(!output.contains("--- ANSWER ---"));

    let (answered, _) = run_session(&retriever, &generator, "").await;
    assert_eq!(answered, 0);
}

#[tokio::test]
async fn failed_question_does_not_end_session() {
    let (retriever, _temp_dir) = open_retriever().await;

    let (answered, output) = run_session(
        &retriever,
        &FlakyGenerator,
        "gold loan eligibility\nhome loan rate\n",
    )
    .await;

    assert_eq!(answered, 1);
    assert!(output.contains("Error: Generation error: model crashed"));
    assert_eq!(output.matches("--- ANSWER ---").count(), 1);
}

#[test]
fn chunk_command_writes_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let input = temp_dir.path().join("loan_data.txt");
    let output = temp_dir.path().join("knowledge_base").join("chunks.json");
    std::fs::write(&input, "A B C D E F").expect("should write input");

    let chunking = ChunkingConfig::new(3, 1).expect("valid chunking");
    let count = chunk(&input, &output, &chunking).expect("chunking should succeed");

    assert_eq!(count, 3);
    assert!(output.is_file());
}
