use super::*;
use crate::indexer::IndexBuilder;
use crate::rag::test_support::{BagOfWordsEmbedder, FixedGenerator, loan_chunks};
use tempfile::TempDir;

struct UnreachableGenerator;

impl Generator for UnreachableGenerator {
    fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        anyhow::bail!("Connection refused")
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

#[tokio::test]
async fn answer_returns_generation_and_contexts() {
    let (retriever, _temp_dir) = open_retriever().await;
    let generator = FixedGenerator::new("Not available in documents.");
    let pipeline = RagPipeline::new(&retriever, &generator);

    let question = "What is the gold loan eligibility?";
    let expected_contexts = retriever
        .retrieve(question, DEFAULT_TOP_K)
        .await
        .expect("retrieval should succeed");
    let answer = pipeline.answer(question).await.expect("answer should succeed");

    assert_eq!(answer.text, "Not available in documents.");
    assert_eq!(answer.contexts.len(), 3);
    assert_eq!(answer.contexts, expected_contexts);
}

#[tokio::test]
async fn prompt_carries_question_and_retrieved_chunks() {
    let (retriever, _temp_dir) = open_retriever().await;
    let generator = FixedGenerator::new("Up to 7 years.");
    let pipeline = RagPipeline::new(&retriever, &generator).with_top_k(2);

    let answer = pipeline
        .answer("car loan tenure")
        .await
        .expect("answer should succeed");
    let prompt = generator
        .last_prompt
        .borrow()
        .clone()
        .expect("generator should have been called");

    assert_eq!(answer.contexts.len(), 2);
    assert_eq!(prompt, build_prompt("car loan tenure", &answer.contexts));
    assert!(prompt.contains("[Chunk 1]\nCar loan tenure"));
}

#[tokio::test]
async fn generator_failure_is_a_generation_error() {
    let (retriever, _temp_dir) = open_retriever().await;
    let pipeline = RagPipeline::new(&retriever, &UnreachableGenerator);

    let result = pipeline.answer("home loan rate").await;
    let Err(RagError::Generation(message)) = result else {
        panic!("expected a generation error");
    };
    assert!(message.contains("Connection refused"));
}
