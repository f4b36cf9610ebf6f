#[cfg(test)]
mod tests;

use tracing::{debug, info};

use super::{RetrievedChunk, Retriever, build_prompt};
use crate::embeddings::{Embedder, Generator};
use crate::{RagError, Result};

/// Default number of chunks placed in the prompt
pub const DEFAULT_TOP_K: usize = 3;

/// A generated answer and the chunks it was grounded on
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub contexts: Vec<RetrievedChunk>,
}

/// Retrieval, prompt assembly and generation wired together
pub struct RagPipeline<'a, E: Embedder, G: Generator> {
    retriever: &'a Retriever<E>,
    generator: &'a G,
    top_k: usize,
}

impl<'a, E: Embedder, G: Generator> RagPipeline<'a, E, G> {
    #[inline]
    pub fn new(retriever: &'a Retriever<E>, generator: &'a G) -> Self {
        Self {
            retriever,
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Answer one question from the indexed documents
    #[inline]
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let contexts = self.retriever.retrieve(question, self.top_k).await?;
        let prompt = build_prompt(question, &contexts);
        debug!(
            "Built prompt of {} chars from {} chunks",
            prompt.len(),
            contexts.len()
        );

        let text = self
            .generator
            .generate(&prompt)
            .map_err(|e| RagError::Generation(format!("{:#}", e)))?;

        info!("Generated answer of {} chars", text.len());
        Ok(Answer { text, contexts })
    }
}
