// RAG module
// Query-time path: retrieve chunks, assemble the prompt, ask the generator

pub mod pipeline;
pub mod prompt;
pub mod retriever;

#[cfg(test)]
pub(crate) mod test_support;

pub use pipeline::{Answer, RagPipeline};
pub use prompt::build_prompt;
pub use retriever::{RetrievedChunk, Retriever};
