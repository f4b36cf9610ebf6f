#[cfg(test)]
mod tests;

use super::RetrievedChunk;

const INSTRUCTIONS: &str = "Use ONLY the context below to answer the question.\n\
If the answer is not available in the context, say \"Not available in documents.\"";

/// Assemble the grounded prompt sent to the generation model.
///
/// Each context block is labeled with its chunk id so answers can be traced
/// back to sources. The question is inserted verbatim and nothing is
/// truncated.
#[inline]
pub fn build_prompt(question: &str, contexts: &[RetrievedChunk]) -> String {
    let context = contexts
        .iter()
        .map(|chunk| format!("[Chunk {}]\n{}", chunk.id, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}\n\n### CONTEXT:\n{}\n\n### QUESTION:\n{}\n\n### ANSWER:",
        INSTRUCTIONS, context, question
    )
    .trim()
    .to_string()
}
