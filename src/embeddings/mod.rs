// Embeddings module
// Ollama integration plus the vector math shared by indexing and retrieval

pub mod ollama;


use anyhow::Result;

pub use ollama::{GenerationOptions, OllamaClient};

/// Turns texts into dense vectors. Chunks and queries must go through the
/// same implementation so their vectors share an embedding space.
pub trait Embedder {
    /// Name of the underlying model, recorded with every index it builds
    fn model_name(&self) -> &str;

    /// Embed every text, returning one vector per input in input order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Embedder returned no vector for input"))
    }
}

/// Produces a completion for a fully assembled prompt
pub trait Generator {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Scale a vector to unit length in place. Zero vectors are left untouched.
#[inline]
pub fn normalize_l2(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Inner product; equals cosine similarity for unit vectors
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Whether two Ollama model names refer to the same model. A name without a
/// tag means `:latest`.
#[inline]
pub fn same_model(a: &str, b: &str) -> bool {
    fn with_tag(name: &str) -> String {
        if name.contains(':') {
            name.to_string()
        } else {
            format!("{}:latest", name)
        }
    }

    with_tag(a.trim()) == with_tag(b.trim())
}
