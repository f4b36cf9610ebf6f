use std::collections::HashMap;

use crate::embeddings::{Embedder, Generator};

pub const VOCABULARY: &[&str] = &[
    "home", "car", "education", "gold", "loan", "interest", "rate", "tenure", "years", "fee",
    "processing", "eligibility", "income", "women", "concession", "msme",
];

/// Counts vocabulary words; texts sharing words land close together
pub struct BagOfWordsEmbedder;

impl Embedder for BagOfWordsEmbedder {
    fn model_name(&self) -> &str {
        "bag-of-words"
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let positions: HashMap<&str, usize> =
            VOCABULARY.iter().enumerate().map(|(i, w)| (*w, i)).collect();

        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0; VOCABULARY.len() + 1];
                vector[VOCABULARY.len()] = 0.01;
                for word in text.split_whitespace() {
                    let word = word
                        .trim_matches(|c: char| !c.is_alphanumeric())
                        .to_lowercase();
                    if let Some(&i) = positions.get(word.as_str()) {
                        vector[i] += 1.0;
                    }
                }
                vector
            })
            .collect())
    }
}

/// Always answers with the same text and remembers the last prompt
pub struct FixedGenerator {
    pub reply: String,
    pub last_prompt: std::cell::RefCell<Option<String>>,
}

impl FixedGenerator {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            last_prompt: std::cell::RefCell::new(None),
        }
    }
}

impl Generator for FixedGenerator {
    fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        *self.last_prompt.borrow_mut() = Some(prompt.to_string());
        Ok(self.reply.clone())
    }
}

pub fn loan_chunks() -> Vec<crate::chunker::Chunk> {
    [
        "Home loan interest rate starts at 8.35 percent for salaried applicants.",
        "Car loan tenure is up to 7 years with a processing fee of 0.25 percent.",
        "Education loan covers tuition abroad with a concession for women students.",
        "Gold loan eligibility depends on the purity and weight of the gold.",
        "MSME loan products support working capital and term finance.",
    ]
    .iter()
    .enumerate()
    .map(|(i, text)| crate::chunker::Chunk {
        id: i as u64,
        text: (*text).to_string(),
    })
    .collect()
}
