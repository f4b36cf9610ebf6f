// Shared fixtures for integration tests: a mock Ollama server whose
// embeddings are word counts over a fixed vocabulary

use local_rag::config::{Config, OllamaConfig};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const VOCABULARY: &[&str] = &[
    "home", "car", "education", "gold", "loan", "interest", "rate", "tenure", "years", "fee",
    "processing", "women", "concession", "msme", "margin", "eligibility",
];

pub const LOAN_DOCUMENT: &str = "\
Home loan interest rate starts at 8.35 percent per annum for salaried applicants with a good credit score. \
Car loan tenure is up to 7 years and the processing fee is 0.25 percent of the loan amount. \
Education loan for studies abroad offers a concession of 0.50 percent for women students. \
Gold loan eligibility depends on the purity of the gold and the margin is 25 percent. \
MSME loan products support working capital and term finance for small enterprises.";

pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0_f32; VOCABULARY.len() + 1];
    vector[VOCABULARY.len()] = 0.01;
    for word in text.split_whitespace() {
        let word = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if let Some(i) = VOCABULARY.iter().position(|w| *w == word) {
            vector[i] += 1.0;
        }
    }
    vector
}

/// Answers `/api/embed` by embedding each input with [`bag_of_words`]
pub struct EmbedResponder;

impl Respond for EmbedResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Ok(body) = serde_json::from_slice::<Value>(&request.body) else {
            return ResponseTemplate::new(400).set_body_string("invalid JSON");
        };
        let embeddings: Vec<Vec<f32>> = body["input"]
            .as_array()
            .map(|inputs| {
                inputs
                    .iter()
                    .map(|input| bag_of_words(input.as_str().unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default();

        ResponseTemplate::new(200).set_body_json(json!({
            "model": "all-minilm",
            "embeddings": embeddings
        }))
    }
}

pub async fn mount_embeddings(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(EmbedResponder)
        .mount(server)
        .await;
}

pub fn config_for(server: &MockServer) -> Config {
    let address = server.address();
    Config {
        ollama: OllamaConfig {
            host: address.ip().to_string(),
            port: address.port(),
            embedding_dimension: (VOCABULARY.len() + 1) as u32,
            batch_size: 2,
            ..OllamaConfig::default()
        },
        ..Config::default()
    }
}
