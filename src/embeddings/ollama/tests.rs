use super::*;
use crate::config::OllamaConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, dimension: u32) -> Config {
    let address = server.address();
    Config {
        ollama: OllamaConfig {
            host: address.ip().to_string(),
            port: address.port(),
            embedding_dimension: dimension,
            batch_size: 2,
            ..OllamaConfig::default()
        },
        ..Config::default()
    }
}

#[test]
fn client_configuration() {
    let config = Config {
        ollama: OllamaConfig {
            host: "test-host".to_string(),
            port: 1234,
            embedding_model: "test-embed".to_string(),
            generation_model: "test-gen".to_string(),
            batch_size: 128,
            ..OllamaConfig::default()
        },
        ..Config::default()
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.embedding_model, "test-embed");
    assert_eq!(client.generation_model(), "test-gen");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, 1);
    assert_eq!(client.expected_dimension, Some(384));
}

#[test]
fn retries_and_timeout_come_from_config() {
    let mut config = Config::default();
    config.ollama.retry_attempts = 5;
    config.ollama.request_timeout_seconds = 60;
    let client = OllamaClient::new(&config).expect("Failed to create client");
    assert_eq!(client.retry_attempts, 5);

    config.ollama.retry_attempts = 0;
    let client = OllamaClient::new(&config).expect("Failed to create client");
    assert_eq!(client.retry_attempts, 1);

    assert_eq!(request_timeout(0), None);
    assert_eq!(request_timeout(60), Some(Duration::from_secs(60)));
}

#[test]
fn completion_extraction() {
    assert_eq!(
        extract_completion(200, r#"{"response": "Rates start at 8.35%."}"#.to_string()),
        "Rates start at 8.35%."
    );

    let raw = r#"{"error": "model 'phi3' not found"}"#.to_string();
    assert_eq!(extract_completion(404, raw.clone()), raw);

    assert_eq!(extract_completion(502, "Bad Gateway".to_string()), "Bad Gateway");

    let non_string = r#"{"response": 42}"#.to_string();
    assert_eq!(extract_completion(200, non_string.clone()), non_string);
}

#[test]
fn embedding_model_override_drops_configured_dimension() {
    let client = OllamaClient::new(&Config::default())
        .expect("Failed to create client")
        .with_embedding_model("all-minilm:latest");
    assert_eq!(client.model_name(), "all-minilm:latest");
    assert_eq!(client.expected_dimension, Some(384));

    let client = client.with_embedding_model("nomic-embed-text");
    assert_eq!(client.model_name(), "nomic-embed-text");
    assert_eq!(client.expected_dimension, None);
}

#[test]
fn generation_options_validation() {
    assert!(GenerationOptions::default().validate().is_ok());

    let options = GenerationOptions {
        repeat_penalty: 0.0,
        ..GenerationOptions::default()
    };
    assert!(options.validate().is_err());

    let options = GenerationOptions {
        top_k: 0,
        ..GenerationOptions::default()
    };
    assert!(options.validate().is_err());
}

#[tokio::test]
async fn generate_sends_expected_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "phi3",
            "prompt": "What is the home loan tenure?",
            "stream": false,
            "options": {
                "num_ctx": 1200,
                "top_k": 40
            }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"model": "phi3", "response": "Up to 30 years.", "done": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 384)).expect("client should build");
    let answer = client
        .generate("What is the home loan tenure?")
        .expect("generation should succeed");

    assert_eq!(answer, "Up to 30 years.");
}

#[tokio::test]
async fn generate_surfaces_raw_error_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string(r#"{"error":"model 'phi3' not found"}"#),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 384)).expect("client should build");
    let answer = client.generate("anything").expect("raw payload is returned");

    assert_eq!(answer, r#"{"error":"model 'phi3' not found"}"#);
}

#[test]
fn generate_fails_when_service_unreachable() {
    let config = Config {
        ollama: OllamaConfig {
            host: "127.0.0.1".to_string(),
            port: 9,
            request_timeout_seconds: 2,
            ..OllamaConfig::default()
        },
        ..Config::default()
    };
    let client = OllamaClient::new(&config).expect("client should build");

    assert!(client.generate("hello").is_err());
}

#[tokio::test]
async fn embed_batch_splits_requests_by_batch_size() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"model": "all-minilm", "input": ["a", "b"]})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0, 0.0], [0.0, 1.0]]})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["c"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.5, 0.5]]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 2)).expect("client should build");
    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let vectors = client.embed_batch(&texts).expect("embedding should succeed");

    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]);
}

#[tokio::test]
async fn embed_rejects_unexpected_dimension() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0, 0.0]]})))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 384)).expect("client should build");
    let result = client.embed("query");

    assert!(result.is_err());
}

#[tokio::test]
async fn embed_rejects_count_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": []})))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 2)).expect("client should build");

    assert!(client.embed("query").is_err());
}

#[tokio::test]
async fn embed_error_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(400).set_body_string("model not found"))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 16)).expect("client should build");
    let error = client.embed("query").expect_err("embedding should fail");

    assert!(format!("{:#}", error).contains("HTTP 400"));
}

#[tokio::test]
async fn overridden_model_returns_its_own_dimension() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"model": "nomic-embed-text"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.1, 0.2, 0.3]]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 384))
        .expect("client should build")
        .with_embedding_model("nomic-embed-text");
    let vector = client.embed("home loan").expect("embedding should succeed");

    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn server_errors_are_retried_when_enabled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0, 0.0]]})))
        .mount(&server)
        .await;

    let mut config = config_for(&server, 2);
    config.ollama.retry_attempts = 2;
    let client = OllamaClient::new(&config).expect("client should build");

    let vector = client.embed("query").expect("embedding should succeed after retry");
    assert_eq!(vector, vec![1.0, 0.0]);
}

#[tokio::test]
async fn server_errors_fail_without_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 16)).expect("client should build");

    assert!(client.embed("query").is_err());
}
