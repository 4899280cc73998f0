//! AuthorResolver against a mocked chat completion endpoint.

use byline_core::resolver::{AuthorResolver, SYSTEM_PROMPT};
use byline_core::{AuthorRecord, PipelineError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn resolver(server: &MockServer) -> AuthorResolver {
    AuthorResolver::new(
        reqwest::Client::new(),
        &format!("{}/v1", server.uri()),
        "gpt-4",
        1000,
    )
}

#[tokio::test]
async fn sends_model_messages_and_token_bound() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4",
            "max_tokens": 1000,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"[{"Author":"A. Smith","Affiliation":"MIT"}]"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let authors = resolver(&server)
        .resolve("sk-test", "A. Smith, MIT")
        .await
        .unwrap();

    assert_eq!(
        authors,
        vec![AuthorRecord {
            author: "A. Smith".into(),
            affiliation: "MIT".into(),
        }]
    );

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[0]["content"], SYSTEM_PROMPT);
    assert_eq!(messages[1]["role"], "user");
    assert!(
        messages[1]["content"]
            .as_str()
            .unwrap()
            .ends_with("\n\nA. Smith, MIT")
    );
}

#[tokio::test]
async fn non_json_content_is_a_json_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("The authors are A. Smith (MIT).")),
        )
        .mount(&server)
        .await;

    let err = resolver(&server).resolve("sk-test", "text").await.unwrap_err();
    assert!(matches!(err, PipelineError::ModelJson(_)));
    let msg = err.to_string();
    assert!(msg.starts_with("Error parsing JSON from OpenAI response: "));
    assert!(msg.contains("line 1 column 1"), "{msg}");
}

#[tokio::test]
async fn auth_rejection_surfaces_api_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Incorrect API key provided: sk-bad.",
                "type": "invalid_request_error",
                "code": "invalid_api_key"
            }
        })))
        .mount(&server)
        .await;

    let err = resolver(&server).resolve("sk-bad", "text").await.unwrap_err();
    assert!(matches!(err, PipelineError::Model(_)));
    let msg = err.to_string();
    assert!(msg.starts_with("Error using OpenAI API: HTTP 401"), "{msg}");
    assert!(msg.contains("Incorrect API key provided"), "{msg}");
}

#[tokio::test]
async fn rate_limit_with_plain_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = resolver(&server).resolve("sk-test", "text").await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("429"), "{msg}");
    assert!(msg.contains("slow down"), "{msg}");
}

#[tokio::test]
async fn response_without_choices_is_a_model_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = resolver(&server).resolve("sk-test", "text").await.unwrap_err();
    assert!(matches!(err, PipelineError::Model(_)));
    assert!(err.to_string().contains("no completion"));
}

#[tokio::test]
async fn malformed_element_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion(r#"[{"Author":"A. Smith"}]"#)),
        )
        .mount(&server)
        .await;

    let err = resolver(&server).resolve("sk-test", "text").await.unwrap_err();
    assert!(matches!(err, PipelineError::MalformedAuthors(_)));
    assert!(err.to_string().contains("missing \"Affiliation\""));
}

#[tokio::test]
async fn missing_key_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("[]")))
        .expect(0)
        .mount(&server)
        .await;

    let err = resolver(&server).resolve("  ", "text").await.unwrap_err();
    assert!(err.to_string().contains("no API key"));
}
