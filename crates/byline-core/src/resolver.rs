//! Author/affiliation resolution through an OpenAI-compatible chat
//! completion endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::AuthorRecord;
use crate::error::{PipelineError, error_chain};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

const INSTRUCTION: &str = "Extract the names of authors and their affiliations from the following text. \
Format the output as a JSON array of objects with 'Author' and 'Affiliation' as keys:\n\n";

/// Build the user message sent alongside [`SYSTEM_PROMPT`].
pub fn build_prompt(text: &str) -> String {
    let mut prompt = String::with_capacity(INSTRUCTION.len() + text.len());
    prompt.push_str(INSTRUCTION);
    prompt.push_str(text);
    prompt
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Sends first-page text to the model and turns its answer into
/// [`AuthorRecord`]s.
///
/// One request per call. There is no retry: the model is not deterministic,
/// so a second attempt may disagree with the first.
pub struct AuthorResolver {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

impl AuthorResolver {
    pub fn new(client: reqwest::Client, api_base: &str, model: &str, max_tokens: u32) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            model: model.to_string(),
            max_tokens,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the model for the authors in `text` and validate its answer.
    pub async fn resolve(
        &self,
        api_key: &str,
        text: &str,
    ) -> Result<Vec<AuthorRecord>, PipelineError> {
        let content = self.complete(api_key, text).await?;
        let authors = parse_authors(&content)?;
        tracing::debug!(model = %self.model, count = authors.len(), "authors resolved");
        Ok(authors)
    }

    /// Issue the chat completion and return the first choice's text, trimmed.
    async fn complete(&self, api_key: &str, text: &str) -> Result<String, PipelineError> {
        if api_key.trim().is_empty() {
            return Err(PipelineError::Model("no API key provided".into()));
        }

        let prompt = build_prompt(text);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: self.max_tokens,
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            max_tokens = self.max_tokens,
            prompt_chars = prompt.len(),
            "requesting chat completion"
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Model(error_chain(&e)))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PipelineError::Model(error_chain(&e)))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ChatResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or_else(|| body.trim().to_string());
            tracing::warn!(status = %status, "chat completion rejected");
            return Err(PipelineError::Model(format!("HTTP {}: {}", status, detail)));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| PipelineError::Model(format!("unexpected response shape: {}", e)))?;

        if let Some(err) = parsed.error {
            return Err(PipelineError::Model(err.message));
        }

        parsed
            .choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| PipelineError::Model("response contained no completion".into()))
    }
}

/// Parse the model's answer strictly as a JSON array of
/// `{"Author": ..., "Affiliation": ...}` objects.
///
/// A `null` value counts as an empty string. Extra keys are ignored. Any
/// other shape is reported as [`PipelineError::MalformedAuthors`] rather
/// than passed on to tabulation.
pub fn parse_authors(content: &str) -> Result<Vec<AuthorRecord>, PipelineError> {
    let value: Value = serde_json::from_str(content.trim()).map_err(PipelineError::ModelJson)?;
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(PipelineError::MalformedAuthors(format!(
                "expected a JSON array, got {}",
                json_kind(&other)
            )));
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let obj = item.as_object().ok_or_else(|| {
                PipelineError::MalformedAuthors(format!(
                    "element {} is {}, expected an object",
                    index,
                    json_kind(item)
                ))
            })?;
            Ok(AuthorRecord {
                author: text_field(index, obj, "Author")?,
                affiliation: text_field(index, obj, "Affiliation")?,
            })
        })
        .collect()
}

fn text_field(index: usize, obj: &Map<String, Value>, key: &str) -> Result<String, PipelineError> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Err(PipelineError::MalformedAuthors(format!(
            "element {}: \"{}\" must be a string, got {}",
            index,
            key,
            json_kind(other)
        ))),
        None => Err(PipelineError::MalformedAuthors(format!(
            "element {}: missing \"{}\"",
            index, key
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_appends_text_after_instruction() {
        let prompt = build_prompt("Jane Doe, Inria");
        assert!(prompt.starts_with("Extract the names of authors and their affiliations"));
        assert!(prompt.contains("'Author' and 'Affiliation' as keys:\n\nJane Doe, Inria"));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = reqwest::Client::new();
        let r = AuthorResolver::new(client.clone(), "https://api.example.com/v1/", "m", 10);
        assert_eq!(r.endpoint, "https://api.example.com/v1/chat/completions");
        let r = AuthorResolver::new(client, "https://api.example.com/v1", "m", 10);
        assert_eq!(r.endpoint, "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn parse_single_author() {
        let authors = parse_authors(r#"[{"Author":"A. Smith","Affiliation":"MIT"}]"#).unwrap();
        assert_eq!(
            authors,
            vec![AuthorRecord {
                author: "A. Smith".into(),
                affiliation: "MIT".into(),
            }]
        );
    }

    #[test]
    fn parse_keeps_order_and_duplicates() {
        let authors = parse_authors(
            r#"[
                {"Author": "B", "Affiliation": "X"},
                {"Author": "A", "Affiliation": "Y"},
                {"Author": "B", "Affiliation": "X"}
            ]"#,
        )
        .unwrap();
        let names: Vec<&str> = authors.iter().map(|a| a.author.as_str()).collect();
        assert_eq!(names, ["B", "A", "B"]);
    }

    #[test]
    fn parse_empty_array() {
        assert!(parse_authors("[]").unwrap().is_empty());
    }

    #[test]
    fn parse_tolerates_surrounding_whitespace_and_extra_keys() {
        let authors =
            parse_authors("\n  [{\"Author\":\"C\",\"Affiliation\":\"D\",\"Email\":\"c@d\"}]  \n")
                .unwrap();
        assert_eq!(authors[0].affiliation, "D");
    }

    #[test]
    fn parse_null_affiliation_is_empty() {
        let authors = parse_authors(r#"[{"Author":"Solo","Affiliation":null}]"#).unwrap();
        assert_eq!(authors[0].affiliation, "");
    }

    #[test]
    fn invalid_json_reports_parser_detail() {
        let err = parse_authors("Here are the authors: Smith (MIT)").unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, PipelineError::ModelJson(_)));
        assert!(msg.contains("expected value"), "{msg}");
    }

    #[test]
    fn fenced_json_is_not_accepted() {
        let err = parse_authors("```json\n[]\n```").unwrap_err();
        assert!(matches!(err, PipelineError::ModelJson(_)));
    }

    #[test]
    fn non_array_is_malformed() {
        let err = parse_authors(r#"{"Author":"A","Affiliation":"B"}"#).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedAuthors(_)));
        assert!(err.to_string().contains("expected a JSON array, got an object"));
    }

    #[test]
    fn missing_key_names_the_element() {
        let err = parse_authors(r#"[{"Author":"A","Affiliation":"B"},{"Author":"C"}]"#)
            .unwrap_err();
        assert!(err.to_string().contains("element 1: missing \"Affiliation\""));
    }

    #[test]
    fn non_object_element_is_malformed() {
        let err = parse_authors(r#"["A. Smith"]"#).unwrap_err();
        assert!(err.to_string().contains("element 0 is a string"));
    }

    #[test]
    fn non_string_value_is_malformed() {
        let err = parse_authors(r#"[{"Author":["A","B"],"Affiliation":"X"}]"#).unwrap_err();
        assert!(
            err.to_string()
                .contains("\"Author\" must be a string, got an array")
        );
    }
}
