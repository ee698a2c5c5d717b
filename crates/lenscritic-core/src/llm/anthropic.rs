//! Anthropic provider using the Messages API.
//!
//! Sends image + prompt with base64 image content blocks. The model replies
//! in free-form text, sometimes wrapped in a markdown code fence, so the
//! fence is stripped before parsing.

use super::provider::{status_error, transport_error, CritiqueProvider, CritiqueRequest};
use super::schema;
use crate::error::CritiqueError;
use crate::types::{CritiqueResult, Provider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic provider using the Messages API.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
    endpoint: String,
}

impl AnthropicProvider {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            endpoint: format!("{}/v1/messages", endpoint.trim_end_matches('/')),
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "image")]
    Image { source: ImageSource },
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

// --- Response types ---

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseContent>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ResponseContent {
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Strip a surrounding markdown code fence (```` ```json ```` or ```` ``` ````)
/// and whitespace.
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        // Drop the info string ("json") up to the end of the opening line.
        body = rest
            .strip_prefix("json")
            .unwrap_or(rest)
            .trim_start_matches([' ', '\t']);
        body = body.strip_prefix('\n').unwrap_or(body);
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

#[async_trait]
impl CritiqueProvider for AnthropicProvider {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn submit_critique(
        &self,
        request: &CritiqueRequest,
    ) -> Result<CritiqueResult, CritiqueError> {
        let start = Instant::now();

        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            source_type: "base64".to_string(),
                            media_type: request.image.media_type.clone(),
                            data: request.image.data.clone(),
                        },
                    },
                    ContentBlock::Text {
                        text: request.prompt.clone(),
                    },
                ],
            }],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(Provider::Anthropic, e))?;

        if !resp.status().is_success() {
            return Err(status_error(Provider::Anthropic, resp).await);
        }

        let messages_resp: MessagesResponse =
            resp.json().await.map_err(|e| CritiqueError::Parse {
                provider: Provider::Anthropic,
                message: e.to_string(),
            })?;

        if let Some(usage) = &messages_resp.usage {
            tracing::debug!(
                "Anthropic responded in {}ms ({} tokens)",
                start.elapsed().as_millis(),
                usage.input_tokens + usage.output_tokens
            );
        }

        let text = messages_resp
            .content
            .into_iter()
            .find_map(|c| c.text)
            .ok_or_else(|| CritiqueError::Parse {
                provider: Provider::Anthropic,
                message: "response has no text content".to_string(),
            })?;

        schema::parse_critique(Provider::Anthropic, strip_code_fences(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ImageInput;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CRITIQUE: &str =
        r#"{"title":"T","overallScore":80,"summary":"S","strengths":["a"],"improvements":["b"]}"#;

    fn request() -> CritiqueRequest {
        CritiqueRequest {
            image: ImageInput::jpeg(&[0xFF, 0xD8, 0xFF]),
            prompt: "critique this".to_string(),
            provider: Provider::Anthropic,
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 2000,
        }
    }

    fn messages_response(text: &str) -> serde_json::Value {
        json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-20241022",
            "content": [{ "type": "text", "text": text }],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 1500, "output_tokens": 400 }
        })
    }

    async fn submit_with_reply(reply: &str) -> Result<CritiqueResult, CritiqueError> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(messages_response(reply)))
            .mount(&server)
            .await;
        let provider = AnthropicProvider::new(&server.uri(), "test-key", "claude-3-5-sonnet-20241022");
        provider.submit_critique(&request()).await
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  \n{\"a\":1}  \n"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn test_strip_code_fences_leaves_inner_backticks() {
        let text = "```json\n{\"a\":\"use ``` here\"}\n```";
        assert_eq!(strip_code_fences(text), "{\"a\":\"use ``` here\"}");
    }

    #[tokio::test]
    async fn test_submit_sends_headers_and_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({
                "model": "claude-3-5-sonnet-20241022",
                "max_tokens": 2000,
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "image", "source": { "type": "base64", "media_type": "image/jpeg", "data": "/9j/" } },
                        { "type": "text", "text": "critique this" }
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(messages_response(CRITIQUE)))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            AnthropicProvider::new(&server.uri(), "test-key", "claude-3-5-sonnet-20241022");
        let result = provider.submit_critique(&request()).await.unwrap();
        assert_eq!(result.title, "T");
    }

    #[tokio::test]
    async fn test_fenced_reply_parses_like_plain_json() {
        let plain = submit_with_reply(CRITIQUE).await.unwrap();
        let fenced = submit_with_reply(&format!("```json\n{CRITIQUE}\n```"))
            .await
            .unwrap();
        assert_eq!(plain, fenced);
    }

    #[tokio::test]
    async fn test_prose_reply_is_parse_error() {
        let err = submit_with_reply("Here is my critique: great photo!")
            .await
            .unwrap_err();
        assert!(matches!(err, CritiqueError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_missing_summary_is_invalid() {
        let reply = r#"```json
{"title":"T","overallScore":80,"strengths":["a"],"improvements":["b"]}
```"#;
        match submit_with_reply(reply).await {
            Err(CritiqueError::InvalidResult { fields, .. }) => assert_eq!(fields, vec!["summary"]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_overloaded_error_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(json!({
                "type": "error",
                "error": { "type": "overloaded_error", "message": "Overloaded" }
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(&server.uri(), "test-key", "claude-3-haiku-20240307");
        let err = provider.submit_critique(&request()).await.unwrap_err();
        assert!(matches!(err, CritiqueError::Http { status: Some(529), .. }));
        assert_eq!(err.to_string(), "Anthropic error: Overloaded");
    }
}
