use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatGateway, ChatMessage, FragmentStream, ProviderError};
use crate::config::ProviderConfig;

/// Streams chat completions from any OpenAI-compatible endpoint
/// (OpenAI, DashScope compatible mode, Gemini's OpenAI surface, ...).
#[derive(Debug, Clone, Default)]
pub struct OpenAiGateway {
    client: Client,
}

impl OpenAiGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway whose requests fail with a transient [`ProviderError::Http`]
    /// once `timeout` has elapsed, body included.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    stream_options: StreamOptions,
}

#[derive(Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Deserialize)]
struct OpenAiStreamResponse {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    usage: Option<OpenAiUsage>,
    error: Option<OpenAiErrorBody>,
}

#[derive(Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: OpenAiDelta,
}

#[derive(Deserialize, Default)]
struct OpenAiDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Deserialize)]
struct OpenAiErrorEnvelope {
    error: OpenAiErrorBody,
}

#[derive(Deserialize)]
struct OpenAiErrorBody {
    #[serde(default)]
    message: String,
}

/// What one server-sent-events line means for the answer.
#[derive(Debug, PartialEq)]
enum SseLine {
    Fragment(String),
    Done,
    Failed(String),
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix("data:").map(str::trim) else {
        // comments, `event:` fields, keep-alives
        return SseLine::Skip;
    };
    if data == "[DONE]" {
        return SseLine::Done;
    }

    let parsed: OpenAiStreamResponse = match serde_json::from_str(data) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!(error = %e, "skipping unparsable stream line");
            return SseLine::Skip;
        }
    };

    if let Some(error) = parsed.error {
        return SseLine::Failed(error.message);
    }
    if let Some(usage) = parsed.usage {
        tracing::info!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "completion usage"
        );
    }
    match parsed.choices.into_iter().next().and_then(|c| c.delta.content) {
        Some(content) if !content.is_empty() => SseLine::Fragment(content),
        _ => SseLine::Skip,
    }
}

/// Splits a byte stream into lines before decoding, so a multi-byte
/// character cut in half by the network is decoded only once it is whole.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    fn next_line(&mut self) -> Option<String> {
        let pos = self.pending.iter().position(|b| *b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&raw).trim().to_string())
    }

    /// Whatever is left after the body ended without a trailing newline.
    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&raw).trim().to_string())
    }
}

async fn response_to_error(resp: reqwest::Response) -> ProviderError {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<OpenAiErrorEnvelope>(&text)
        .map(|e| e.error.message)
        .unwrap_or(text);
    ProviderError::Api { status, message }
}

impl ChatGateway for OpenAiGateway {
    fn stream_completion(
        &self,
        messages: Vec<ChatMessage>,
        config: &ProviderConfig,
    ) -> FragmentStream {
        let body = OpenAiRequest {
            model: config.model().to_string(),
            messages,
            stream: true,
            stream_options: StreamOptions {
                include_usage: true,
            },
        };

        let mut req = self
            .client
            .post(config.completions_url())
            .header("Content-Type", "application/json")
            .json(&body);

        if !config.api_key().is_empty() {
            req = req.header("Authorization", format!("Bearer {}", config.api_key()));
        }

        Box::pin(async_stream::stream! {
            let resp = match req.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(ProviderError::Http(e));
                    return;
                }
            };

            if !resp.status().is_success() {
                yield Err(response_to_error(resp).await);
                return;
            }

            let mut bytes = resp.bytes_stream();
            let mut lines = LineBuffer::default();
            let mut ended = false;
            let mut fragments = 0usize;

            while !ended {
                match bytes.next().await {
                    Some(Ok(chunk)) => lines.push(&chunk),
                    Some(Err(e)) => {
                        yield Err(ProviderError::Http(e));
                        return;
                    }
                    None => ended = true,
                }

                let mut ready = Vec::new();
                while let Some(line) = lines.next_line() {
                    ready.push(line);
                }
                if ended {
                    ready.extend(lines.finish());
                }

                for line in ready {
                    match parse_sse_line(&line) {
                        SseLine::Fragment(text) => {
                            fragments += 1;
                            yield Ok(text);
                        }
                        SseLine::Done => {
                            tracing::debug!(fragments, "completion stream done");
                            return;
                        }
                        SseLine::Failed(message) => {
                            yield Err(ProviderError::Stream(message));
                            return;
                        }
                        SseLine::Skip => {}
                    }
                }
            }

            tracing::debug!(fragments, "completion body ended without [DONE]");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderErrorKind;
    use futures::TryStreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse(events: &[&str]) -> String {
        events
            .iter()
            .map(|e| format!("data: {}\n\n", e))
            .collect()
    }

    fn delta(text: &str) -> String {
        json!({ "choices": [{ "delta": { "content": text }, "finish_reason": null }] }).to_string()
    }

    async fn collect(
        server: &MockServer,
        api_key: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let config = ProviderConfig::new(api_key, server.uri(), "qwen3-max");
        OpenAiGateway::new()
            .stream_completion(vec![ChatMessage::user("hi")], &config)
            .try_collect()
            .await
    }

    #[test]
    fn test_parse_sse_line() {
        assert_eq!(parse_sse_line("data: [DONE]"), SseLine::Done);
        assert_eq!(parse_sse_line(": keep-alive"), SseLine::Skip);
        assert_eq!(parse_sse_line(""), SseLine::Skip);
        assert_eq!(
            parse_sse_line(&format!("data: {}", delta("ok"))),
            SseLine::Fragment("ok".into())
        );
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[],"usage":{"prompt_tokens":3,"completion_tokens":1,"total_tokens":4}}"#),
            SseLine::Skip
        );
        assert_eq!(
            parse_sse_line(r#"data: {"error":{"message":"overloaded"}}"#),
            SseLine::Failed("overloaded".into())
        );
    }

    #[test]
    fn test_line_buffer_keeps_split_thai_characters() {
        let line = format!("data: {}\n", delta("สวัสดี"));
        let bytes = line.as_bytes();
        // cut inside the first Thai character
        let cut = line.find('ส').unwrap() + 1;

        let mut buffer = LineBuffer::default();
        buffer.push(&bytes[..cut]);
        assert_eq!(buffer.next_line(), None);
        buffer.push(&bytes[cut..]);

        let decoded = buffer.next_line().unwrap();
        assert_eq!(parse_sse_line(&decoded), SseLine::Fragment("สวัสดี".into()));
        assert_eq!(buffer.finish(), None);
    }

    #[tokio::test]
    async fn test_stream_yields_fragments_in_order() {
        let server = MockServer::start().await;
        let usage = r#"{"choices":[],"usage":{"prompt_tokens":12,"completion_tokens":3,"total_tokens":15}}"#;
        let body = sse(&[&delta("Hel"), &delta("lo"), &delta(" ข้อ 4.1"), usage, "[DONE]"]);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "qwen3-max",
                "stream": true,
                "stream_options": { "include_usage": true }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .expect(1)
            .mount(&server)
            .await;

        let fragments = collect(&server, "test-key").await.unwrap();
        assert_eq!(fragments, vec!["Hel", "lo", " ข้อ 4.1"]);
    }

    #[tokio::test]
    async fn test_stream_stops_at_done() {
        let server = MockServer::start().await;
        let body = sse(&[&delta("a"), "[DONE]", &delta("never")]);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        assert_eq!(collect(&server, "k").await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_body_without_trailing_newline() {
        let server = MockServer::start().await;
        let body = format!("data: {}\n\ndata: {}", delta("one"), delta("two"));
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        assert_eq!(collect(&server, "k").await.unwrap(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Incorrect API key provided", "code": "invalid_api_key" }
            })))
            .mount(&server)
            .await;

        let err = collect(&server, "bad").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.kind(), ProviderErrorKind::Unauthorized);
        assert!(err.to_string().contains("Incorrect API key provided"));
    }

    #[tokio::test]
    async fn test_model_not_found_keeps_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such model"))
            .mount(&server)
            .await;

        let err = collect(&server, "k").await.unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::ModelNotFound);
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "no such model");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = collect(&server, "k").await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn test_error_inside_stream_ends_stream() {
        let server = MockServer::start().await;
        let body = sse(&[&delta("partial"), r#"{"error":{"message":"upstream reset"}}"#]);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let config = ProviderConfig::new("k", server.uri(), "m");
        let items: Vec<_> = OpenAiGateway::new()
            .stream_completion(vec![ChatMessage::user("hi")], &config)
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
        assert!(matches!(&items[1], Err(ProviderError::Stream(m)) if m == "upstream reset"));
    }

    #[tokio::test]
    async fn test_timeout_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(sse(&["[DONE]"]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let config = ProviderConfig::new("k", server.uri(), "m");
        let gateway = OpenAiGateway::with_timeout(Duration::from_millis(50)).unwrap();
        let err = gateway
            .stream_completion(vec![ChatMessage::user("hi")], &config)
            .try_collect::<Vec<_>>()
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Http(_)));
        assert!(err.is_transient());
    }
}
