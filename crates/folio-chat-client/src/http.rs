//! HTTP implementation of the chat backend seams.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use reqwest_retry_after::RetryAfterMiddleware;

use folio_chat_common::{ClientConfig, GenerateRequest, LeaveMessageParams, Message};

use crate::delta::decode_delta_stream;
use crate::error::{ClientError, ProblemDetails};
use crate::{ChatTransport, DeltaStream, MessageGateway};

/// Client for the portfolio chat backend.
///
/// Generation requests go through a retrying client; retries cover opening
/// the request only, never a body that is already streaming. Contact-form
/// submissions use a plain client so that one acceptance is one POST.
///
/// Cloning is cheap: the underlying connection pools are shared.
#[derive(Clone)]
pub struct HttpChatClient {
    client: ClientWithMiddleware,
    submit_client: reqwest::Client,
    generate_url: reqwest::Url,
    leave_message_url: reqwest::Url,
}

impl std::fmt::Debug for HttpChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatClient")
            .field("generate_url", &self.generate_url.as_str())
            .field("leave_message_url", &self.leave_message_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpChatClient {
    /// Creates a client for the backend described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigurationError`] if either endpoint URL is
    /// invalid, or [`ClientError::NetworkError`] if the HTTP client cannot be
    /// built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let generate_url = config.generate_url().map_err(|e| {
            ClientError::ConfigurationError(format!(
                "Invalid URL '{}{}': {e}",
                config.base_url, config.generate_path
            ))
        })?;
        let leave_message_url = config.leave_message_url().map_err(|e| {
            ClientError::ConfigurationError(format!(
                "Invalid URL '{}{}': {e}",
                config.base_url, config.leave_message_path
            ))
        })?;
        if !matches!(generate_url.scheme(), "http" | "https") {
            return Err(ClientError::ConfigurationError(format!(
                "Unsupported URL scheme '{}'",
                generate_url.scheme()
            )));
        }

        if config.retry_config.initial_delay > config.retry_config.max_delay {
            return Err(ClientError::ConfigurationError(format!(
                "Retry initial delay {:?} exceeds max delay {:?}",
                config.retry_config.initial_delay, config.retry_config.max_delay
            )));
        }

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(
                config.retry_config.initial_delay,
                config.retry_config.max_delay,
            )
            .build_with_max_retries(config.retry_config.max_retries);

        // None means no timeout (replies on a cold backend can be slow)
        let reqwest_client = match config.timeout_seconds {
            Some(timeout) => reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout))
                .build()?,
            None => reqwest::Client::builder().build()?,
        };

        // RetryAfterMiddleware goes first so Retry-After is honored before
        // falling back to exponential backoff
        let client = reqwest_middleware::ClientBuilder::new(reqwest_client.clone())
            .with(RetryAfterMiddleware::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            submit_client: reqwest_client,
            generate_url,
            leave_message_url,
        })
    }
}

/// Reads a non-success response into an error, logging the body.
async fn error_from_response(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    let error_text = match response.text().await {
        Ok(text) => text,
        Err(e) => {
            debug!("Failed to read error response body: {e}");
            String::new()
        }
    };

    // Extract the message from a problem-details body or use raw text
    let error_message = match serde_json::from_str::<ProblemDetails>(&error_text)
        .ok()
        .and_then(ProblemDetails::message)
    {
        Some(message) => {
            debug!("Parsed structured error response");
            message
        }
        None => error_text,
    };

    error!("API request failed with status {status}: {error_message}");

    ClientError::from_status(status, error_message, retry_after)
}

#[async_trait]
impl ChatTransport for HttpChatClient {
    async fn generate_stream(&self, messages: &[Message]) -> Result<DeltaStream, ClientError> {
        let body = serde_json::to_string(&GenerateRequest::new(messages))?;
        debug!(
            "Opening generation request with {} messages to {}",
            messages.len(),
            self.generate_url
        );

        let response = self
            .client
            .post(self.generate_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        debug!("Stream connection opened");
        Ok(decode_delta_stream(response.bytes_stream()))
    }
}

#[async_trait]
impl MessageGateway for HttpChatClient {
    async fn submit_leave_message(&self, params: &LeaveMessageParams) -> Result<(), ClientError> {
        let body = serde_json::to_string(params)?;
        debug!("Submitting contact form to {}", self.leave_message_url);

        let response = self
            .submit_client
            .post(self.leave_message_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        debug!("Contact form accepted with status {}", response.status());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use super::*;
    use folio_chat_common::{MessageDelta, MessageRole, RetryConfig, ToolCall, ToolCallDelta};
    use futures::StreamExt;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_client(base_url: &str) -> HttpChatClient {
        let config = ClientConfig::new(base_url).with_retry_config(RetryConfig {
            max_retries: 0,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        });
        HttpChatClient::new(config).unwrap()
    }

    fn params() -> LeaveMessageParams {
        LeaveMessageParams {
            from_name: "A".to_string(),
            from_email: "a@b.com".to_string(),
            subject: "Hi".to_string(),
            body: "test".to_string(),
        }
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        let err = HttpChatClient::new(ClientConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, ClientError::ConfigurationError(_)));

        let err = HttpChatClient::new(ClientConfig::new("ftp://example.com")).unwrap_err();
        assert!(matches!(err, ClientError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn test_generate_stream_decodes_body() {
        let mock_server = MockServer::start().await;
        let body = concat!(
            "data: {\"role\":\"assistant\"}\n",
            "data: {\"content\":\"Hi\"}\n",
            "data: {}\n",
            "data: {\"content\":\" there!\"}\n",
        );

        Mock::given(method("POST"))
            .and(path("/api/Chat/GenerateResponse"))
            .and(body_json(serde_json::json!({
                "messages": [{"role": "user", "content": "Hello"}]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let stream = client
            .generate_stream(&[Message::user("Hello")])
            .await
            .unwrap();
        let deltas: Vec<_> = stream.map(Result::unwrap).collect().await;

        assert_eq!(
            deltas,
            vec![
                MessageDelta::role(MessageRole::Assistant),
                MessageDelta::content("Hi"),
                MessageDelta::content(" there!"),
            ]
        );
    }

    #[tokio::test]
    async fn test_generate_stream_omits_refusal_from_history() {
        let mock_server = MockServer::start().await;

        let mut reply = Message::assistant("Hm.");
        reply.refusal = Some("I can't share that.".to_string());
        let transcript = vec![Message::user("secret?"), reply, Message::user("ok")];

        Mock::given(method("POST"))
            .and(path("/api/Chat/GenerateResponse"))
            .and(body_json(serde_json::json!({
                "messages": [
                    {"role": "user", "content": "secret?"},
                    {"role": "assistant", "content": "Hm."},
                    {"role": "user", "content": "ok"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("data: {\"content\":\"Sure.\"}\n"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let deltas: Vec<_> = client
            .generate_stream(&transcript)
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(deltas.len(), 1);
    }

    #[tokio::test]
    async fn test_generate_stream_sends_tool_messages() {
        let mock_server = MockServer::start().await;

        let mut reply = Message::assistant("");
        reply.tool_calls.push(ToolCall::new("call_1", "leave_message", "{}"));
        let transcript = vec![
            Message::user("Contact"),
            reply,
            Message::tool_response("call_1", &folio_chat_common::ToolResponse::cancelled()),
        ];

        Mock::given(method("POST"))
            .and(path("/api/Chat/GenerateResponse"))
            .and(body_json(serde_json::json!({
                "messages": [
                    {"role": "user", "content": "Contact"},
                    {"role": "assistant", "content": "", "toolCalls": [
                        {"id": "call_1", "type": "function",
                         "function": {"name": "leave_message", "arguments": "{}"}}
                    ]},
                    {"role": "tool", "content": "{\"status\":\"cancelled\"}", "toolCallId": "call_1"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "data: {\"content\":\"No problem.\"}\n",
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let deltas: Vec<_> = client
            .generate_stream(&transcript)
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(deltas.len(), 1);
    }

    #[tokio::test]
    async fn test_generate_stream_tool_call_fragments() {
        let mock_server = MockServer::start().await;
        let body = concat!(
            "data: {\"toolCalls\":[{\"index\":0,\"id\":\"call_1\",\"type\":\"function\",\"function\":{\"name\":\"leave_message\"}}]}\n",
            "data: {\"toolCalls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"fromName\\\":\"}}]}\n",
        );

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let deltas: Vec<_> = client
            .generate_stream(&[Message::user("Hi")])
            .await
            .unwrap()
            .map(Result::unwrap)
            .collect()
            .await;

        assert_eq!(
            deltas,
            vec![
                MessageDelta::tool_call(ToolCallDelta::start("call_1", "leave_message")),
                MessageDelta::tool_call(ToolCallDelta::arguments(r#"{"fromName":"#)),
            ]
        );
    }

    #[tokio::test]
    async fn test_rate_limit_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "7")
                    .set_body_string("slow down"),
            )
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let result = client.generate_stream(&[Message::user("Hi")]).await;

        match result {
            Err(ClientError::RateLimitError { retry_after }) => {
                assert_eq!(retry_after, Some(Duration::from_secs(7)));
            }
            _ => panic!("Expected RateLimitError"),
        }
    }

    #[tokio::test]
    async fn test_server_error_uses_problem_details() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "title": "Internal Server Error",
                "detail": "model unavailable"
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let result = client.generate_stream(&[Message::user("Hi")]).await;

        match result {
            Err(ClientError::ServiceUnavailable(message)) => {
                assert_eq!(message, "Internal Server Error: model unavailable");
            }
            _ => panic!("Expected ServiceUnavailable"),
        }
    }

    #[tokio::test]
    async fn test_bad_request_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("messages is required"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let result = client.generate_stream(&[]).await;

        match result {
            Err(ClientError::RequestError { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "messages is required");
            }
            _ => panic!("Expected RequestError"),
        }
    }

    #[tokio::test]
    async fn test_submit_leave_message_posts_once() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/Chat/LeaveMessage"))
            .and(body_json(serde_json::json!({
                "fromName": "A",
                "fromEmail": "a@b.com",
                "subject": "Hi",
                "body": "test"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        client.submit_leave_message(&params()).await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_leave_message_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/Chat/LeaveMessage"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&mock_server)
            .await;

        // Retries enabled for generation; submissions must still POST once
        let config = ClientConfig::new(mock_server.uri()).with_retry_config(RetryConfig {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        });
        let client = HttpChatClient::new(config).unwrap();

        let result = client.submit_leave_message(&params()).await;
        assert!(matches!(result, Err(ClientError::ServiceUnavailable(_))));
    }
}
