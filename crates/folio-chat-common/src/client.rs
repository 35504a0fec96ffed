//! Client configuration and request bodies for the chat backend.
//!
//! The backend exposes two endpoints: a streaming generation endpoint that
//! receives the full transcript, and a submission endpoint for the contact
//! form. [`ClientConfig`] locates both.

use std::time::Duration;

use serde::Serialize;

use crate::chat::{Message, MessageRole};
use crate::tools::ToolCall;

/// Default backend serving the portfolio site.
pub const DEFAULT_BASE_URL: &str =
    "https://tomspirersite-hfdyg9ayewadckby.swedencentral-01.azurewebsites.net";

/// Default path of the streaming generation endpoint.
pub const DEFAULT_GENERATE_PATH: &str = "/api/Chat/GenerateResponse";

/// Default path of the contact-form submission endpoint.
pub const DEFAULT_LEAVE_MESSAGE_PATH: &str = "/api/Chat/LeaveMessage";

/// Configuration for retry behavior with exponential backoff.
///
/// Retries only apply to opening a generation request. A stream that already
/// started delivering events is never replayed, and contact-form submissions
/// are never retried.
///
/// ```
/// use std::time::Duration;
/// use folio_chat_common::client::RetryConfig;
///
/// let config = RetryConfig {
///     max_retries: 5,
///     initial_delay: Duration::from_millis(500),
///     max_delay: Duration::from_secs(60),
/// };
/// assert_eq!(config.max_retries, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts before failing.
    pub max_retries: u32,
    /// Initial delay before the first retry attempt.
    pub initial_delay: Duration,
    /// Maximum delay between retry attempts (caps exponential growth).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Configuration for the chat backend client.
///
/// # Examples
///
/// ```
/// use folio_chat_common::ClientConfig;
///
/// let config = ClientConfig::new("http://localhost:5000")
///     .with_timeout(30)
///     .with_generate_path("/api/Chat/GenerateResponse");
///
/// assert!(config.validate().is_ok());
/// assert_eq!(
///     config.generate_url().unwrap().as_str(),
///     "http://localhost:5000/api/Chat/GenerateResponse"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL the endpoint paths are appended to.
    pub base_url: String,
    /// Path of the streaming generation endpoint.
    pub generate_path: String,
    /// Path of the contact-form submission endpoint.
    pub leave_message_path: String,
    /// Request timeout in seconds. `None` disables the timeout, which suits
    /// slow replies on cold backends.
    pub timeout_seconds: Option<u64>,
    /// Retry policy for opening generation requests.
    pub retry_config: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            generate_path: DEFAULT_GENERATE_PATH.to_string(),
            leave_message_path: DEFAULT_LEAVE_MESSAGE_PATH.to_string(),
            timeout_seconds: None,
            retry_config: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the backend at `base_url` with default paths.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Sets the generation endpoint path.
    #[must_use]
    pub fn with_generate_path(mut self, path: impl Into<String>) -> Self {
        self.generate_path = path.into();
        self
    }

    /// Sets the contact-form endpoint path.
    #[must_use]
    pub fn with_leave_message_path(mut self, path: impl Into<String>) -> Self {
        self.leave_message_path = path.into();
        self
    }

    /// Sets the request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Joins the base URL and `path`.
    ///
    /// The path is appended verbatim, so a base URL with its own path prefix
    /// keeps it.
    ///
    /// # Errors
    ///
    /// Returns an error if the result is not a valid URL.
    pub fn endpoint_url(&self, path: &str) -> Result<url::Url, url::ParseError> {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        url::Url::parse(&format!("{base}/{path}"))
    }

    /// Full URL of the generation endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed.
    pub fn generate_url(&self) -> Result<url::Url, url::ParseError> {
        self.endpoint_url(&self.generate_path)
    }

    /// Full URL of the contact-form endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed.
    pub fn leave_message_url(&self) -> Result<url::Url, url::ParseError> {
        self.endpoint_url(&self.leave_message_path)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - either endpoint URL fails to parse
    /// - the base URL is not `http` or `https`
    /// - the timeout is zero
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = self.generate_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!(
                "base URL must use http or https, got {}",
                self.base_url
            );
        }
        self.leave_message_url()?;

        if self.timeout_seconds == Some(0) {
            anyhow::bail!("timeout must be greater than zero seconds");
        }

        if self.retry_config.initial_delay > self.retry_config.max_delay {
            anyhow::bail!(
                "retry initial delay {:?} exceeds max delay {:?}",
                self.retry_config.initial_delay,
                self.retry_config.max_delay
            );
        }

        Ok(())
    }
}

/// Body of a generation request: the full ordered transcript.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest<'a> {
    /// Messages sent to the model, oldest first.
    pub messages: Vec<RequestMessage<'a>>,
}

impl<'a> GenerateRequest<'a> {
    /// Wraps a transcript for sending.
    #[must_use]
    pub fn new(messages: &'a [Message]) -> Self {
        Self {
            messages: messages.iter().map(RequestMessage::from).collect(),
        }
    }
}

/// One transcript entry as the backend receives it.
///
/// Refusal text stays in the transcript; the backend only takes the role,
/// content and tool fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage<'a> {
    /// The role of the message sender.
    pub role: MessageRole,
    /// Message text.
    pub content: &'a str,
    /// Tool calls, omitted when there are none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<&'a [ToolCall]>,
    /// For `tool` messages, the id of the call being answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<&'a str>,
}

impl<'a> From<&'a Message> for RequestMessage<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            role: message.role,
            content: &message.content,
            tool_calls: (!message.tool_calls.is_empty()).then_some(message.tool_calls.as_slice()),
            tool_call_id: message.tool_call_id.as_deref(),
        }
    }
}
