//! Turning the visitor's decision on a tool call into a [`ToolResponse`].

use log::{debug, warn};

use folio_chat_client::MessageGateway;
use folio_chat_common::{LeaveMessageParams, ToolResponse};

/// Performs the side effect of an accepted tool call.
///
/// Failures never escape: a submission error becomes a `failed` response so
/// the conversation can carry on.
#[derive(Debug, Clone)]
pub struct ToolResolutionGateway<G> {
    gateway: G,
}

impl<G: MessageGateway> ToolResolutionGateway<G> {
    /// Wraps the backend used for submissions.
    pub const fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Submits `params` once and reports the outcome.
    pub async fn accept(&self, params: LeaveMessageParams) -> ToolResponse {
        match self.gateway.submit_leave_message(&params).await {
            Ok(()) => {
                debug!("Contact form from {} submitted", params.from_email);
                ToolResponse::sent(params)
            }
            Err(e) => {
                warn!("Failed to submit contact form: {e}");
                ToolResponse::failed(params)
            }
        }
    }

    /// Declines the call without contacting the backend.
    #[must_use]
    pub const fn reject(&self) -> ToolResponse {
        ToolResponse::cancelled()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use folio_chat_client::ClientError;
    use folio_chat_common::ToolResponseStatus;

    use super::*;

    struct CountingGateway {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl MessageGateway for CountingGateway {
        async fn submit_leave_message(
            &self,
            _params: &LeaveMessageParams,
        ) -> Result<(), ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ClientError::ServiceUnavailable("down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn params() -> LeaveMessageParams {
        LeaveMessageParams {
            from_name: "A".to_string(),
            from_email: "a@b.com".to_string(),
            subject: "Hi".to_string(),
            body: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_accept_success_is_sent() {
        let gateway = ToolResolutionGateway::new(CountingGateway {
            calls: AtomicUsize::new(0),
            fail: false,
        });

        let response = gateway.accept(params()).await;
        assert_eq!(response.status, ToolResponseStatus::Sent);
        assert_eq!(response.parameters, Some(params()));
        assert_eq!(gateway.gateway.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_accept_failure_is_failed() {
        let gateway = ToolResolutionGateway::new(CountingGateway {
            calls: AtomicUsize::new(0),
            fail: true,
        });

        let response = gateway.accept(params()).await;
        assert_eq!(response.status, ToolResponseStatus::Failed);
        assert_eq!(response.parameters, Some(params()));
        assert_eq!(gateway.gateway.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reject_never_submits() {
        let gateway = ToolResolutionGateway::new(CountingGateway {
            calls: AtomicUsize::new(0),
            fail: false,
        });

        assert_eq!(gateway.reject(), ToolResponse::cancelled());
        assert_eq!(gateway.gateway.calls.load(Ordering::SeqCst), 0);
    }
}
