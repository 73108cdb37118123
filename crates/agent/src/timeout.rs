//! Backend timeout decorator.

use async_trait::async_trait;
use autoclaw_core::error::ProviderError;
use autoclaw_core::provider::{Provider, ProviderRequest, ProviderResponse};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Wraps a provider so that no call blocks longer than `timeout`.
pub struct TimeoutProvider {
    inner: Arc<dyn Provider>,
    timeout: Duration,
}

impl TimeoutProvider {
    pub fn new(inner: Arc<dyn Provider>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl Provider for TimeoutProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        match tokio::time::timeout(self.timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(provider = self.inner.name(), timeout_secs = self.timeout.as_secs(), "Backend call timed out");
                Err(ProviderError::Timeout(format!(
                    "no reply from {} within {}s",
                    self.inner.name(),
                    self.timeout.as_secs()
                )))
            }
        }
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoclaw_core::message::Message;

    struct Stalled;

    #[async_trait]
    impl Provider for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }
        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_backend_times_out() {
        let provider = TimeoutProvider::new(Arc::new(Stalled), Duration::from_secs(5));
        let err = provider
            .complete(ProviderRequest::new("gpt-4", vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }

    #[tokio::test]
    async fn fast_backend_passes_through() {
        let inner = Arc::new(crate::test_helpers::SequentialMockProvider::from_texts(&["ok"]));
        let provider = TimeoutProvider::new(inner, Duration::from_secs(5));
        let response = provider
            .complete(ProviderRequest::new("gpt-4", vec![Message::user("hi")]))
            .await
            .unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(provider.name(), "sequential_mock");
    }
}
