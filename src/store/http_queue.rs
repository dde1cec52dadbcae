//! Downstream queue publisher — JSON POST to the configured endpoint.

use async_trait::async_trait;
use tracing::debug;

use crate::dispatch::OutcomeMessage;
use crate::error::PublishError;
use crate::store::traits::QueuePublisher;

pub struct HttpQueue {
    client: reqwest::Client,
    queue_url: String,
}

impl HttpQueue {
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            queue_url: queue_url.into(),
        }
    }
}

#[async_trait]
impl QueuePublisher for HttpQueue {
    async fn publish(&self, message: &OutcomeMessage) -> Result<(), PublishError> {
        let transport_err = |reason: String| PublishError::Transport {
            queue: self.queue_url.clone(),
            reason,
        };

        let response = self
            .client
            .post(&self.queue_url)
            .json(message)
            .send()
            .await
            .map_err(|e| transport_err(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| transport_err(e.to_string()))?;

        debug!(queue = %self.queue_url, "Outcome message published");
        Ok(())
    }
}
