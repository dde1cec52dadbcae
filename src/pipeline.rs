//! Batch driver — thin orchestration around fetch → decide → dispatch,
//! with per-item failure isolation.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::allowlist::{AllowList, LockedAllowList};
use crate::decision;
use crate::dispatch;
use crate::email::fetch_and_parse;
use crate::error::Error;
use crate::notification::{NotificationBatch, NotificationRecord};
use crate::store::traits::{ObjectStore, QueuePublisher};

/// Batch-level acknowledgment returned to the invocation host.
///
/// Unconditionally success: one malformed item must not make the host
/// retry the whole batch when its siblings already went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchAck {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl BatchAck {
    pub fn processed() -> Self {
        Self {
            status_code: 200,
            body: "message processed".to_string(),
        }
    }
}

pub struct TriagePipeline {
    objects: Arc<dyn ObjectStore>,
    queue: Arc<dyn QueuePublisher>,
    allow_list: LockedAllowList,
    inbound_prefix: String,
    archive_prefix: String,
}

impl TriagePipeline {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        queue: Arc<dyn QueuePublisher>,
        allow_list: LockedAllowList,
        inbound_prefix: impl Into<String>,
        archive_prefix: impl Into<String>,
    ) -> Self {
        Self {
            objects,
            queue,
            allow_list,
            inbound_prefix: inbound_prefix.into(),
            archive_prefix: archive_prefix.into(),
        }
    }

    /// Handle one invocation's batch. Items run sequentially; every
    /// per-item failure is contained at the item boundary and logged.
    pub async fn handle_batch(&self, batch: &NotificationBatch) -> BatchAck {
        info!(count = batch.records.len(), "Handling notification batch");

        // One allow-list per invocation, shared by every item.
        let allow_list = self.allow_list.current().await;

        for (index, record) in batch.records.iter().enumerate() {
            if let Err(error) = self.process_record(record, &allow_list).await {
                error!(index, %error, "Skipping notification item");
            }
        }

        BatchAck::processed()
    }

    async fn process_record(
        &self,
        record: &NotificationRecord,
        allow_list: &AllowList,
    ) -> Result<(), Error> {
        let location = record.location()?;
        let email = fetch_and_parse(self.objects.as_ref(), &location).await?;

        if decision::is_relevant(&email, allow_list) {
            let sender = decision::sender_address(&email).unwrap_or_default();
            dispatch::forward(self.queue.as_ref(), &email, sender.trim()).await?;
        } else {
            info!(key = %location.key, "Email not relevant");
            dispatch::archive(
                self.objects.as_ref(),
                &location,
                &self.inbound_prefix,
                &self.archive_prefix,
            )
            .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_wire_shape() {
        let json = serde_json::to_value(BatchAck::processed()).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["body"], "message processed");
    }
}
