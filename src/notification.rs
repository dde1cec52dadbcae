//! Inbound notification envelope — one batch of "new email landed"
//! records, each carrying the storage location of the raw message.

use serde::Deserialize;

use crate::error::NotificationError;

/// Storage location of a raw inbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEmailLocation {
    /// Container (bucket) identifier.
    pub container: String,
    /// Object key within the container.
    pub key: String,
}

/// A batch of inbound notifications, as delivered by the invocation host.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationBatch {
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

/// A single notification. The body is a JSON string with the receipt
/// envelope describing where the email was stored.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRecord {
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct ReceiptEnvelope {
    receipt: Option<Receipt>,
}

#[derive(Debug, Deserialize)]
struct Receipt {
    action: Option<ReceiptAction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptAction {
    bucket_name: Option<String>,
    object_key: Option<String>,
}

impl NotificationRecord {
    /// Extract the email's storage location from the record body.
    ///
    /// A missing bucket or key is a per-item error; the caller logs it
    /// and skips the item without touching storage or the queue.
    pub fn location(&self) -> Result<RawEmailLocation, NotificationError> {
        let envelope: ReceiptEnvelope = serde_json::from_str(&self.body)?;
        let action = envelope
            .receipt
            .ok_or(NotificationError::MissingField("receipt"))?
            .action
            .ok_or(NotificationError::MissingField("receipt.action"))?;

        let container = action
            .bucket_name
            .ok_or(NotificationError::MissingField("receipt.action.bucketName"))?;
        let key = action
            .object_key
            .ok_or(NotificationError::MissingField("receipt.action.objectKey"))?;

        Ok(RawEmailLocation { container, key })
    }
}
