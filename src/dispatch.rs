//! Outcome dispatcher — forward relevant emails downstream, archive
//! the rest under the non-relevant prefix.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::email::ParsedEmail;
use crate::error::{PublishError, RelocateError};
use crate::notification::RawEmailLocation;
use crate::store::traits::{ObjectStore, QueuePublisher};

/// Attribute attached to every forwarded message.
pub const CLASSIFICATION_ATTRIBUTE: &str = "email";

/// A typed message attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    #[serde(rename = "dataType")]
    pub data_type: String,
    pub value: String,
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            data_type: "String".to_string(),
            value: value.into(),
        }
    }
}

/// The normalized payload pushed to the downstream queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeMessage {
    #[serde(rename = "messageAttributes")]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(rename = "messageBody")]
    pub body: String,
}

/// Build the downstream message for a relevant email.
pub fn outcome_message(email: &ParsedEmail, sender: &str) -> OutcomeMessage {
    let mut attributes = BTreeMap::new();
    attributes.insert(
        CLASSIFICATION_ATTRIBUTE.to_string(),
        AttributeValue::string(sender),
    );
    OutcomeMessage {
        attributes,
        body: email.combined(),
    }
}

/// Publish a relevant email to the downstream queue.
///
/// Delivery retry is the queue transport's responsibility; a transport
/// failure is returned to the driver, which logs and abandons the item.
pub async fn forward(
    queue: &dyn QueuePublisher,
    email: &ParsedEmail,
    sender: &str,
) -> Result<(), PublishError> {
    let message = outcome_message(email, sender);
    queue.publish(&message).await?;
    info!(sender, "Email forwarded to processing queue");
    Ok(())
}

/// Move a non-relevant email under the archive prefix.
///
/// Copy-then-delete, not atomic: a delete failure after a successful
/// copy leaves a duplicate; a copy failure leaves the original alone.
pub async fn archive(
    objects: &dyn ObjectStore,
    location: &RawEmailLocation,
    inbound_prefix: &str,
    archive_prefix: &str,
) -> Result<(), RelocateError> {
    let mut archive_key = location.key.replacen(inbound_prefix, archive_prefix, 1);
    if archive_key == location.key {
        // Key never carried the inbound prefix; prepend instead of
        // copying the object onto itself and then deleting it.
        archive_key = format!("{archive_prefix}{}", location.key);
    }

    objects
        .copy(&location.container, &location.key, &archive_key)
        .await
        .map_err(|source| RelocateError::Copy {
            key: location.key.clone(),
            source,
        })?;

    objects
        .delete(&location.container, &location.key)
        .await
        .map_err(|source| RelocateError::Delete {
            key: location.key.clone(),
            source,
        })?;

    info!(from = %location.key, to = %archive_key, "Email archived as not relevant");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::{EmailBody, EmailHeaders, Mailbox};
    use crate::store::memory::MemoryObjectStore;

    fn email() -> ParsedEmail {
        ParsedEmail {
            headers: EmailHeaders {
                from: vec![Mailbox {
                    name: Some("Alice".into()),
                    address: "a@b.com".into(),
                }],
                to: vec![Mailbox {
                    name: None,
                    address: "reservas@hotel.example".into(),
                }],
                cc: vec![],
                bcc: vec![],
                subject: "Booking".into(),
                return_path: None,
            },
            body: EmailBody {
                plain: "two nights please".into(),
                html: String::new(),
            },
        }
    }

    #[test]
    fn outcome_message_carries_attribute_and_combined_body() {
        let message = outcome_message(&email(), "a@b.com");
        assert_eq!(
            message.attributes[CLASSIFICATION_ATTRIBUTE],
            AttributeValue::string("a@b.com")
        );
        assert!(message.body.contains("From: Alice <a@b.com>"));
        assert!(message.body.contains("two nights please"));
    }

    #[test]
    fn outcome_message_wire_shape() {
        let json = serde_json::to_value(outcome_message(&email(), "a@b.com")).unwrap();
        assert_eq!(json["messageAttributes"]["email"]["dataType"], "String");
        assert_eq!(json["messageAttributes"]["email"]["value"], "a@b.com");
        assert!(json["messageBody"].is_string());
    }

    #[tokio::test]
    async fn archive_swaps_prefix_and_removes_original() {
        let store = MemoryObjectStore::default();
        store.insert("inbound", "emails/x.eml", b"raw");
        let location = RawEmailLocation {
            container: "inbound".into(),
            key: "emails/x.eml".into(),
        };

        archive(&store, &location, "emails/", "no_relevante/")
            .await
            .unwrap();

        assert!(!store.contains("inbound", "emails/x.eml"));
        assert_eq!(
            store.get_sync("inbound", "no_relevante/x.eml"),
            Some(b"raw".to_vec())
        );
    }

    #[tokio::test]
    async fn archive_unprefixed_key_is_not_destroyed() {
        let store = MemoryObjectStore::default();
        store.insert("inbound", "x.eml", b"raw");
        let location = RawEmailLocation {
            container: "inbound".into(),
            key: "x.eml".into(),
        };

        archive(&store, &location, "emails/", "no_relevante/")
            .await
            .unwrap();

        assert!(!store.contains("inbound", "x.eml"));
        assert_eq!(
            store.get_sync("inbound", "no_relevante/x.eml"),
            Some(b"raw".to_vec())
        );
    }

    #[tokio::test]
    async fn archive_copy_failure_leaves_original() {
        let store = MemoryObjectStore::default();
        let location = RawEmailLocation {
            container: "inbound".into(),
            key: "emails/missing.eml".into(),
        };

        let err = archive(&store, &location, "emails/", "no_relevante/")
            .await
            .unwrap_err();
        assert!(matches!(err, RelocateError::Copy { .. }));
    }
}
