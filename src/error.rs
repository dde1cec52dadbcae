//! Error types for mail-triage.

/// Top-level error type for the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Allow-list error: {0}")]
    AllowList(#[from] AllowListError),

    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Relocate error: {0}")]
    Relocate(#[from] RelocateError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Inbound notification envelope errors. These skip the item, never the batch.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Notification missing field: {0}")]
    MissingField(&'static str),
}

/// Object storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {container}/{key}")]
    NotFound { container: String, key: String },

    #[error("Failed to read {container}/{key}: {reason}")]
    Read {
        container: String,
        key: String,
        reason: String,
    },

    #[error("Failed to write {container}/{key}: {reason}")]
    Write {
        container: String,
        key: String,
        reason: String,
    },

    #[error("Failed to delete {container}/{key}: {reason}")]
    Delete {
        container: String,
        key: String,
        reason: String,
    },
}

/// Durable key-value database errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Failed to open database: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),
}

/// MIME parsing errors. Malformed content inside a parseable message
/// degrades to a partial body instead of raising one of these.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Byte stream is not a valid MIME message")]
    InvalidMime,
}

/// Allow-list source errors.
#[derive(Debug, thiserror::Error)]
pub enum AllowListError {
    #[error("Durable table scan failed: {0}")]
    Scan(String),

    #[error("Allow-list artifact is not valid JSON: {0}")]
    Artifact(String),
}

/// Advisory lock errors. Contention is a `false` acquire result, not an error.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("Lock on {resource} not acquired after {attempts} attempt(s)")]
    Timeout { resource: String, attempts: u32 },

    #[error("Lock store error: {0}")]
    Store(String),
}

/// Downstream queue publish errors.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to publish to {queue}: {reason}")]
    Transport { queue: String, reason: String },
}

/// Archive relocation errors. Copy-then-delete is not atomic: a delete
/// failure after a successful copy leaves a duplicate behind.
#[derive(Debug, thiserror::Error)]
pub enum RelocateError {
    #[error("Failed to copy {key} to archive: {source}")]
    Copy {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("Copied {key} to archive but failed to delete the original: {source}")]
    Delete {
        key: String,
        #[source]
        source: StorageError,
    },
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, Error>;
