//! Configuration, built from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default durable table holding the allowed sender addresses.
const DEFAULT_TABLE_NAME: &str = "valid_emails";

/// Key prefix of freshly delivered emails in the object store.
const DEFAULT_INBOUND_PREFIX: &str = "emails/";

/// Key prefix emails are moved under when judged not relevant.
const DEFAULT_ARCHIVE_PREFIX: &str = "no_relevante/";

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Downstream queue locator for relevant emails.
    pub queue_url: String,
    /// Path of the durable key-value database file.
    pub db_path: PathBuf,
    /// Name of the allow-list table inside the durable database.
    pub table_name: String,
    /// Deployment environment tag.
    pub environment: String,
    /// Root directory of the filesystem object store.
    pub store_root: PathBuf,
    /// Key prefix of inbound emails.
    pub inbound_prefix: String,
    /// Archive key prefix for non-relevant emails.
    pub archive_prefix: String,
    /// Container holding the cached allow-list artifact.
    pub artifact_container: String,
    /// Object key of the cached allow-list artifact.
    pub artifact_key: String,
    /// Resource id of the allow-list refresh lock.
    pub lock_resource: String,
    /// Lock lease time-to-live.
    pub lock_ttl: Duration,
    /// Acquire attempts before the locked read gives up.
    pub lock_max_retries: u32,
    /// Fixed delay between acquire attempts.
    pub lock_retry_delay: Duration,
    /// Page size for the allow-list table scan.
    pub scan_page_size: usize,
}

impl Config {
    /// Build config from environment variables.
    ///
    /// `MAIL_TRIAGE_QUEUE_URL` is required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let queue_url = std::env::var("MAIL_TRIAGE_QUEUE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("MAIL_TRIAGE_QUEUE_URL".into()))?;

        let db_path = std::env::var("MAIL_TRIAGE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/mail-triage.db"));

        let table_name = std::env::var("MAIL_TRIAGE_TABLE")
            .unwrap_or_else(|_| DEFAULT_TABLE_NAME.to_string());

        let environment =
            std::env::var("MAIL_TRIAGE_ENV").unwrap_or_else(|_| "test".to_string());

        let store_root = std::env::var("MAIL_TRIAGE_STORE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/objects"));

        let lock_ttl_secs = parse_var("MAIL_TRIAGE_LOCK_TTL_SECS", 30u64)?;
        let lock_max_retries = parse_var("MAIL_TRIAGE_LOCK_MAX_RETRIES", 5u32)?;
        let lock_retry_delay_ms = parse_var("MAIL_TRIAGE_LOCK_RETRY_DELAY_MS", 500u64)?;
        let scan_page_size = parse_var("MAIL_TRIAGE_SCAN_PAGE_SIZE", 100usize)?;

        Ok(Self {
            queue_url,
            db_path,
            table_name,
            environment,
            store_root,
            inbound_prefix: DEFAULT_INBOUND_PREFIX.to_string(),
            archive_prefix: DEFAULT_ARCHIVE_PREFIX.to_string(),
            artifact_container: std::env::var("MAIL_TRIAGE_ARTIFACT_CONTAINER")
                .unwrap_or_else(|_| "mail-triage-cache".to_string()),
            artifact_key: std::env::var("MAIL_TRIAGE_ARTIFACT_KEY")
                .unwrap_or_else(|_| "allow_list/current.json".to_string()),
            lock_resource: std::env::var("MAIL_TRIAGE_LOCK_RESOURCE")
                .unwrap_or_else(|_| "allow-list".to_string()),
            lock_ttl: Duration::from_secs(lock_ttl_secs),
            lock_max_retries,
            lock_retry_delay: Duration::from_millis(lock_retry_delay_ms),
            scan_page_size,
        })
    }
}

/// Parse an optional numeric env var, falling back to `default` when unset.
fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}' is not a valid number"),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_falls_back_to_default() {
        // SAFETY: test-local variable name, no concurrent reader.
        unsafe { std::env::remove_var("MAIL_TRIAGE_TEST_UNSET") };
        let value: u64 = parse_var("MAIL_TRIAGE_TEST_UNSET", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn parse_var_rejects_garbage() {
        // SAFETY: test-local variable name, no concurrent reader.
        unsafe { std::env::set_var("MAIL_TRIAGE_TEST_GARBAGE", "not-a-number") };
        let result: Result<u64, _> = parse_var("MAIL_TRIAGE_TEST_GARBAGE", 1);
        assert!(result.is_err());
    }
}
