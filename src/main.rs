use std::io::Read;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use mail_triage::allowlist::{AllowListProvider, LockedAllowList, LockedReadConfig};
use mail_triage::config::Config;
use mail_triage::lock::LeaseLock;
use mail_triage::notification::{NotificationBatch, RawEmailLocation};
use mail_triage::pipeline::TriagePipeline;
use mail_triage::store::traits::{AllowListStore, LockStore, ObjectStore, QueuePublisher};
use mail_triage::store::{FsObjectStore, HttpQueue, LibSqlStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().context("Loading configuration")?;
    info!(
        environment = %config.environment,
        table = %config.table_name,
        "mail-triage starting"
    );

    // ── Collaborators ───────────────────────────────────────────────
    // Constructed once per invocation and injected; nothing global.
    let store = Arc::new(
        LibSqlStore::open(&config.db_path, &config.table_name)
            .await
            .context("Opening durable store")?,
    );
    let objects: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(&config.store_root));
    let queue: Arc<dyn QueuePublisher> = Arc::new(HttpQueue::new(&config.queue_url));

    let lock_store: Arc<dyn LockStore> = store.clone();
    let table: Arc<dyn AllowListStore> = store;

    let allow_list = LockedAllowList::new(
        AllowListProvider::new(table, config.scan_page_size),
        objects.clone(),
        LeaseLock::new(lock_store, config.lock_ttl),
        LockedReadConfig {
            resource: config.lock_resource.clone(),
            artifact: RawEmailLocation {
                container: config.artifact_container.clone(),
                key: config.artifact_key.clone(),
            },
            max_retries: config.lock_max_retries,
            retry_delay: config.lock_retry_delay,
        },
    );

    let pipeline = TriagePipeline::new(
        objects,
        queue,
        allow_list,
        config.inbound_prefix.clone(),
        config.archive_prefix.clone(),
    );

    // ── One batch per invocation ────────────────────────────────────
    let batch = read_batch().context("Reading notification batch")?;
    let ack = pipeline.handle_batch(&batch).await;

    println!("{}", serde_json::to_string(&ack)?);
    Ok(())
}

/// Read the batch JSON from the file given as the first argument, or
/// from stdin when no argument is passed.
fn read_batch() -> anyhow::Result<NotificationBatch> {
    let raw = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Reading batch file {path}"))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    Ok(serde_json::from_str(&raw)?)
}
