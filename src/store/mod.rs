//! Storage collaborators — object store, downstream queue, and the
//! durable key-value tables backing the allow-list and the lock.

pub mod fs;
pub mod http_queue;
pub mod libsql_backend;
pub mod memory;
pub mod traits;

pub use fs::FsObjectStore;
pub use http_queue::HttpQueue;
pub use libsql_backend::LibSqlStore;
pub use traits::{AllowListStore, LockStore, ObjectStore, QueuePublisher, ScanPage};
