//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ExpiringCache;

/// Spawns a background task that sweeps expired entries out of `cache`.
///
/// The sweep runs every `interval` regardless of access patterns. It holds
/// the write lock only for the duration of one sweep.
///
/// # Returns
/// A JoinHandle for the spawned task. Aborting it stops the sweep; this is
/// how the sweep is shut down.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(RwLock::new(ExpiringCache::<String>::new(Duration::from_secs(300))));
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<V>(cache: Arc<RwLock<ExpiringCache<V>>>, interval: Duration) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!("Starting TTL cleanup task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut cache_guard = cache.write().await;
                cache_guard.cleanup_expired()
            };

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
