//! TTL Sweep Task
//!
//! Background task that periodically removes expired cache entries.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ExpiringCache;
use crate::error::{ConfigError, Result};

/// Spawns a task that calls [`ExpiringCache::remove_expired`] every
/// `interval`.
///
/// The cache is not synchronized internally, so it is shared behind a
/// `tokio::sync::Mutex` that every other caller must also go through. The
/// lock is only held for the duration of one sweep.
///
/// Abort the returned handle to stop sweeping. A zero `interval` is
/// rejected with [`ConfigError::InvalidValue`].
///
/// # Example
/// ```ignore
/// let cache = Arc::new(Mutex::new(ExpiringCache::new(1000, Duration::from_secs(300))));
/// let sweep_handle = spawn_sweep_task(cache.clone(), Duration::from_secs(1))?;
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<K, V>(
    cache: Arc<Mutex<ExpiringCache<K, V>>>,
    interval: Duration,
) -> Result<JoinHandle<()>>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Send + 'static,
{
    if interval.is_zero() {
        return Err(ConfigError::InvalidValue(
            "sweep interval must be greater than zero".to_string(),
        ));
    }

    Ok(tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "starting TTL sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let (removed, remaining) = {
                let mut guard = cache.lock().await;
                let removed = guard.remove_expired();
                (removed, guard.len())
            };

            if removed > 0 {
                info!(removed, remaining, "TTL sweep removed expired entries");
            } else {
                debug!("TTL sweep: no expired entries found");
            }
        }
    }))
}
