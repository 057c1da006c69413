use crate::catalog::{self, CatalogHandle};
use crate::db::DbPool;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info};

/// Background reload of the catalog snapshot
pub struct CatalogScheduler {
    pool: DbPool,
    handle: CatalogHandle,
    interval_seconds: u64,
    fuzzy_threshold: f32,
}

impl CatalogScheduler {
    pub fn new(
        pool: DbPool,
        handle: CatalogHandle,
        interval_seconds: u64,
        fuzzy_threshold: f32,
    ) -> Self {
        Self {
            pool,
            handle,
            interval_seconds,
            fuzzy_threshold,
        }
    }

    /// Start the scheduler in the background
    ///
    /// The first reload happens one interval after start; the caller is
    /// expected to have loaded the initial snapshot already.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Catalog scheduler started with interval: {}s",
                self.interval_seconds
            );

            let mut ticker = interval(Duration::from_secs(self.interval_seconds.max(1)));
            ticker.tick().await;

            loop {
                ticker.tick().await;

                debug!("Scheduler tick: reloading catalog");

                if let Err(e) = self.refresh().await {
                    error!("Catalog reload failed, keeping previous snapshot: {}", e.log_safe());
                }
            }
        })
    }

    /// Reload the snapshot once; on failure the current one stays in place
    pub async fn refresh(&self) -> Result<usize> {
        let catalog = catalog::load(&self.pool, self.fuzzy_threshold).await?;
        let count = catalog.len();
        self.handle.replace(catalog);
        Ok(count)
    }
}
