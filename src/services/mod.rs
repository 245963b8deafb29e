pub mod assignments;
pub mod cache;
pub mod calendar;
pub mod conflicts;
pub mod init;
pub mod matcher;
pub mod notifications;
pub mod reports;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::RwLock;

    use crate::config::Config;
    use crate::services::cache::ViewCache;
    use crate::services::matcher::MappingCache;
    use crate::AppState;

    /// App state over an in-memory database, without a configured mailer.
    pub async fn state() -> Arc<AppState> {
        Arc::new(AppState {
            db: crate::db::testing::pool().await,
            config: Config::default(),
            views: ViewCache::new(Duration::from_secs(60)),
            mappings: MappingCache::new(),
            mailer: Arc::new(RwLock::new(None)),
        })
    }
}
